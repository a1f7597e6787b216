//! Knowledge Store: the single source of truth for sessions and the candidate corpus.

pub mod atomic;
pub mod corpus;
pub mod history;
pub mod sessions;

pub use corpus::{CorpusSnapshot, CorpusStore, Manifest, ManifestEntry};
pub use sessions::{SessionLease, SessionStore};
