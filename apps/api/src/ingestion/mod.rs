//! Ingestion Deduplication Pipeline.

pub mod dedup;
pub mod extractor;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod source;

pub use extractor::LlmResumeExtractor;
pub use pipeline::{IngestionPipeline, IngestionReport};
