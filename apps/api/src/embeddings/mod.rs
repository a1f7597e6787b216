//! Embedding capability, consumed as an opaque "embed + compare" service.
//!
//! The Ranking Engine and the Ingestion Pipeline depend on the `Embedder` trait only;
//! `EmbeddingApiClient` is the production backend.

use async_trait::async_trait;
use thiserror::Error;

pub mod api;

pub use api::EmbeddingApiClient;

pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
/// Character cap applied before sending text to the embedding service.
pub const MAX_EMBED_CHARS: usize = 18_000;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding service returned {got} vectors for {expected} inputs")]
    CountMismatch { expected: usize, got: usize },

    #[error("Embedding service failed after {retries} retries")]
    Exhausted { retries: u32 },
}

/// Turns texts into vectors. Implementations must return one vector per input, in order.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Cosine similarity of two vectors. Returns 0.0 for empty, mismatched or zero-norm input.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Truncates on a char boundary to at most `MAX_EMBED_CHARS` characters.
pub fn truncate_for_embedding(text: &str) -> String {
    text.chars().take(MAX_EMBED_CHARS).collect()
}
