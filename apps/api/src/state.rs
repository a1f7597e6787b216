use std::sync::Arc;

use crate::conversation::ChatService;
use crate::ingestion::IngestionPipeline;
use crate::knowledge::CorpusStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatService>,
    /// Read side of the candidate corpus. Only the ingestion pipeline writes to it.
    pub corpus: Arc<CorpusStore>,
    pub ingestion: Arc<IngestionPipeline>,
}
