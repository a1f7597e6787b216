//! Axum route handlers for the candidate corpus.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::IngestionReport;
use crate::errors::AppError;
use crate::models::CandidateSummary;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CorpusResponse {
    pub processed_at: Option<DateTime<Utc>>,
    pub size: usize,
    pub candidates: Vec<CandidateSummary>,
}

/// POST /api/v1/corpus/ingest
///
/// Runs the pipeline over the resume directory. Concurrent calls queue behind the
/// running one.
pub async fn handle_ingest(
    State(state): State<AppState>,
) -> Result<Json<IngestionReport>, AppError> {
    Ok(Json(state.ingestion.run().await?))
}

/// GET /api/v1/corpus
pub async fn handle_get_corpus(State(state): State<AppState>) -> Json<CorpusResponse> {
    let snapshot = state.corpus.snapshot().await;
    Json(CorpusResponse {
        processed_at: snapshot.manifest.processed_at,
        size: snapshot.len(),
        candidates: snapshot
            .candidates
            .values()
            .map(CandidateSummary::from)
            .collect(),
    })
}
