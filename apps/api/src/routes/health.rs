use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status, version and the current corpus size.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let corpus_size = state.corpus.snapshot().await.len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "recruiter-api",
        "corpus_size": corpus_size,
    }))
}
