//! Axum route handlers for the Session API.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::service::SendMessageResponse;
use crate::errors::AppError;
use crate::models::{RankingConfig, ScreeningResult, Session, SessionSummary};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub prefix: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub session_id: Option<Uuid>,
    pub text: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreateSessionResponse>), AppError> {
    let session = state.chat.create_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: session.id,
        }),
    ))
}

/// GET /api/v1/sessions?prefix=
pub async fn handle_list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SessionSummary>>, AppError> {
    Ok(Json(state.chat.list_sessions(query.prefix.as_deref()).await?))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Session>, AppError> {
    Ok(Json(state.chat.get_session(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.chat.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PATCH /api/v1/sessions/:id/ranking-config
///
/// Body is a partial config: any of `top_k`, `scoring_weights`, `feature_weights`.
/// Returns the merged config.
pub async fn handle_update_ranking_config(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<Value>,
) -> Result<Json<RankingConfig>, AppError> {
    Ok(Json(state.chat.update_ranking_config(id, patch).await?))
}

/// GET /api/v1/sessions/:id/screenings
pub async fn handle_list_screenings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ScreeningResult>>, AppError> {
    Ok(Json(state.chat.screenings(id).await?))
}

/// POST /api/v1/chat
///
/// Runs one turn. A turn that fails inside a phase still returns 200 with
/// `status: "error"` and the assistant error message.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    Ok(Json(
        state
            .chat
            .send_message(request.session_id, &request.text)
            .await?,
    ))
}
