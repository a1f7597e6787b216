//! Session API: the operations the HTTP layer exposes over sessions and turns.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::knowledge::SessionStore;
use crate::models::{
    Message, RankingConfig, RankingConfigPatch, ScreeningResult, Session, SessionPatch,
    SessionSummary,
};
use crate::routing::{PhaseRouter, TurnError, TurnStatus};

#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub session_id: Uuid,
    pub new_messages: Vec<Message>,
    pub status: TurnStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TurnError>,
}

pub struct ChatService {
    store: Arc<SessionStore>,
    router: Arc<PhaseRouter>,
}

impl ChatService {
    pub fn new(store: Arc<SessionStore>, router: Arc<PhaseRouter>) -> Self {
        Self { store, router }
    }

    pub async fn create_session(&self) -> Result<Session, AppError> {
        self.store.create().await
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Session, AppError> {
        self.store.get(id).await
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        self.store.delete(id).await
    }

    pub async fn list_sessions(&self, prefix: Option<&str>) -> Result<Vec<SessionSummary>, AppError> {
        self.store.list(prefix).await
    }

    pub async fn screenings(&self, id: Uuid) -> Result<Vec<ScreeningResult>, AppError> {
        self.store.screenings(id).await
    }

    /// Validates the partial config, merges it over the session's current config and
    /// persists the result. Nothing is written when validation fails.
    /// The read and the write happen under one lease, so a concurrent turn either
    /// finishes first or makes this call fail with `Conflict`.
    pub async fn update_ranking_config(
        &self,
        id: Uuid,
        patch: Value,
    ) -> Result<RankingConfig, AppError> {
        let patch = RankingConfigPatch::from_json(patch)?;
        let lease = self.store.lease(id).await?;
        let current = self.store.get(id).await?;
        let merged = patch.merged(&current.ranking_config)?;
        if patch.is_empty() {
            return Ok(merged);
        }

        let session = self
            .store
            .update(
                &lease,
                SessionPatch {
                    ranking_config: Some(merged),
                    ..Default::default()
                },
            )
            .await?;
        info!(session_id = %id, top_k = session.ranking_config.top_k, "Ranking config updated");
        Ok(session.ranking_config)
    }

    /// Processes one user turn. `None` creates a session first.
    /// The session lease is held for the whole turn.
    pub async fn send_message(
        &self,
        session_id: Option<Uuid>,
        text: &str,
    ) -> Result<SendMessageResponse, AppError> {
        if text.trim().is_empty() {
            return Err(AppError::Validation("Message must not be empty".into()));
        }

        let session_id = match session_id {
            Some(id) => {
                self.store.get(id).await?;
                id
            }
            None => self.store.create().await?.id,
        };

        let lease = self.store.lease(session_id).await?;
        let outcome = self.router.run_turn(&self.store, &lease, text).await?;

        Ok(SendMessageResponse {
            session_id,
            new_messages: outcome.new_messages,
            status: outcome.status,
            error: outcome.error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::{CorpusSnapshot, CorpusStore};
    use crate::models::candidate::candidate_fixture;
    use crate::models::{ExtractedResume, JobSnapshot};
    use crate::ranking::RankingEngine;
    use crate::routing::plan::RoutingDecision;
    use crate::routing::RouterPolicy;
    use crate::test_support::{
        FakeClassifier, FakeEmbedder, FakeJobSpecExtractor, FakeResponder,
    };
    use serde_json::json;
    use tempfile::TempDir;

    async fn service() -> (TempDir, Arc<FakeClassifier>, Arc<FakeJobSpecExtractor>, ChatService) {
        service_with_corpus(0).await
    }

    async fn service_with_corpus(
        candidates: usize,
    ) -> (TempDir, Arc<FakeClassifier>, Arc<FakeJobSpecExtractor>, ChatService) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SessionStore::new(dir.path()));
        let corpus = Arc::new(CorpusStore::open(dir.path()).await.unwrap());
        let mut snapshot = CorpusSnapshot::default();
        for i in 0..candidates {
            let id = format!("cand_{i:02}");
            let resume = ExtractedResume {
                current_title: Some("Backend Engineer".into()),
                skills: vec!["Go".into(), "Postgres".into()],
                experience_years: Some(2.0 + i as f32),
                ..Default::default()
            };
            snapshot.candidates.insert(id.clone(), candidate_fixture(&id, resume));
        }
        corpus.commit(snapshot).await.unwrap();
        let classifier = Arc::new(FakeClassifier::default());
        let job_spec = Arc::new(FakeJobSpecExtractor::default());
        let router = Arc::new(PhaseRouter::new(
            classifier.clone(),
            job_spec.clone(),
            Arc::new(FakeResponder::default()),
            Arc::new(RankingEngine::new(Arc::new(FakeEmbedder::default()))),
            corpus,
            RouterPolicy::default(),
        ));
        (dir, classifier, job_spec, ChatService::new(store, router))
    }

    #[tokio::test]
    async fn test_send_without_session_creates_one() {
        let (_dir, classifier, job_spec, service) = service().await;
        classifier.push(RoutingDecision::phases(&["job_description"]));
        job_spec.push(Ok(JobSnapshot {
            title: Some("Rust Engineer".into()),
            ..Default::default()
        }));

        let response = service.send_message(None, "Hiring a Rust engineer").await.unwrap();
        assert_eq!(response.status, TurnStatus::Ok);
        assert_eq!(response.new_messages.len(), 1);

        let session = service.get_session(response.session_id).await.unwrap();
        assert_eq!(session.messages.len(), 2);
        let listed = service.list_sessions(None).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].label, "Hiring a Rust engineer");
    }

    #[tokio::test]
    async fn test_send_to_unknown_session_is_not_found() {
        let (_dir, _, _, service) = service().await;
        let err = service
            .send_message(Some(Uuid::new_v4()), "hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(service.list_sessions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_creates_nothing() {
        let (_dir, _, _, service) = service().await;
        let err = service.send_message(None, "  ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(service.list_sessions(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_ranking_config_partial_merge() {
        let (_dir, _, _, service) = service().await;
        let session = service.create_session().await.unwrap();

        let merged = service
            .update_ranking_config(session.id, json!({"top_k": 10, "feature_weights": {"skills": 2.0}}))
            .await
            .unwrap();
        assert_eq!(merged.top_k, 10);
        assert_eq!(merged.feature_weights.skills, 2.0);
        assert_eq!(merged.scoring_weights, RankingConfig::default().scoring_weights);

        let stored = service.get_session(session.id).await.unwrap();
        assert_eq!(stored.ranking_config, merged);
    }

    #[tokio::test]
    async fn test_invalid_ranking_config_leaves_session_untouched() {
        let (_dir, _, _, service) = service().await;
        let session = service.create_session().await.unwrap();

        for bad in [json!({"top_k": 0}), json!({"top_k": -3}), json!({"bogus": 1})] {
            let err = service
                .update_ranking_config(session.id, bad)
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(service.get_session(session.id).await.unwrap(), session);
    }

    #[tokio::test]
    async fn test_ranking_config_conflicts_while_a_turn_holds_the_session() {
        let (_dir, _, _, service) = service().await;
        let session = service.create_session().await.unwrap();

        let turn = service.store.lease(session.id).await.unwrap();
        let err = service
            .update_ranking_config(session.id, json!({"top_k": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(service.get_session(session.id).await.unwrap(), session);

        drop(turn);
        let merged = service
            .update_ranking_config(session.id, json!({"top_k": 3}))
            .await
            .unwrap();
        assert_eq!(merged.top_k, 3);
    }

    #[tokio::test]
    async fn test_ranking_config_merges_over_latest_stored_config() {
        let (_dir, _, _, service) = service().await;
        let session = service.create_session().await.unwrap();

        service
            .update_ranking_config(session.id, json!({"top_k": 9}))
            .await
            .unwrap();
        let merged = service
            .update_ranking_config(session.id, json!({"feature_weights": {"title": 0.5}}))
            .await
            .unwrap();
        assert_eq!(merged.top_k, 9);
        assert_eq!(merged.feature_weights.title, 0.5);
    }

    #[tokio::test]
    async fn test_patched_top_k_bounds_the_next_screening() {
        for (corpus_size, expected) in [(2, 2), (5, 3)] {
            let (_dir, classifier, job_spec, service) = service_with_corpus(corpus_size).await;
            let session = service.create_session().await.unwrap();
            service
                .update_ranking_config(session.id, json!({"top_k": 3}))
                .await
                .unwrap();

            classifier.push(RoutingDecision::phases(&["job_description", "screening"]));
            job_spec.push(Ok(JobSnapshot {
                title: Some("Backend Engineer".into()),
                required_skills: vec!["Go".into()],
                ..Default::default()
            }));
            let response = service
                .send_message(Some(session.id), "Backend engineer with Go, screen the pool")
                .await
                .unwrap();
            assert_eq!(response.status, TurnStatus::Ok);

            let stored = service.get_session(session.id).await.unwrap();
            assert_eq!(stored.ranking_config.top_k, 3);
            let result = stored.screening_result.unwrap();
            assert_eq!(result.entries.len(), expected);
            assert_eq!(result.corpus_size, corpus_size);
        }
    }

    #[tokio::test]
    async fn test_ranking_config_for_unknown_session() {
        let (_dir, _, _, service) = service().await;
        let err = service
            .update_ranking_config(Uuid::new_v4(), json!({"top_k": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
