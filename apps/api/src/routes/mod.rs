pub mod health;

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::conversation::handlers;
use crate::ingestion::handlers as corpus;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Session API
        .route(
            "/api/v1/sessions",
            post(handlers::handle_create_session).get(handlers::handle_list_sessions),
        )
        .route(
            "/api/v1/sessions/:id",
            get(handlers::handle_get_session).delete(handlers::handle_delete_session),
        )
        .route(
            "/api/v1/sessions/:id/ranking-config",
            patch(handlers::handle_update_ranking_config),
        )
        .route(
            "/api/v1/sessions/:id/screenings",
            get(handlers::handle_list_screenings),
        )
        .route("/api/v1/chat", post(handlers::handle_send_message))
        // Candidate corpus
        .route("/api/v1/corpus", get(corpus::handle_get_corpus))
        .route("/api/v1/corpus/ingest", post(corpus::handle_ingest))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;

    use super::*;
    use crate::conversation::ChatService;
    use crate::ingestion::IngestionPipeline;
    use crate::knowledge::{CorpusStore, SessionStore};
    use crate::models::JobSnapshot;
    use crate::ranking::RankingEngine;
    use crate::routing::plan::RoutingDecision;
    use crate::routing::{PhaseRouter, RouterPolicy};
    use crate::test_support::{
        FakeClassifier, FakeEmbedder, FakeJobSpecExtractor, FakeResponder, FakeResumeExtractor,
    };

    struct TestApp {
        _dir: TempDir,
        resumes: std::path::PathBuf,
        classifier: Arc<FakeClassifier>,
        job_spec: Arc<FakeJobSpecExtractor>,
        router: Router,
    }

    async fn app() -> TestApp {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().to_path_buf();
        let resumes = data_dir.join("resumes");
        std::fs::create_dir_all(&resumes).unwrap();

        let embedder = Arc::new(FakeEmbedder::default());
        let classifier = Arc::new(FakeClassifier::default());
        let job_spec = Arc::new(FakeJobSpecExtractor::default());
        let corpus = Arc::new(CorpusStore::open(&data_dir).await.unwrap());
        let store = Arc::new(SessionStore::new(&data_dir));
        let phase_router = Arc::new(PhaseRouter::new(
            classifier.clone(),
            job_spec.clone(),
            Arc::new(FakeResponder::default()),
            Arc::new(RankingEngine::new(embedder.clone())),
            corpus.clone(),
            RouterPolicy::default(),
        ));
        let ingestion = Arc::new(IngestionPipeline::new(
            resumes.clone(),
            corpus.clone(),
            Arc::new(FakeResumeExtractor::default()),
            embedder,
        ));
        let state = AppState {
            chat: Arc::new(ChatService::new(store, phase_router)),
            corpus,
            ingestion,
        };

        TestApp {
            _dir: dir,
            resumes,
            classifier,
            job_spec,
            router: build_router(state),
        }
    }

    async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_health() {
        let app = app().await;
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["corpus_size"], 0);
        assert!(body.get("data_dir").is_none());
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let app = app().await;
        let (status, body) = send(&app, "POST", "/api/v1/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["session_id"].as_str().unwrap().to_string();

        let (status, session) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(session["ranking_config"]["top_k"], 5);
        assert!(session["job_snapshot"].is_null());

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, _) = send(&app, "DELETE", &format!("/api/v1/sessions/{id}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_ranking_config_patch_validation() {
        let app = app().await;
        let (_, body) = send(&app, "POST", "/api/v1/sessions", None).await;
        let id = body["session_id"].as_str().unwrap().to_string();
        let uri = format!("/api/v1/sessions/{id}/ranking-config");

        let (status, body) = send(&app, "PATCH", &uri, Some(json!({"top_k": 0}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, body) = send(&app, "PATCH", &uri, Some(json!({"top_k": 8}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["top_k"], 8);
        assert_eq!(body["scoring_weights"]["semantic"], 0.8);
    }

    #[tokio::test]
    async fn test_chat_creates_session_and_lists_it() {
        let app = app().await;
        app.classifier.push(RoutingDecision::phases(&["job_description"]));
        app.job_spec.push(Ok(JobSnapshot {
            title: Some("Data Engineer".into()),
            ..Default::default()
        }));

        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"session_id": null, "text": "We need a data engineer"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["new_messages"].as_array().unwrap().len(), 1);
        assert!(body.get("error").is_none());

        let id = body["session_id"].as_str().unwrap();
        let (_, listed) = send(&app, "GET", &format!("/api/v1/sessions?prefix={}", &id[..6]), None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
        assert_eq!(listed[0]["label"], "We need a data engineer");
    }

    #[tokio::test]
    async fn test_chat_upstream_failure_is_a_turn_error() {
        let app = app().await;
        let (status, body) = send(
            &app,
            "POST",
            "/api/v1/chat",
            Some(json!({"text": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
        assert_eq!(body["new_messages"][0]["is_error"], true);
    }

    #[tokio::test]
    async fn test_ingest_then_list_corpus() {
        let app = app().await;
        std::fs::write(app.resumes.join("ada.txt"), "Ada Lovelace\nSkills: Python\n6 years").unwrap();

        let (status, report) = send(&app, "POST", "/api/v1/corpus/ingest", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["ingested"], json!(["ada.txt"]));

        let (status, corpus) = send(&app, "GET", "/api/v1/corpus", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(corpus["size"], 1);
        assert_eq!(corpus["candidates"][0]["display_name"], "Ada Lovelace");
    }
}
