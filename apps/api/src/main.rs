mod config;
mod conversation;
mod embeddings;
mod errors;
mod ingestion;
mod knowledge;
mod llm_client;
mod models;
mod ranking;
mod routes;
mod routing;
mod state;
#[cfg(test)]
mod test_support;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::conversation::ChatService;
use crate::embeddings::api::EmbeddingApiConfig;
use crate::embeddings::{Embedder, EmbeddingApiClient};
use crate::ingestion::{IngestionPipeline, LlmResumeExtractor};
use crate::knowledge::{CorpusStore, SessionStore};
use crate::llm_client::LlmClient;
use crate::ranking::RankingEngine;
use crate::routes::build_router;
use crate::routing::{LlmDiscussionResponder, LlmJobSpecExtractor, LlmQueryClassifier, PhaseRouter};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Recruiter API v{}", env!("CARGO_PKG_VERSION"));

    // Text generation and embedding capabilities
    let llm = LlmClient::new(config.anthropic_api_key.clone(), config.upstream_timeout_secs)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingApiClient::new(EmbeddingApiConfig {
        base_url: config.embedding_base_url.clone(),
        api_key: config.embedding_api_key.clone(),
        model: config.embedding_model.clone(),
        timeout_secs: config.upstream_timeout_secs,
    })?);
    info!("Embedding client initialized (model: {})", config.embedding_model);

    // Knowledge store
    let corpus = Arc::new(CorpusStore::open(&config.data_dir).await?);
    let sessions = Arc::new(SessionStore::new(&config.data_dir));
    info!(
        data_dir = %config.data_dir.display(),
        candidates = corpus.snapshot().await.len(),
        "Knowledge store opened"
    );

    let ingestion = Arc::new(IngestionPipeline::new(
        config.resume_dir.clone(),
        corpus.clone(),
        Arc::new(LlmResumeExtractor(llm.clone())),
        embedder.clone(),
    ));

    let router = Arc::new(PhaseRouter::new(
        Arc::new(LlmQueryClassifier(llm.clone())),
        Arc::new(LlmJobSpecExtractor(llm.clone())),
        Arc::new(LlmDiscussionResponder(llm)),
        Arc::new(RankingEngine::new(embedder)),
        corpus.clone(),
        config.router_policy,
    ));

    if config.ingest_on_startup {
        let pipeline = ingestion.clone();
        tokio::spawn(async move {
            if let Err(e) = pipeline.run().await {
                warn!("Startup ingestion failed: {e}");
            }
        });
    }

    // Build app state
    let state = AppState {
        chat: Arc::new(ChatService::new(sessions, router)),
        corpus,
        ingestion,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
