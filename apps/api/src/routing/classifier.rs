use async_trait::async_trait;
use serde::Serialize;

use super::plan::{PlanContext, RoutingDecision};
use super::prompts::{CLASSIFY_PROMPT, CLASSIFY_SYSTEM};
use super::transcript;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::{Message, RankingConfig};

/// Everything the classifier may look at. Borrowed from the session for one turn.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierInput<'a> {
    pub message: &'a str,
    pub history: &'a [Message],
    pub context: PlanContext,
    pub ranking_config: &'a RankingConfig,
}

#[derive(Serialize)]
struct StateSummary<'a> {
    #[serde(flatten)]
    context: PlanContext,
    ranking_config: &'a RankingConfig,
}

/// Maps a user message to a raw routing decision. The router treats it as advisory.
#[async_trait]
pub trait QueryClassifier: Send + Sync {
    async fn classify(&self, input: ClassifierInput<'_>) -> Result<RoutingDecision, AppError>;
}

pub struct LlmQueryClassifier(pub LlmClient);

#[async_trait]
impl QueryClassifier for LlmQueryClassifier {
    async fn classify(&self, input: ClassifierInput<'_>) -> Result<RoutingDecision, AppError> {
        let state = serde_json::to_string_pretty(&StateSummary {
            context: input.context,
            ranking_config: input.ranking_config,
        })
        .map_err(|e| AppError::Internal(e.into()))?;
        let prompt = CLASSIFY_PROMPT
            .replace("{state}", &state)
            .replace("{history}", &transcript(input.history))
            .replace("{message}", input.message);
        self.0
            .call_json(&prompt, CLASSIFY_SYSTEM)
            .await
            .map_err(|e| AppError::upstream("Query classification failed", e))
    }
}
