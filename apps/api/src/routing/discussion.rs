//! Discussion phase. Read-only: it borrows the JobSnapshot, the ScreeningResult and
//! resume excerpts for the shortlist, and can only produce an answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::prompts::{DISCUSSION_PROMPT, DISCUSSION_SYSTEM};
use super::transcript;
use crate::errors::AppError;
use crate::knowledge::CorpusSnapshot;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::llm_client::LlmClient;
use crate::models::lenient::{optional_text, string_list};
use crate::models::{JobSnapshot, Message, ScreeningResult};
use crate::ranking::features::evidence_lines;

const EXCERPTS_PER_CANDIDATE: usize = 3;
const EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone, Copy)]
pub struct DiscussionContext<'a> {
    pub message: &'a str,
    pub history: &'a [Message],
    pub job_snapshot: Option<&'a JobSnapshot>,
    pub screening: Option<&'a ScreeningResult>,
    pub evidence: &'a [CandidateEvidence],
}

/// Resume lines backing one shortlisted candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEvidence {
    pub candidate_id: String,
    pub display_name: String,
    pub excerpts: Vec<String>,
}

/// Excerpts for every shortlisted candidate still in the corpus, in rank order.
/// Candidates with no matching lines are left out.
pub fn collect_evidence(corpus: &CorpusSnapshot, screening: &ScreeningResult) -> Vec<CandidateEvidence> {
    screening
        .entries
        .iter()
        .filter_map(|entry| {
            let record = corpus.candidate(&entry.candidate_id)?;
            let excerpts = evidence_lines(
                &screening.job_snapshot,
                &record.raw_text,
                EXCERPTS_PER_CANDIDATE,
                EXCERPT_CHARS,
            );
            (!excerpts.is_empty()).then(|| CandidateEvidence {
                candidate_id: entry.candidate_id.clone(),
                display_name: entry.display_name.clone(),
                excerpts,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscussionReply {
    #[serde(default, deserialize_with = "optional_text")]
    pub acknowledgement: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub answers: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub reasoning: Option<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub follow_ups: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub closing: Option<String>,
}

impl DiscussionReply {
    /// Joins the non-empty parts. An entirely empty reply renders as "".
    pub fn to_markdown(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(ack) = &self.acknowledgement {
            parts.push(ack.clone());
        }
        if !self.answers.is_empty() {
            parts.push(self.answers.join("\n\n"));
        }
        if let Some(reasoning) = &self.reasoning {
            parts.push(format!("**Reasoning:** {reasoning}"));
        }
        if !self.follow_ups.is_empty() {
            let list = self
                .follow_ups
                .iter()
                .map(|f| format!("- {f}"))
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("**You could also ask:**\n{list}"));
        }
        if let Some(closing) = &self.closing {
            parts.push(closing.clone());
        }
        parts.join("\n\n")
    }
}

#[async_trait]
pub trait DiscussionResponder: Send + Sync {
    async fn respond(&self, ctx: DiscussionContext<'_>) -> Result<DiscussionReply, AppError>;
}

pub struct LlmDiscussionResponder(pub LlmClient);

#[async_trait]
impl DiscussionResponder for LlmDiscussionResponder {
    async fn respond(&self, ctx: DiscussionContext<'_>) -> Result<DiscussionReply, AppError> {
        let prompt = DISCUSSION_PROMPT
            .replace("{job}", &pretty(&ctx.job_snapshot))
            .replace("{screening}", &pretty(&ctx.screening))
            .replace("{evidence}", &pretty(&ctx.evidence))
            .replace("{history}", &transcript(ctx.history))
            .replace("{grounding}", GROUNDING_INSTRUCTION)
            .replace("{message}", ctx.message);
        self.0
            .call_json(&prompt, DISCUSSION_SYSTEM)
            .await
            .map_err(|e| AppError::upstream("Discussion failed", e))
    }
}

fn pretty<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "null".to_string())
}
