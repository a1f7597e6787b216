//! Phase Router: per-turn classification, planning and sequential phase dispatch.

pub mod classifier;
pub mod discussion;
pub mod flow;
pub mod job_description;
pub mod plan;
pub mod prompts;

pub use classifier::LlmQueryClassifier;
pub use discussion::LlmDiscussionResponder;
pub use flow::{PhaseRouter, TurnError, TurnStatus};
pub use job_description::LlmJobSpecExtractor;
pub use plan::RouterPolicy;

use crate::models::{Message, Role};

/// Messages of history shown to the classifier and phase capabilities.
pub const HISTORY_LIMIT: usize = 20;

/// Plain-text rendering of recent messages for prompts.
pub(crate) fn transcript(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "(no previous messages)".to_string();
    }
    messages
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "Recruiter",
                Role::Assistant => "Assistant",
            };
            format!("{speaker}: {}", m.content)
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
