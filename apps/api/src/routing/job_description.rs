//! Job-description phase: extraction seam and assistant message.

use async_trait::async_trait;

use super::prompts::{JOB_SPEC_PROMPT, JOB_SPEC_SYSTEM};
use super::transcript;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::{JobSnapshot, Message};

/// Produces the updated JobSnapshot from the current one (if any) and the new message.
#[async_trait]
pub trait JobSpecExtractor: Send + Sync {
    async fn extract(
        &self,
        current: Option<&JobSnapshot>,
        message: &str,
        history: &[Message],
    ) -> Result<JobSnapshot, AppError>;
}

pub struct LlmJobSpecExtractor(pub LlmClient);

#[async_trait]
impl JobSpecExtractor for LlmJobSpecExtractor {
    async fn extract(
        &self,
        current: Option<&JobSnapshot>,
        message: &str,
        history: &[Message],
    ) -> Result<JobSnapshot, AppError> {
        let current = serde_json::to_string_pretty(&current).map_err(|e| AppError::Internal(e.into()))?;
        let prompt = JOB_SPEC_PROMPT
            .replace("{current}", &current)
            .replace("{history}", &transcript(history))
            .replace("{message}", message);
        self.0
            .call_json::<JobSnapshot>(&prompt, JOB_SPEC_SYSTEM)
            .await
            .map_err(|e| AppError::upstream("Job description extraction failed", e))
    }
}

/// Recruiter-facing summary of the snapshot plus what is still missing.
pub fn job_description_markdown(snapshot: &JobSnapshot, reset: bool) -> String {
    let mut lines = Vec::new();
    if reset {
        lines.push("Starting a new job search; previous requirements and results were cleared.".to_string());
        lines.push(String::new());
    }
    lines.push(format!(
        "### Job Snapshot: {}",
        snapshot.title.as_deref().unwrap_or("Untitled role")
    ));
    lines.push(String::new());

    if let Some(location) = &snapshot.location {
        lines.push(format!("- **Location:** {location}"));
    }
    if let Some(years) = snapshot.experience_years {
        lines.push(format!("- **Experience:** {years}+ years"));
    }
    if let Some(kind) = &snapshot.employment_type {
        lines.push(format!("- **Employment type:** {}", kind.label()));
    }
    for (label, items) in [
        ("Required skills", &snapshot.required_skills),
        ("Responsibilities", &snapshot.responsibilities),
        ("Education", &snapshot.education),
        ("Certifications", &snapshot.certifications),
        ("Languages", &snapshot.languages),
        ("Additional requirements", &snapshot.extra_requirements),
    ] {
        if !items.is_empty() {
            lines.push(format!("- **{label}:** {}", items.join(", ")));
        }
    }

    if !snapshot.outstanding_questions.is_empty() {
        lines.push(String::new());
        lines.push("#### Recommended information".to_string());
        lines.push(String::new());
        lines.extend(snapshot.outstanding_questions.iter().map(|q| format!("- {q}")));
    }

    lines.push(String::new());
    lines.push(if snapshot.incomplete {
        "Share a few more details and I can screen candidates, or ask me to screen now with what we have."
            .to_string()
    } else {
        "Ready to screen candidates whenever you are.".to_string()
    });
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_lists_fields_and_missing_details() {
        let snapshot = JobSnapshot {
            title: Some("Senior Python Developer".into()),
            experience_years: Some(5),
            required_skills: vec!["Python".into(), "Django".into()],
            ..Default::default()
        }
        .normalized();
        let markdown = job_description_markdown(&snapshot, false);

        assert!(markdown.starts_with("### Job Snapshot: Senior Python Developer"));
        assert!(markdown.contains("- **Experience:** 5+ years"));
        assert!(markdown.contains("- **Required skills:** Python, Django"));
        assert!(markdown.contains("#### Recommended information"));
        assert!(markdown.contains("Where is the role located"));
        assert!(markdown.ends_with("Ready to screen candidates whenever you are."));
    }

    #[test]
    fn test_markdown_mentions_reset() {
        let markdown = job_description_markdown(&JobSnapshot::default().normalized(), true);
        assert!(markdown.starts_with("Starting a new job search"));
        assert!(markdown.contains("Untitled role"));
    }
}
