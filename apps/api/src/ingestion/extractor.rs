use async_trait::async_trait;

use super::prompts::{RESUME_EXTRACT_PROMPT, RESUME_EXTRACT_SYSTEM};
use crate::embeddings::truncate_for_embedding;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::lenient::dedupe_case_insensitive;
use crate::models::ExtractedResume;

/// Structured extraction of one resume. Held by `IngestionPipeline` as `Arc<dyn ResumeExtractor>`.
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedResume, AppError>;
}

/// Resume extraction via the text-generation capability.
pub struct LlmResumeExtractor(pub LlmClient);

#[async_trait]
impl ResumeExtractor for LlmResumeExtractor {
    async fn extract(&self, file_name: &str, text: &str) -> Result<ExtractedResume, AppError> {
        let prompt = RESUME_EXTRACT_PROMPT
            .replace("{file_name}", file_name)
            .replace("{resume_text}", &truncate_for_embedding(text));
        let extracted: ExtractedResume = self
            .0
            .call_json(&prompt, RESUME_EXTRACT_SYSTEM)
            .await
            .map_err(|e| AppError::upstream("Resume extraction failed", e))?;
        Ok(normalize(extracted))
    }
}

/// Splits packed skill strings and de-duplicates list fields.
pub fn normalize(mut resume: ExtractedResume) -> ExtractedResume {
    let skills: Vec<String> = resume
        .skills
        .iter()
        .flat_map(|s| s.split([',', ';', '|', '•', '\n']))
        .map(str::to_string)
        .collect();
    resume.skills = dedupe_case_insensitive(skills);
    resume.titles = dedupe_case_insensitive(resume.titles);
    resume.education = dedupe_case_insensitive(resume.education);
    resume.certifications = dedupe_case_insensitive(resume.certifications);
    resume.languages = dedupe_case_insensitive(resume.languages);
    resume
}
