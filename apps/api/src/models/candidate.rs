use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::lenient::{optional_fractional_years, optional_text, string_list};

const EMBED_EXCERPT_CHARS: usize = 6_000;

/// Structured fields returned by resume extraction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedResume {
    #[serde(default, alias = "name", deserialize_with = "optional_text")]
    pub candidate_name: Option<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub current_title: Option<String>,
    #[serde(default, alias = "job_titles", deserialize_with = "string_list")]
    pub titles: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub skills: Vec<String>,
    #[serde(
        default,
        alias = "years_of_experience",
        deserialize_with = "optional_fractional_years"
    )]
    pub experience_years: Option<f32>,
    #[serde(default, deserialize_with = "string_list")]
    pub education: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub certifications: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "optional_text")]
    pub summary: Option<String>,
}

/// One entry in the shared candidate corpus. Keyed by a stable id derived from
/// the content hash at first ingestion of its source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: String,
    pub file_name: String,
    #[serde(flatten)]
    pub profile: ExtractedResume,
    pub content_hash: String,
    pub raw_text: String,
    pub ingested_at: DateTime<Utc>,
}

impl CandidateRecord {
    /// Candidate name, then file name, then current title, then id.
    pub fn display_name(&self) -> String {
        self.profile
            .candidate_name
            .clone()
            .or_else(|| {
                let trimmed = self.file_name.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .or_else(|| self.profile.current_title.clone())
            .unwrap_or_else(|| self.id.clone())
    }

    /// Every title the candidate has held, current title first.
    pub fn all_titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = Vec::new();
        if let Some(current) = &self.profile.current_title {
            titles.push(current);
        }
        for title in &self.profile.titles {
            if !titles.iter().any(|t| t.eq_ignore_ascii_case(title)) {
                titles.push(title);
            }
        }
        titles
    }

    /// Text sent to the embedding capability; callers truncate to the service limit.
    pub fn embedding_text(&self) -> String {
        let p = &self.profile;
        let mut parts: Vec<String> = Vec::new();
        if let Some(name) = &p.candidate_name {
            parts.push(format!("Name: {name}"));
        }
        let titles = self.all_titles();
        if !titles.is_empty() {
            parts.push(format!("Titles: {}", titles.join(", ")));
        }
        if let Some(years) = p.experience_years {
            parts.push(format!("Experience: {years} years"));
        }
        for (label, items) in [
            ("Skills", &p.skills),
            ("Education", &p.education),
            ("Certifications", &p.certifications),
            ("Languages", &p.languages),
        ] {
            if !items.is_empty() {
                parts.push(format!("{label}: {}", items.join(", ")));
            }
        }
        if let Some(summary) = &p.summary {
            parts.push(format!("Summary: {summary}"));
        }
        let excerpt: String = self.raw_text.chars().take(EMBED_EXCERPT_CHARS).collect();
        if !excerpt.trim().is_empty() {
            parts.push(excerpt);
        }
        parts.join("\n")
    }
}

/// Corpus listing entry. Omits raw text.
#[derive(Debug, Clone, Serialize)]
pub struct CandidateSummary {
    pub id: String,
    pub file_name: String,
    pub display_name: String,
    pub current_title: Option<String>,
    pub skills: Vec<String>,
    pub experience_years: Option<f32>,
    pub ingested_at: DateTime<Utc>,
}

impl From<&CandidateRecord> for CandidateSummary {
    fn from(record: &CandidateRecord) -> Self {
        Self {
            id: record.id.clone(),
            file_name: record.file_name.clone(),
            display_name: record.display_name(),
            current_title: record.profile.current_title.clone(),
            skills: record.profile.skills.clone(),
            experience_years: record.profile.experience_years,
            ingested_at: record.ingested_at,
        }
    }
}

#[cfg(test)]
pub(crate) fn candidate_fixture(id: &str, profile: ExtractedResume) -> CandidateRecord {
    CandidateRecord {
        id: id.to_string(),
        file_name: format!("{id}.txt"),
        profile,
        content_hash: format!("hash-{id}"),
        raw_text: String::new(),
        ingested_at: Utc::now(),
    }
}
