use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::job::JobSnapshot;
use super::ranking_config::{Feature, RankingConfig};

/// One applied feature sub-score. Features absent from the JobSnapshot are not listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: Feature,
    pub score: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate_id: String,
    pub display_name: String,
    pub composite: f64,
    pub semantic: f64,
    pub feature: f64,
    pub feature_scores: Vec<FeatureScore>,
    pub matched_skills: Vec<String>,
    pub experience_years: Option<f32>,
    pub education: Vec<String>,
    pub rationale: String,
}

/// Immutable snapshot of one screening run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub job_snapshot: JobSnapshot,
    pub ranking_config: RankingConfig,
    pub entries: Vec<RankedCandidate>,
    pub corpus_size: usize,
    /// The JobSnapshot carried no usable requirements.
    pub low_confidence: bool,
    /// Both scoring weights were zero; every composite is 0.
    pub degenerate_config: bool,
    #[serde(default)]
    pub warnings: Vec<String>,
}
