//! RankingConfig: per-session ranking knobs with a validated partial-merge patch.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

pub const MIN_TOP_K: u32 = 1;
pub const MAX_TOP_K: u32 = 20;
pub const DEFAULT_TOP_K: u32 = 5;

/// Structured features scored against a JobSnapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Skills,
    Experience,
    Education,
    Title,
    Other,
}

impl Feature {
    pub const ALL: [Feature; 5] = [
        Feature::Skills,
        Feature::Experience,
        Feature::Education,
        Feature::Title,
        Feature::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::Skills => "skills",
            Feature::Experience => "experience",
            Feature::Education => "education",
            Feature::Title => "title",
            Feature::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic: f64,
    pub feature: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic: 0.8,
            feature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub skills: f64,
    pub experience: f64,
    pub education: f64,
    pub title: f64,
    pub other: f64,
}

impl Default for FeatureWeights {
    fn default() -> Self {
        Self {
            skills: 1.0,
            experience: 1.0,
            education: 1.0,
            title: 1.0,
            other: 1.0,
        }
    }
}

impl FeatureWeights {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Skills => self.skills,
            Feature::Experience => self.experience,
            Feature::Education => self.education,
            Feature::Title => self.title,
            Feature::Other => self.other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingConfig {
    pub top_k: u32,
    pub scoring_weights: ScoringWeights,
    pub feature_weights: FeatureWeights,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            scoring_weights: ScoringWeights::default(),
            feature_weights: FeatureWeights::default(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Partial updates
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScoringWeightsPatch {
    pub semantic: Option<f64>,
    pub feature: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureWeightsPatch {
    pub skills: Option<f64>,
    pub experience: Option<f64>,
    pub education: Option<f64>,
    pub title: Option<f64>,
    pub other: Option<f64>,
}

/// Partial update. Only supplied keys change; unknown keys are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RankingConfigPatch {
    pub top_k: Option<i64>,
    pub scoring_weights: Option<ScoringWeightsPatch>,
    pub feature_weights: Option<FeatureWeightsPatch>,
}

impl RankingConfigPatch {
    pub fn top_k(top_k: i64) -> Self {
        Self {
            top_k: Some(top_k),
            ..Default::default()
        }
    }

    /// Parses an untrusted JSON body. Type errors and unknown keys become `Validation`.
    pub fn from_json(value: serde_json::Value) -> Result<Self, AppError> {
        serde_json::from_value(value)
            .map_err(|e| AppError::Validation(format!("Invalid ranking config: {e}")))
    }

    pub fn is_empty(&self) -> bool {
        self.top_k.is_none() && self.scoring_weights.is_none() && self.feature_weights.is_none()
    }

    /// Returns `base` with the supplied keys applied, or a validation error. `base` is untouched.
    pub fn merged(&self, base: &RankingConfig) -> Result<RankingConfig, AppError> {
        let mut next = *base;

        if let Some(top_k) = self.top_k {
            if top_k < MIN_TOP_K as i64 || top_k > MAX_TOP_K as i64 {
                return Err(AppError::Validation(format!(
                    "top_k must be between {MIN_TOP_K} and {MAX_TOP_K}, got {top_k}"
                )));
            }
            next.top_k = top_k as u32;
        }

        if let Some(patch) = &self.scoring_weights {
            if let Some(v) = patch.semantic {
                next.scoring_weights.semantic = non_negative("scoring_weights.semantic", v)?;
            }
            if let Some(v) = patch.feature {
                next.scoring_weights.feature = non_negative("scoring_weights.feature", v)?;
            }
        }

        if let Some(patch) = &self.feature_weights {
            let fields = [
                ("skills", patch.skills, &mut next.feature_weights.skills),
                ("experience", patch.experience, &mut next.feature_weights.experience),
                ("education", patch.education, &mut next.feature_weights.education),
                ("title", patch.title, &mut next.feature_weights.title),
                ("other", patch.other, &mut next.feature_weights.other),
            ];
            for (name, value, slot) in fields {
                if let Some(v) = value {
                    *slot = positive(&format!("feature_weights.{name}"), v)?;
                }
            }
        }

        Ok(next)
    }
}

fn non_negative(key: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(AppError::Validation(format!(
            "{key} must be a finite number >= 0, got {value}"
        )))
    }
}

fn positive(key: &str, value: f64) -> Result<f64, AppError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(AppError::Validation(format!(
            "{key} must be a finite number > 0, got {value}"
        )))
    }
}
