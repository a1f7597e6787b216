//! Ranking Engine: explainable, deterministic shortlist for a JobSnapshot.
//!
//! composite = (w_sem * semantic + w_feat * feature) / (w_sem + w_feat)
//!
//! `feature` is the weighted mean of the applied feature sub-scores (features the
//! JobSnapshot says nothing about are left out of the normalization). Both weights
//! at zero is a degenerate config: every composite is 0 and the result is flagged.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::features::{match_features, FeatureMatch};
use crate::embeddings::{cosine_similarity, truncate_for_embedding, Embedder};
use crate::errors::AppError;
use crate::knowledge::CorpusSnapshot;
use crate::models::{
    CandidateRecord, Feature, FeatureScore, JobSnapshot, RankedCandidate, RankingConfig,
    ScreeningResult,
};

/// Feature score used when the JobSnapshot gives nothing to match on.
pub const NEUTRAL_FEATURE_SCORE: f64 = 0.5;

pub const LOW_CONFIDENCE_WARNING: &str =
    "The job description has no usable requirements yet, so this shortlist is low confidence.";
pub const DEGENERATE_CONFIG_WARNING: &str =
    "Both scoring weights are zero, so every composite score is 0. Adjust the ranking configuration.";

pub struct RankingEngine {
    embedder: Arc<dyn Embedder>,
}

struct Scored<'a> {
    candidate: &'a CandidateRecord,
    semantic: f64,
    feature: f64,
    composite: f64,
    matches: Vec<FeatureMatch>,
}

impl RankingEngine {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Ranks `corpus` against `job`. An empty corpus yields an empty result.
    pub async fn rank(
        &self,
        job: &JobSnapshot,
        config: &RankingConfig,
        corpus: &CorpusSnapshot,
    ) -> Result<ScreeningResult, AppError> {
        let low_confidence = job.is_empty();
        let weights = config.scoring_weights;
        let weight_sum = weights.semantic + weights.feature;
        let degenerate = weight_sum <= 0.0;

        let mut warnings = Vec::new();
        if low_confidence {
            warnings.push(LOW_CONFIDENCE_WARNING.to_string());
        }
        if degenerate {
            warn!("Degenerate ranking config: both scoring weights are zero");
            warnings.push(DEGENERATE_CONFIG_WARNING.to_string());
        }

        let candidates: Vec<&CandidateRecord> = corpus.candidates.values().collect();
        let semantic = self.semantic_scores(job, &candidates, corpus).await?;

        let mut scored: Vec<Scored> = candidates
            .iter()
            .copied()
            .zip(semantic)
            .map(|(candidate, semantic)| {
                let matches = match_features(job, candidate);
                let feature = feature_score(&matches, config);
                let composite = if degenerate {
                    0.0
                } else {
                    (weights.semantic * semantic + weights.feature * feature) / weight_sum
                };
                Scored {
                    candidate,
                    semantic,
                    feature,
                    composite,
                    matches,
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.composite
                .total_cmp(&a.composite)
                .then_with(|| b.semantic.total_cmp(&a.semantic))
                .then_with(|| a.candidate.id.cmp(&b.candidate.id))
        });
        scored.truncate(config.top_k as usize);

        let entries: Vec<RankedCandidate> = scored
            .into_iter()
            .map(|s| to_ranked(s, config))
            .collect();
        debug!(
            corpus_size = corpus.len(),
            returned = entries.len(),
            "Ranking complete"
        );

        Ok(ScreeningResult {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            job_snapshot: job.clone(),
            ranking_config: *config,
            entries,
            corpus_size: corpus.len(),
            low_confidence,
            degenerate_config: degenerate,
            warnings,
        })
    }

    /// Cosine similarity clamped to [0, 1]. Candidates without a stored vector are
    /// embedded in the same call as the job text; nothing is persisted.
    async fn semantic_scores(
        &self,
        job: &JobSnapshot,
        candidates: &[&CandidateRecord],
        corpus: &CorpusSnapshot,
    ) -> Result<Vec<f64>, AppError> {
        let query = job.query_text();
        if query.is_empty() || candidates.is_empty() {
            return Ok(vec![0.0; candidates.len()]);
        }

        let missing: Vec<usize> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| corpus.embedding(&c.id).is_none())
            .map(|(i, _)| i)
            .collect();
        let mut texts = vec![truncate_for_embedding(&query)];
        texts.extend(
            missing
                .iter()
                .map(|&i| truncate_for_embedding(&candidates[i].embedding_text())),
        );
        if !missing.is_empty() {
            debug!(count = missing.len(), "Embedding candidates without stored vectors");
        }

        let vectors = self.embedder.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::Upstream(format!(
                "Embedding service returned {} vectors for {} inputs",
                vectors.len(),
                texts.len()
            )));
        }
        let (query_vector, fresh) = vectors.split_at(1);

        let mut fresh_iter = fresh.iter();
        let scores = candidates
            .iter()
            .map(|c| {
                let vector = match corpus.embedding(&c.id) {
                    Some(stored) => stored,
                    None => fresh_iter.next().map(Vec::as_slice).unwrap_or_default(),
                };
                cosine_similarity(&query_vector[0], vector).clamp(0.0, 1.0)
            })
            .collect();
        Ok(scores)
    }
}

/// Weighted mean of applied sub-scores, or neutral when nothing applies.
pub fn feature_score(matches: &[FeatureMatch], config: &RankingConfig) -> f64 {
    let (weighted, total) = matches.iter().fold((0.0, 0.0), |(sum, total), m| {
        let w = config.feature_weights.get(m.feature);
        (sum + w * m.score, total + w)
    });
    if total <= 0.0 {
        NEUTRAL_FEATURE_SCORE
    } else {
        weighted / total
    }
}

fn to_ranked(scored: Scored<'_>, config: &RankingConfig) -> RankedCandidate {
    let rationale = rationale(&scored, config);
    let matched_skills = scored
        .matches
        .iter()
        .find(|m| m.feature == Feature::Skills)
        .map(|m| m.evidence.clone())
        .unwrap_or_default();
    RankedCandidate {
        candidate_id: scored.candidate.id.clone(),
        display_name: scored.candidate.display_name(),
        composite: scored.composite,
        semantic: scored.semantic,
        feature: scored.feature,
        feature_scores: scored
            .matches
            .iter()
            .map(|m| FeatureScore {
                feature: m.feature,
                score: m.score,
                weight: config.feature_weights.get(m.feature),
            })
            .collect(),
        matched_skills,
        experience_years: scored.candidate.profile.experience_years,
        education: scored.candidate.profile.education.clone(),
        rationale,
    }
}

/// Names the dominant component and the strongest and weakest applied features.
fn rationale(scored: &Scored<'_>, config: &RankingConfig) -> String {
    let w = config.scoring_weights;
    let semantic_part = w.semantic * scored.semantic;
    let feature_part = w.feature * scored.feature;

    let mut sentences = Vec::new();
    let lead = match semantic_part.partial_cmp(&feature_part) {
        _ if semantic_part == 0.0 && feature_part == 0.0 => {
            "No scoring component contributed".to_string()
        }
        Some(Ordering::Less) => format!(
            "Structured feature match ({:.2}) dominated over semantic similarity ({:.2})",
            scored.feature, scored.semantic
        ),
        _ => format!(
            "Semantic similarity ({:.2}) dominated over structured feature match ({:.2})",
            scored.semantic, scored.feature
        ),
    };
    sentences.push(lead);

    if scored.matches.is_empty() {
        sentences.push("no job requirements were available to match features against".into());
    } else {
        // First of equals wins, so ties resolve in feature order.
        let mut best = &scored.matches[0];
        let mut worst = &scored.matches[0];
        for m in &scored.matches[1..] {
            if m.score > best.score {
                best = m;
            }
            if m.score < worst.score {
                worst = m;
            }
        }
        sentences.push(format!("strongest: {}", describe(best)));
        if worst.feature != best.feature {
            sentences.push(format!("weakest: {}", describe(worst)));
        }
    }
    format!("{}.", sentences.join("; "))
}

fn describe(m: &FeatureMatch) -> String {
    if m.evidence.is_empty() {
        format!("{} {:.2}", m.feature.as_str(), m.score)
    } else {
        format!(
            "{} {:.2} ({})",
            m.feature.as_str(),
            m.score,
            m.evidence.join(", ")
        )
    }
}
