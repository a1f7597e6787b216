//! Deterministic in-process fakes for the capability traits, plus shared fixtures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::embeddings::{Embedder, EmbeddingError};
use crate::errors::AppError;
use crate::ingestion::extractor::ResumeExtractor;
use crate::models::{
    ExtractedResume, Feature, FeatureScore, JobSnapshot, Message, RankedCandidate, RankingConfig,
    ScreeningResult,
};
use crate::routing::classifier::{ClassifierInput, QueryClassifier};
use crate::routing::discussion::{
    CandidateEvidence, DiscussionContext, DiscussionReply, DiscussionResponder,
};
use crate::routing::job_description::JobSpecExtractor;
use crate::routing::plan::RoutingDecision;

const FAKE_DIMENSIONS: usize = 64;

/// Hashed bag-of-words vectors: texts sharing words get similar vectors.
#[derive(Default)]
pub struct FakeEmbedder {
    calls: AtomicUsize,
    texts: AtomicUsize,
    fail_next: AtomicBool,
}

impl FakeEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn texts_embedded(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; FAKE_DIMENSIONS];
        for word in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let word = word.to_lowercase();
            // FNV-1a
            let hash = word
                .bytes()
                .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
                    (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
                });
            vector[(hash % FAKE_DIMENSIONS as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(EmbeddingError::Api {
                status: 503,
                message: "embedding service unavailable".into(),
            });
        }
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }
}

/// Reads the first line as the name, a `Skills:` line as the skill list and
/// the first number followed by "years" as experience.
#[derive(Default)]
pub struct FakeResumeExtractor {
    calls: AtomicUsize,
}

impl FakeResumeExtractor {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResumeExtractor for FakeResumeExtractor {
    async fn extract(&self, _file_name: &str, text: &str) -> Result<ExtractedResume, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if text.contains("FAIL_EXTRACTION") {
            return Err(AppError::Upstream("extraction failed".into()));
        }

        let candidate_name = text
            .lines()
            .next()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let skills = text
            .lines()
            .find_map(|l| l.trim().strip_prefix("Skills:"))
            .map(|rest| {
                rest.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        let words: Vec<&str> = text.split_whitespace().collect();
        let experience_years = words.windows(2).find_map(|w| {
            w[1].trim_matches(|c: char| !c.is_alphabetic())
                .eq_ignore_ascii_case("years")
                .then(|| w[0].trim_end_matches('+').parse::<f32>().ok())
                .flatten()
        });

        Ok(ExtractedResume {
            candidate_name,
            skills,
            experience_years,
            ..Default::default()
        })
    }
}

/// Replays scripted decisions in order. An empty script fails like an unavailable service.
#[derive(Default)]
pub struct FakeClassifier {
    script: Mutex<VecDeque<RoutingDecision>>,
    last_history: Mutex<Vec<String>>,
}

impl FakeClassifier {
    pub fn push(&self, decision: RoutingDecision) {
        self.script.lock().unwrap().push_back(decision);
    }

    /// Contents of the history passed on the latest call.
    pub fn last_history(&self) -> Vec<String> {
        self.last_history.lock().unwrap().clone()
    }
}

#[async_trait]
impl QueryClassifier for FakeClassifier {
    async fn classify(&self, input: ClassifierInput<'_>) -> Result<RoutingDecision, AppError> {
        *self.last_history.lock().unwrap() =
            input.history.iter().map(|m| m.content.clone()).collect();
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::Upstream("classifier unavailable".into()))
    }
}

#[derive(Default)]
pub struct FakeJobSpecExtractor {
    script: Mutex<VecDeque<Result<JobSnapshot, AppError>>>,
    last_current: Mutex<Option<JobSnapshot>>,
    calls: AtomicUsize,
}

impl FakeJobSpecExtractor {
    pub fn push(&self, result: Result<JobSnapshot, AppError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Title of the snapshot passed as `current` on the latest call.
    pub fn last_current_title(&self) -> Option<String> {
        self.last_current
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|s| s.title.clone())
    }
}

#[async_trait]
impl JobSpecExtractor for FakeJobSpecExtractor {
    async fn extract(
        &self,
        current: Option<&JobSnapshot>,
        _message: &str,
        _history: &[Message],
    ) -> Result<JobSnapshot, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_current.lock().unwrap() = current.cloned();
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::Upstream("job spec extractor unavailable".into())))
    }
}

#[derive(Default)]
pub struct FakeResponder {
    calls: AtomicUsize,
    saw_screening: Mutex<Option<bool>>,
    last_evidence: Mutex<Vec<CandidateEvidence>>,
}

impl FakeResponder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_saw_screening(&self) -> Option<bool> {
        *self.saw_screening.lock().unwrap()
    }

    pub fn last_evidence(&self) -> Vec<CandidateEvidence> {
        self.last_evidence.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiscussionResponder for FakeResponder {
    async fn respond(&self, ctx: DiscussionContext<'_>) -> Result<DiscussionReply, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.saw_screening.lock().unwrap() = Some(ctx.screening.is_some());
        *self.last_evidence.lock().unwrap() = ctx.evidence.to_vec();
        Ok(DiscussionReply {
            answers: vec![format!("You asked: {}", ctx.message)],
            ..Default::default()
        })
    }
}

/// Two-entry screening result for a Python role. The first entry is "Ada Lovelace".
pub fn screening_fixture() -> ScreeningResult {
    let entry = |id: &str, name: &str, composite: f64, skills: &[&str], years: f32| {
        RankedCandidate {
            candidate_id: id.to_string(),
            display_name: name.to_string(),
            composite,
            semantic: composite,
            feature: composite,
            feature_scores: vec![FeatureScore {
                feature: Feature::Skills,
                score: composite,
                weight: 1.0,
            }],
            matched_skills: skills.iter().map(|s| s.to_string()).collect(),
            experience_years: Some(years),
            education: Vec::new(),
            rationale: format!("strongest: skills {composite:.2}"),
        }
    };
    ScreeningResult {
        id: Uuid::new_v4(),
        created_at: Utc::now(),
        job_snapshot: JobSnapshot {
            title: Some("Senior Python Developer".into()),
            experience_years: Some(5),
            required_skills: vec!["Python".into(), "Django".into()],
            ..Default::default()
        },
        ranking_config: RankingConfig::default(),
        entries: vec![
            entry("cand_ada", "Ada Lovelace", 0.875, &["Python", "Django"], 6.0),
            entry("cand_bob", "Bob Stone", 0.5, &["Python"], 2.0),
        ],
        corpus_size: 2,
        low_confidence: false,
        degenerate_config: false,
        warnings: Vec::new(),
    }
}
