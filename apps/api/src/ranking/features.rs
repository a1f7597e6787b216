//! Per-feature matchers. Each returns `None` when the JobSnapshot says nothing about
//! the feature, so the caller can leave it out of the weighted average.
//!
//! Matching strengths follow the keyword scorer convention:
//! - stated in the structured field → 1.0
//! - only found in the raw resume text → 0.6
//! - absent → 0.0

use std::collections::BTreeSet;

use crate::models::{CandidateRecord, Feature, JobSnapshot};

const EXACT: f64 = 1.0;
const RAW_TEXT: f64 = 0.6;
const UNKNOWN_EXPERIENCE: f64 = 0.5;

const STOPWORDS: [&str; 14] = [
    "a", "an", "and", "or", "of", "in", "the", "with", "for", "to", "on", "at", "degree", "related",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatch {
    pub feature: Feature,
    pub score: f64,
    /// Requirement items credited, for the rationale.
    pub evidence: Vec<String>,
}

/// Every applicable feature for this candidate, in `Feature::ALL` order.
pub fn match_features(job: &JobSnapshot, candidate: &CandidateRecord) -> Vec<FeatureMatch> {
    let raw = candidate.raw_text.to_lowercase();
    Feature::ALL
        .iter()
        .filter_map(|feature| match feature {
            Feature::Skills => skills(job, candidate, &raw),
            Feature::Experience => experience(job, candidate),
            Feature::Education => education(job, candidate, &raw),
            Feature::Title => title(job, candidate),
            Feature::Other => other(job, candidate, &raw),
        })
        .collect()
}

fn skills(job: &JobSnapshot, candidate: &CandidateRecord, raw: &str) -> Option<FeatureMatch> {
    if job.required_skills.is_empty() {
        return None;
    }
    let (score, evidence) = list_match(&job.required_skills, &candidate.profile.skills, raw);
    Some(FeatureMatch {
        feature: Feature::Skills,
        score,
        evidence,
    })
}

fn experience(job: &JobSnapshot, candidate: &CandidateRecord) -> Option<FeatureMatch> {
    let required = job.experience_years?;
    let (score, evidence) = match (required, candidate.profile.experience_years) {
        (0, _) => (EXACT, Vec::new()),
        (_, None) => (UNKNOWN_EXPERIENCE, Vec::new()),
        (req, Some(years)) => (
            (years as f64 / req as f64).min(1.0),
            vec![format!("{years} yrs vs {req} required")],
        ),
    };
    Some(FeatureMatch {
        feature: Feature::Experience,
        score,
        evidence,
    })
}

fn education(job: &JobSnapshot, candidate: &CandidateRecord, raw: &str) -> Option<FeatureMatch> {
    if job.education.is_empty() {
        return None;
    }
    let held_level = candidate
        .profile
        .education
        .iter()
        .filter_map(|e| degree_level(e))
        .max();
    let raw_level = degree_level(raw);
    let held_tokens: BTreeSet<String> = candidate
        .profile
        .education
        .iter()
        .flat_map(|e| tokens(e))
        .collect();

    let mut best = 0.0_f64;
    let mut evidence = Vec::new();
    for requirement in &job.education {
        let score = match degree_level(requirement) {
            Some(required) => match (held_level, raw_level) {
                (Some(held), _) if held >= required => EXACT,
                (_, Some(found)) if found >= required => RAW_TEXT,
                (Some(held), _) => held as f64 / required as f64,
                _ => 0.0,
            },
            None => {
                let wanted = tokens(requirement);
                if wanted.is_empty() {
                    continue;
                }
                let overlap = wanted.iter().filter(|t| held_tokens.contains(*t)).count();
                let in_raw = wanted.iter().filter(|t| raw.contains(t.as_str())).count();
                let structured = overlap as f64 / wanted.len() as f64;
                let fallback = RAW_TEXT * in_raw as f64 / wanted.len() as f64;
                structured.max(fallback)
            }
        };
        if score > best {
            best = score;
            evidence = vec![requirement.clone()];
        }
    }
    Some(FeatureMatch {
        feature: Feature::Education,
        score: best,
        evidence,
    })
}

fn title(job: &JobSnapshot, candidate: &CandidateRecord) -> Option<FeatureMatch> {
    let wanted_title = job.title.as_deref()?;
    let wanted_norm = normalize(wanted_title);
    let wanted = tokens(wanted_title);

    let mut best = 0.0_f64;
    let mut evidence = Vec::new();
    for held in candidate.all_titles() {
        let held_norm = normalize(held);
        let score = if !held_norm.is_empty()
            && (contains_term(&held_norm, &wanted_norm) || contains_term(&wanted_norm, &held_norm))
        {
            EXACT
        } else if wanted.is_empty() {
            0.0
        } else {
            let held_tokens = tokens(held);
            wanted.iter().filter(|t| held_tokens.contains(*t)).count() as f64 / wanted.len() as f64
        };
        if score > best {
            best = score;
            evidence = vec![held.to_string()];
        }
    }
    Some(FeatureMatch {
        feature: Feature::Title,
        score: best,
        evidence,
    })
}

fn other(job: &JobSnapshot, candidate: &CandidateRecord, raw: &str) -> Option<FeatureMatch> {
    let wanted: Vec<String> = job
        .certifications
        .iter()
        .chain(job.languages.iter())
        .cloned()
        .collect();
    if wanted.is_empty() {
        return None;
    }
    let held: Vec<String> = candidate
        .profile
        .certifications
        .iter()
        .chain(candidate.profile.languages.iter())
        .cloned()
        .collect();
    let (score, evidence) = list_match(&wanted, &held, raw);
    Some(FeatureMatch {
        feature: Feature::Other,
        score,
        evidence,
    })
}

/// Average strength over `wanted`, crediting structured matches over raw-text ones.
fn list_match(wanted: &[String], held: &[String], raw: &str) -> (f64, Vec<String>) {
    let held_norm: Vec<String> = held.iter().map(|h| normalize(h)).collect();
    let mut total = 0.0;
    let mut evidence = Vec::new();
    for item in wanted {
        let item_norm = normalize(item);
        if item_norm.is_empty() {
            continue;
        }
        let structured = held_norm.iter().any(|h| {
            !h.is_empty() && (contains_term(h, &item_norm) || contains_term(&item_norm, h))
        });
        if structured {
            total += EXACT;
            evidence.push(item.clone());
        } else if contains_term(raw, &item_norm) {
            total += RAW_TEXT;
            evidence.push(item.clone());
        }
    }
    (total / wanted.len() as f64, evidence)
}

/// Resume lines that mention one of the job's skills or title words, in document order.
/// At most `limit` lines, each cut to `max_chars` characters.
pub fn evidence_lines(job: &JobSnapshot, raw: &str, limit: usize, max_chars: usize) -> Vec<String> {
    let mut terms: BTreeSet<String> = job
        .required_skills
        .iter()
        .map(|s| normalize(s))
        .filter(|s| !s.is_empty())
        .collect();
    if let Some(title) = &job.title {
        terms.extend(tokens(title));
    }
    if terms.is_empty() {
        return Vec::new();
    }

    let mut lines: Vec<String> = Vec::new();
    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if lines.len() == limit {
            break;
        }
        let norm = normalize(line);
        if terms.iter().any(|t| contains_term(&norm, t)) {
            let excerpt: String = line.chars().take(max_chars).collect();
            if !lines.contains(&excerpt) {
                lines.push(excerpt);
            }
        }
    }
    lines
}

/// Substring match on term boundaries, so "go" does not match "good".
fn contains_term(haystack: &str, term: &str) -> bool {
    let is_word = |c: char| c.is_alphanumeric() || c == '+' || c == '#';
    haystack.match_indices(term).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + term.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn tokens(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Degree ladder: associate/diploma 1, bachelor 2, master 3, doctorate 4.
fn degree_level(text: &str) -> Option<u8> {
    let words = tokens(text);
    let has = |candidates: &[&str]| candidates.iter().any(|c| words.contains(*c));
    if has(&["phd", "ph", "doctorate", "doctoral", "dphil"]) {
        Some(4)
    } else if has(&["master", "masters", "msc", "mba", "ms", "ma", "meng", "mtech"]) {
        Some(3)
    } else if has(&["bachelor", "bachelors", "bsc", "ba", "bs", "beng", "btech", "undergraduate"]) {
        Some(2)
    } else if has(&["associate", "diploma"]) {
        Some(1)
    } else {
        None
    }
}
