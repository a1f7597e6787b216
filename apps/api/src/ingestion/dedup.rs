//! Content-hash deduplication: decides what an ingestion run must do per document.
//!
//! Pure function of (manifest, current documents), so a run can be planned and
//! tested without touching storage or any external capability.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::source::SourceDocument;
use crate::knowledge::Manifest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentAction {
    /// Hash matches the manifest. No extraction, no embedding.
    Unchanged,
    /// Not in the manifest.
    New,
    /// In the manifest with a different hash; keeps its candidate id.
    Changed { candidate_id: String },
    /// Same content as another document, which wins.
    Duplicate { of: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateDocument {
    pub document: String,
    pub duplicate_of: String,
}

#[derive(Debug, Clone, Default)]
pub struct RunPlan {
    /// Document name to action, in sorted document order.
    pub actions: Vec<(String, DocumentAction)>,
    /// Manifest documents whose derived records must be pruned.
    pub prune: BTreeSet<String>,
}

impl RunPlan {
    pub fn duplicates(&self) -> Vec<DuplicateDocument> {
        self.actions
            .iter()
            .filter_map(|(name, action)| match action {
                DocumentAction::Duplicate { of } => Some(DuplicateDocument {
                    document: name.clone(),
                    duplicate_of: of.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Plans one run.
///
/// For each content hash a single document owns the candidate: the one already
/// recorded with that hash in the manifest, else the first in sorted order.
/// Other holders of that hash are duplicates; if they had a manifest entry it is pruned.
/// Manifest documents missing from `documents` are pruned. `unreadable` names are
/// left alone so their entries survive until they can be read again.
pub fn plan_run(manifest: &Manifest, documents: &[SourceDocument], unreadable: &[String]) -> RunPlan {
    let mut owners: HashMap<&str, &str> = HashMap::new();
    for doc in documents {
        if let Some(entry) = manifest.documents.get(&doc.name) {
            if entry.content_hash == doc.content_hash {
                owners.insert(doc.content_hash.as_str(), doc.name.as_str());
            }
        }
    }
    for doc in documents {
        owners
            .entry(doc.content_hash.as_str())
            .or_insert(doc.name.as_str());
    }

    let mut plan = RunPlan::default();
    for doc in documents {
        let owner = owners
            .get(doc.content_hash.as_str())
            .copied()
            .unwrap_or(doc.name.as_str());
        let previous = manifest.documents.get(&doc.name);

        let action = if owner != doc.name {
            if previous.is_some() {
                plan.prune.insert(doc.name.clone());
            }
            DocumentAction::Duplicate {
                of: owner.to_string(),
            }
        } else {
            match previous {
                Some(entry) if entry.content_hash == doc.content_hash => DocumentAction::Unchanged,
                Some(entry) => DocumentAction::Changed {
                    candidate_id: entry.candidate_id.clone(),
                },
                None => DocumentAction::New,
            }
        };
        plan.actions.push((doc.name.clone(), action));
    }

    let present: BTreeSet<&str> = documents
        .iter()
        .map(|d| d.name.as_str())
        .chain(unreadable.iter().map(String::as_str))
        .collect();
    for name in manifest.documents.keys() {
        if !present.contains(name.as_str()) {
            plan.prune.insert(name.clone());
        }
    }
    plan
}

/// Candidate id for newly ingested content: `cand_` plus a hash prefix, lengthened
/// (then suffixed) until it does not collide with `taken`.
pub fn allocate_candidate_id(content_hash: &str, taken: impl Fn(&str) -> bool) -> String {
    for len in [16, 24, 32, content_hash.len()] {
        let end = len.min(content_hash.len());
        let id = format!("cand_{}", &content_hash[..end]);
        if !taken(&id) {
            return id;
        }
    }
    let mut n = 2;
    loop {
        let id = format!("cand_{content_hash}_{n}");
        if !taken(&id) {
            return id;
        }
        n += 1;
    }
}
