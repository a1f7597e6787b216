//! Shared candidate corpus: manifest, structured records and embeddings.
//!
//! This namespace is independent of sessions and never touched by session deletion.
//! Readers take an `Arc<CorpusSnapshot>` per call and hold no lock while using it.
//! The ingestion pipeline is the only writer and swaps in a new snapshot after
//! persisting it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::atomic::{read_json, write_json_if_changed, StorageError};
use crate::models::CandidateRecord;

/// What the pipeline last saw for one source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub content_hash: String,
    pub candidate_id: String,
    pub size_bytes: u64,
    pub ingested_at: DateTime<Utc>,
}

/// Source-document identity (file name) to its last ingested state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub processed_at: Option<DateTime<Utc>>,
    pub documents: BTreeMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorpusSnapshot {
    pub manifest: Manifest,
    pub candidates: BTreeMap<String, CandidateRecord>,
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

impl CorpusSnapshot {
    pub fn candidate(&self, id: &str) -> Option<&CandidateRecord> {
        self.candidates.get(id)
    }

    pub fn embedding(&self, id: &str) -> Option<&[f32]> {
        self.embeddings.get(id).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Removes candidates and embeddings that no manifest entry owns.
    /// These are left behind when a commit stops before the manifest write.
    pub fn drop_orphans(&mut self) -> Vec<String> {
        let owned: BTreeSet<&str> = self
            .manifest
            .documents
            .values()
            .map(|e| e.candidate_id.as_str())
            .collect();
        let orphans: Vec<String> = self
            .candidates
            .keys()
            .chain(self.embeddings.keys())
            .filter(|id| !owned.contains(id.as_str()))
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        for id in &orphans {
            self.candidates.remove(id);
            self.embeddings.remove(id);
        }
        orphans
    }
}

/// Files written by a commit. Unchanged files are skipped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub candidates_written: bool,
    pub embeddings_written: bool,
    pub manifest_written: bool,
}

pub struct CorpusStore {
    dir: PathBuf,
    current: RwLock<Arc<CorpusSnapshot>>,
}

impl CorpusStore {
    /// Loads the persisted corpus, or starts empty.
    pub async fn open(data_dir: &Path) -> Result<Self, StorageError> {
        let dir = data_dir.join("corpus");
        let snapshot = CorpusSnapshot {
            manifest: read_json(&dir.join("manifest.json"))
                .await?
                .unwrap_or_default(),
            candidates: read_json(&dir.join("candidates.json"))
                .await?
                .unwrap_or_default(),
            embeddings: read_json(&dir.join("embeddings.json"))
                .await?
                .unwrap_or_default(),
        };
        info!(
            candidates = snapshot.candidates.len(),
            documents = snapshot.manifest.documents.len(),
            "Candidate corpus loaded"
        );
        Ok(Self {
            dir,
            current: RwLock::new(Arc::new(snapshot)),
        })
    }

    pub async fn snapshot(&self) -> Arc<CorpusSnapshot> {
        self.current.read().await.clone()
    }

    /// Persists `next` (candidates, then embeddings, then manifest) and publishes it.
    /// The manifest goes last so an interrupted commit causes reprocessing, never duplicates.
    pub async fn commit(&self, next: CorpusSnapshot) -> Result<CommitOutcome, StorageError> {
        let outcome = CommitOutcome {
            candidates_written: write_json_if_changed(
                &self.dir.join("candidates.json"),
                &next.candidates,
            )
            .await?,
            embeddings_written: write_json_if_changed(
                &self.dir.join("embeddings.json"),
                &next.embeddings,
            )
            .await?,
            manifest_written: write_json_if_changed(
                &self.dir.join("manifest.json"),
                &next.manifest,
            )
            .await?,
        };
        debug!(?outcome, "Corpus committed");
        *self.current.write().await = Arc::new(next);
        Ok(outcome)
    }
}
