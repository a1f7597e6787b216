//! Ingestion run: keeps the candidate corpus consistent with the resume directory.
//!
//! Unchanged documents cost nothing. New or changed documents are extracted, embedded
//! and upserted under a stable candidate id. Removed documents are pruned. A document
//! that fails keeps its old manifest entry (if any) so the next run retries it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::dedup::{allocate_candidate_id, plan_run, DocumentAction, DuplicateDocument};
use super::extractor::ResumeExtractor;
use super::source::{discover, extract_text, SourceDocument};
use crate::embeddings::{truncate_for_embedding, Embedder};
use crate::errors::AppError;
use crate::knowledge::{CorpusSnapshot, CorpusStore, ManifestEntry};
use crate::models::CandidateRecord;

#[derive(Debug, Clone, Serialize)]
pub struct DocumentFailure {
    pub document: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestionReport {
    pub scanned: usize,
    pub unchanged: usize,
    pub ingested: Vec<String>,
    pub duplicates: Vec<DuplicateDocument>,
    pub removed: Vec<String>,
    pub failed: Vec<DocumentFailure>,
    pub corpus_size: usize,
    pub elapsed_ms: u64,
}

pub struct IngestionPipeline {
    source_dir: PathBuf,
    corpus: Arc<CorpusStore>,
    extractor: Arc<dyn ResumeExtractor>,
    embedder: Arc<dyn Embedder>,
    /// Single writer: runs never overlap.
    run_lock: Mutex<()>,
}

impl IngestionPipeline {
    pub fn new(
        source_dir: PathBuf,
        corpus: Arc<CorpusStore>,
        extractor: Arc<dyn ResumeExtractor>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            source_dir,
            corpus,
            extractor,
            embedder,
            run_lock: Mutex::new(()),
        }
    }

    pub async fn run(&self) -> Result<IngestionReport, AppError> {
        let _guard = self.run_lock.lock().await;
        let started = Instant::now();

        let (documents, unreadable) = discover(&self.source_dir).await.map_err(|e| {
            anyhow::anyhow!(
                "Failed to scan resume directory {}: {e}",
                self.source_dir.display()
            )
        })?;

        let mut report = IngestionReport {
            scanned: documents.len() + unreadable.len(),
            ..Default::default()
        };
        for doc in &unreadable {
            warn!(document = %doc.name, "Skipping unreadable resume: {}", doc.error);
            report.failed.push(DocumentFailure {
                document: doc.name.clone(),
                error: doc.error.clone(),
            });
        }

        let current = self.corpus.snapshot().await;
        let mut next: CorpusSnapshot = (*current).clone();
        let orphans = next.drop_orphans();
        if !orphans.is_empty() {
            warn!(?orphans, "Dropped corpus records without a manifest entry");
        }
        let unreadable_names: Vec<String> = unreadable.iter().map(|d| d.name.clone()).collect();
        let plan = plan_run(&next.manifest, &documents, &unreadable_names);

        for name in &plan.prune {
            if let Some(entry) = next.manifest.documents.remove(name) {
                next.candidates.remove(&entry.candidate_id);
                next.embeddings.remove(&entry.candidate_id);
                info!(document = %name, candidate_id = %entry.candidate_id, "Pruned candidate");
            }
            report.removed.push(name.clone());
        }
        report.duplicates = plan.duplicates();
        for dup in &report.duplicates {
            warn!(
                document = %dup.document,
                duplicate_of = %dup.duplicate_of,
                "Duplicate resume content; not ingested"
            );
        }

        for (doc, (_, action)) in documents.iter().zip(plan.actions.iter()) {
            let existing_id = match action {
                DocumentAction::Unchanged => {
                    report.unchanged += 1;
                    continue;
                }
                DocumentAction::Duplicate { .. } => continue,
                DocumentAction::New => None,
                DocumentAction::Changed { candidate_id } => Some(candidate_id.clone()),
            };

            match self.ingest_document(doc, existing_id, &next).await {
                Ok((record, embedding)) => {
                    info!(document = %doc.name, candidate_id = %record.id, "Ingested resume");
                    next.manifest.documents.insert(
                        doc.name.clone(),
                        ManifestEntry {
                            content_hash: doc.content_hash.clone(),
                            candidate_id: record.id.clone(),
                            size_bytes: doc.size_bytes(),
                            ingested_at: record.ingested_at,
                        },
                    );
                    next.embeddings.insert(record.id.clone(), embedding);
                    next.candidates.insert(record.id.clone(), record);
                    report.ingested.push(doc.name.clone());
                }
                Err(e) => {
                    warn!(document = %doc.name, "Resume ingestion failed: {e}");
                    report.failed.push(DocumentFailure {
                        document: doc.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        next.manifest.processed_at = Some(Utc::now());
        report.corpus_size = next.candidates.len();
        let outcome = self.corpus.commit(next).await?;

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            scanned = report.scanned,
            unchanged = report.unchanged,
            ingested = report.ingested.len(),
            duplicates = report.duplicates.len(),
            removed = report.removed.len(),
            failed = report.failed.len(),
            candidates_written = outcome.candidates_written,
            elapsed_ms = report.elapsed_ms,
            "Ingestion run complete"
        );
        Ok(report)
    }

    /// Extracts and embeds one document. Nothing is written here; the caller upserts.
    async fn ingest_document(
        &self,
        doc: &SourceDocument,
        existing_id: Option<String>,
        corpus: &CorpusSnapshot,
    ) -> Result<(CandidateRecord, Vec<f32>), AppError> {
        let text = extract_text(doc).await.map_err(AppError::Validation)?;
        let profile = self.extractor.extract(&doc.name, &text).await?;

        let id = existing_id.unwrap_or_else(|| {
            allocate_candidate_id(&doc.content_hash, |id| {
                corpus.candidates.contains_key(id)
                    || corpus.manifest.documents.values().any(|e| e.candidate_id == id)
            })
        });
        let record = CandidateRecord {
            id,
            file_name: doc.name.clone(),
            profile,
            content_hash: doc.content_hash.clone(),
            raw_text: text,
            ingested_at: Utc::now(),
        };

        let mut vectors = self
            .embedder
            .embed(&[truncate_for_embedding(&record.embedding_text())])
            .await?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| AppError::Upstream("Embedding service returned no vector".into()))?;
        Ok((record, embedding))
    }
}
