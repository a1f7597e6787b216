//! Per-session screening archive.
//!
//! Layout: `{root}/{session_id}/{timestamp}_{result_id}.json`, one immutable file per run.
//! File names sort chronologically.

use std::path::PathBuf;

use uuid::Uuid;

use super::atomic::{read_json, write_json_atomic, StorageError};
use crate::models::ScreeningResult;

#[derive(Debug, Clone)]
pub struct ScreeningHistory {
    root: PathBuf,
}

impl ScreeningHistory {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn session_dir(&self, session_id: Uuid) -> PathBuf {
        self.root.join(session_id.to_string())
    }

    pub async fn append(
        &self,
        session_id: Uuid,
        result: &ScreeningResult,
    ) -> Result<(), StorageError> {
        let file_name = format!(
            "{}_{}.json",
            result.created_at.format("%Y%m%dT%H%M%S%.6fZ"),
            result.id
        );
        write_json_atomic(&self.session_dir(session_id).join(file_name), result).await
    }

    /// All archived runs for a session, oldest first.
    pub async fn list(&self, session_id: Uuid) -> Result<Vec<ScreeningResult>, StorageError> {
        let dir = self.session_dir(session_id);
        let mut reader = match tokio::fs::read_dir(&dir).await {
            Ok(reader) => reader,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StorageError::Io { path: dir, source }),
        };

        let mut paths = Vec::new();
        loop {
            match reader.next_entry().await {
                Ok(Some(entry)) => {
                    let path = entry.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        paths.push(path);
                    }
                }
                Ok(None) => break,
                Err(source) => {
                    return Err(StorageError::Io {
                        path: dir.clone(),
                        source,
                    })
                }
            }
        }
        paths.sort();

        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(result) = read_json::<ScreeningResult>(&path).await? {
                results.push(result);
            }
        }
        Ok(results)
    }

    /// Removes every archived run for a session.
    pub async fn purge(&self, session_id: Uuid) -> Result<(), StorageError> {
        let dir = self.session_dir(session_id);
        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Io { path: dir, source }),
        }
    }
}
