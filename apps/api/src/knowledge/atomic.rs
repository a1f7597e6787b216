//! Atomic JSON file operations.
//!
//! Every write goes to a temporary file in the target directory, is fsynced, then
//! renamed over the destination, so a crash never leaves a half-written record.
//! A failed write is retried once before surfacing `StorageError`.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage task failed: {0}")]
    Task(String),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serializes `value` as pretty JSON bytes (trailing newline included).
pub fn to_json_bytes<T: Serialize>(path: &Path, value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Atomically writes `value` as JSON to `path`, creating parent directories.
pub async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let bytes = to_json_bytes(path, value)?;
    write_bytes_atomic(path, bytes).await
}

/// Like `write_json_atomic`, but skips the write when the file already holds identical bytes.
/// Returns whether a write happened.
pub async fn write_json_if_changed<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<bool, StorageError> {
    let bytes = to_json_bytes(path, value)?;
    match tokio::fs::read(path).await {
        Ok(existing) if existing == bytes => return Ok(false),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StorageError::io(path, e)),
    }
    write_bytes_atomic(path, bytes).await?;
    Ok(true)
}

pub async fn write_bytes_atomic(path: &Path, bytes: Vec<u8>) -> Result<(), StorageError> {
    let target = path.to_path_buf();
    tokio::task::spawn_blocking(move || match persist(&target, &bytes) {
        Ok(()) => Ok(()),
        Err(first) => {
            warn!("Atomic write to {} failed ({first}), retrying once", target.display());
            persist(&target, &bytes)
        }
    })
    .await
    .map_err(|e| StorageError::Task(e.to_string()))?
}

fn persist(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| StorageError::io(dir, e))?;
    tmp.write_all(bytes).map_err(|e| StorageError::io(path, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| StorageError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::io(path, e.error))?;
    Ok(())
}

/// Reads and deserializes `path`. A missing or blank file yields `None`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StorageError::Json {
            path: path.to_path_buf(),
            source,
        })
}

/// Removes `path`. Returns whether a file was removed.
pub async fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[tokio::test]
    async fn test_write_then_read_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/record.json");
        let record = Record {
            name: "a".into(),
            count: 2,
        };

        write_json_atomic(&path, &record).await.unwrap();
        let loaded: Option<Record> = read_json(&path).await.unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn test_read_missing_is_none() {
        let dir = TempDir::new().unwrap();
        let loaded: Option<Record> = read_json(&dir.path().join("absent.json")).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_read_malformed_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let result: Result<Option<Record>, _> = read_json(&path).await;
        assert!(matches!(result, Err(StorageError::Json { .. })));
    }

    #[tokio::test]
    async fn test_write_if_changed_skips_identical_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        let record = Record {
            name: "x".into(),
            count: 1,
        };
        assert!(write_json_if_changed(&path, &record).await.unwrap());
        assert!(!write_json_if_changed(&path, &record).await.unwrap());
    }

    #[tokio::test]
    async fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        write_json_atomic(&path, &vec![1, 2, 3]).await.unwrap();
        write_json_atomic(&path, &vec![4]).await.unwrap();

        let mut entries = std::fs::read_dir(dir.path()).unwrap();
        assert_eq!(entries.next().unwrap().unwrap().file_name(), "r.json");
        assert!(entries.next().is_none());
    }

    #[tokio::test]
    async fn test_remove_if_exists_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("r.json");
        write_json_atomic(&path, &1).await.unwrap();
        assert!(remove_if_exists(&path).await.unwrap());
        assert!(!remove_if_exists(&path).await.unwrap());
    }
}
