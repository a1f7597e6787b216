//! Session store: durable, isolated CRUD over conversation sessions.
//!
//! Layout under the data directory:
//! - `sessions/index.json`: list of `SessionSummary`
//! - `sessions/{id}.json`: one `Session` record
//! - `screenings/{id}/`: screening archive (see `history`)
//!
//! Mutations require a `SessionLease`. At most one lease per session id exists at a
//! time; a second request fails fast with `Conflict`. Leases for different sessions
//! never contend, and the index lock is only held for the index rewrite itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as SyncMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

use super::atomic::{read_json, remove_if_exists, write_json_atomic, StorageError};
use super::history::ScreeningHistory;
use crate::errors::AppError;
use crate::models::{ScreeningResult, Session, SessionPatch, SessionSummary};

type LeaseTable = Arc<SyncMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

/// Exclusive right to mutate one session. Released on drop.
pub struct SessionLease {
    id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    table: LeaseTable,
}

impl SessionLease {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        self.guard.take();
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table still holds the mutex: nobody is waiting on this session.
        if table.get(&self.id).is_some_and(|m| Arc::strong_count(m) == 1) {
            table.remove(&self.id);
        }
    }
}

pub struct SessionStore {
    sessions_dir: PathBuf,
    history: ScreeningHistory,
    locks: LeaseTable,
    index_lock: Mutex<()>,
}

impl SessionStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            sessions_dir: data_dir.join("sessions"),
            history: ScreeningHistory::new(data_dir.join("screenings")),
            locks: LeaseTable::default(),
            index_lock: Mutex::new(()),
        }
    }

    fn record_path(&self, id: Uuid) -> PathBuf {
        self.sessions_dir.join(format!("{id}.json"))
    }

    fn index_path(&self) -> PathBuf {
        self.sessions_dir.join("index.json")
    }

    /// Acquires the session's lease without waiting.
    pub async fn lease(&self, id: Uuid) -> Result<SessionLease, AppError> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(id).or_default().clone()
        };
        let guard = lock.try_lock_owned().map_err(|_| {
            AppError::Conflict(format!(
                "Session {id} is being updated by another request; retry shortly"
            ))
        })?;
        Ok(SessionLease {
            id,
            guard: Some(guard),
            table: self.locks.clone(),
        })
    }

    pub async fn create(&self) -> Result<Session, AppError> {
        let session = Session::new();
        write_json_atomic(&self.record_path(session.id), &session).await?;
        self.upsert_index(session.summary()).await?;
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub async fn get(&self, id: Uuid) -> Result<Session, AppError> {
        read_json::<Session>(&self.record_path(id))
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Applies `patch` to the leased session and persists it.
    /// A new screening result is archived once the session record is written.
    pub async fn update(
        &self,
        lease: &SessionLease,
        patch: SessionPatch,
    ) -> Result<Session, AppError> {
        let mut session = self.get(lease.id).await?;
        if patch.is_empty() {
            return Ok(session);
        }

        let archive = matches!(patch.screening_result, Some(Some(_)));
        patch.apply(&mut session);
        write_json_atomic(&self.record_path(session.id), &session).await?;
        if let Some(result) = session.screening_result.as_ref().filter(|_| archive) {
            self.history.append(lease.id, result).await?;
        }
        self.upsert_index(session.summary()).await?;
        debug!(session_id = %session.id, messages = session.messages.len(), "Session updated");
        Ok(session)
    }

    /// Removes the session record, its screening archive and its index entry.
    /// Absent sessions report `NotFound`.
    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let lease = self.lease(id).await?;

        let removed_record = remove_if_exists(&self.record_path(id)).await?;
        self.history.purge(id).await?;
        let removed_entry = self.remove_from_index(id).await?;

        drop(lease);

        if !removed_record && !removed_entry {
            return Err(AppError::NotFound(format!("Session {id} not found")));
        }
        info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Session summaries, most recently updated first, optionally filtered by id prefix.
    pub async fn list(&self, prefix: Option<&str>) -> Result<Vec<SessionSummary>, AppError> {
        let mut index = self.read_index().await?;
        if let Some(prefix) = prefix.map(str::trim).filter(|p| !p.is_empty()) {
            let prefix = prefix.to_lowercase();
            index.retain(|s| s.id.to_string().starts_with(&prefix));
        }
        index.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));
        Ok(index)
    }

    pub async fn screenings(&self, id: Uuid) -> Result<Vec<ScreeningResult>, AppError> {
        self.get(id).await?;
        Ok(self.history.list(id).await?)
    }

    async fn read_index(&self) -> Result<Vec<SessionSummary>, StorageError> {
        Ok(read_json(&self.index_path()).await?.unwrap_or_default())
    }

    async fn upsert_index(&self, summary: SessionSummary) -> Result<(), StorageError> {
        let _guard = self.index_lock.lock().await;
        let mut index = self.read_index().await?;
        match index.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary,
            None => index.push(summary),
        }
        write_json_atomic(&self.index_path(), &index).await
    }

    async fn remove_from_index(&self, id: Uuid) -> Result<bool, StorageError> {
        let _guard = self.index_lock.lock().await;
        let mut index = self.read_index().await?;
        let before = index.len();
        index.retain(|s| s.id != id);
        if index.len() == before {
            return Ok(false);
        }
        write_json_atomic(&self.index_path(), &index).await?;
        Ok(true)
    }
}
