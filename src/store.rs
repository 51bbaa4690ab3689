//! Tab-scoped snapshot persistence
//!
//! A synchronous write-through mirror of the session: identifiers, mode and
//! the message log. The processing flag and UI lockouts are never stored.

mod sqlite;

pub use sqlite::SqliteStore;

use crate::state_machine::{Message, Mode};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("Storage directory error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persisted shape: `{sessionId, threadId, mode, messages: [{role, content}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Snapshot {
    /// Whether this snapshot describes a usable session and thread.
    ///
    /// Older clients could write a snapshot before a session existed; those
    /// are ignored rather than restored.
    pub fn is_restorable(&self) -> bool {
        let present = |id: &Option<String>| id.as_deref().is_some_and(|s| !s.trim().is_empty());
        present(&self.session_id) && present(&self.thread_id) && self.mode != Mode::Uninitialized
    }
}

/// Storage for the session snapshot of one tab
pub trait SnapshotStore: Send + Sync {
    /// Replace the stored snapshot
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()>;

    /// The last saved snapshot, if any
    fn load(&self) -> StoreResult<Option<Snapshot>>;

    /// Drop the snapshot (the tab is closing)
    fn discard(&self) -> StoreResult<()>;
}

impl<T: SnapshotStore + ?Sized> SnapshotStore for Arc<T> {
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        (**self).save(snapshot)
    }

    fn load(&self) -> StoreResult<Option<Snapshot>> {
        (**self).load()
    }

    fn discard(&self) -> StoreResult<()> {
        (**self).discard()
    }
}

/// Process-local store holding the serialized snapshot
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with raw JSON, as another client version may have left it
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(raw.into())),
        }
    }

    /// The raw serialized snapshot
    pub fn raw(&self) -> Option<String> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<Snapshot>> {
        self.raw()
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(StoreError::from)
    }

    fn discard(&self) -> StoreResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
