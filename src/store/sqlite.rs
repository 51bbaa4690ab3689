//! SQLite-backed snapshot store, one row per tab

use super::{Snapshot, SnapshotStore, StoreResult};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS tab_snapshots (
    tab_id TEXT PRIMARY KEY,
    snapshot TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
";

/// Snapshot store keyed by tab id.
///
/// Reopening the same tab id is a reload; [`SnapshotStore::discard`] is
/// the tab closing.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    tab_id: String,
}

impl SqliteStore {
    /// Open or create the store at the given path
    pub fn open<P: AsRef<Path>>(path: P, tab_id: impl Into<String>) -> StoreResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::init(Connection::open(path)?, tab_id.into())
    }

    /// Open an in-memory store (for testing)
    pub fn open_in_memory(tab_id: impl Into<String>) -> StoreResult<Self> {
        Self::init(Connection::open_in_memory()?, tab_id.into())
    }

    fn init(conn: Connection, tab_id: String) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tab_id,
        })
    }

    /// Another tab sharing the same database
    pub fn for_tab(&self, tab_id: impl Into<String>) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            tab_id: tab_id.into(),
        }
    }

    pub fn tab_id(&self) -> &str {
        &self.tab_id
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotStore for SqliteStore {
    fn save(&self, snapshot: &Snapshot) -> StoreResult<()> {
        let raw = serde_json::to_string(snapshot)?;
        self.conn().execute(
            "INSERT INTO tab_snapshots (tab_id, snapshot, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(tab_id) DO UPDATE SET snapshot = excluded.snapshot, updated_at = excluded.updated_at",
            params![self.tab_id, raw, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn load(&self) -> StoreResult<Option<Snapshot>> {
        let raw: Option<String> = self
            .conn()
            .query_row(
                "SELECT snapshot FROM tab_snapshots WHERE tab_id = ?1",
                params![self.tab_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    fn discard(&self) -> StoreResult<()> {
        self.conn().execute(
            "DELETE FROM tab_snapshots WHERE tab_id = ?1",
            params![self.tab_id],
        )?;
        Ok(())
    }
}
