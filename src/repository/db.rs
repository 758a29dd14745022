//! Database Connection and Setup
//!
//! Manages the SQLite connection and migrations for the slot table.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;

use super::traits::KeyValueStore;
use crate::domain::{DomainError, DomainResult};

/// Database state wrapper
#[derive(Clone)]
pub struct DbState {
    pub conn: Arc<Mutex<Option<Connection>>>,
    db_path: PathBuf,
}

impl DbState {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            db_path,
        }
    }

    /// Drop the connection; later reads and writes fail until reopened
    pub async fn close(&self) {
        let mut guard = self.conn.lock().await;
        *guard = None;
        log::info!("Database closed: {}", self.db_path.display());
    }
}

/// Open (or create) the database at `db_path`; `:memory:` gives a private in-memory db
pub async fn init_db(db_path: &Path) -> DomainResult<DbState> {
    let conn = if db_path.as_os_str() == ":memory:" {
        Connection::open_in_memory()?
    } else {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DomainError::Internal(format!("Failed to create data dir: {}", e)))?;
        }
        Connection::open(db_path)?
    };

    run_migrations(&conn)?;

    let state = DbState::new(db_path.to_path_buf());
    *state.conn.lock().await = Some(conn);
    log::info!("Database ready: {}", db_path.display());
    Ok(state)
}

/// Create the slot table if missing
fn run_migrations(conn: &Connection) -> DomainResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )?;
    Ok(())
}

/// SQLite-backed slot store
pub struct SqliteStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteStore {
    pub fn new(conn: Arc<Mutex<Option<Connection>>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn read_slot(&self, key: &str) -> DomainResult<Option<String>> {
        let guard = self.conn.lock().await;
        let conn = guard
            .as_ref()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let value = conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn write_slots(&self, entries: &[(&str, String)]) -> DomainResult<()> {
        let mut guard = self.conn.lock().await;
        let conn = guard
            .as_mut()
            .ok_or(DomainError::Internal("Database not initialized".to_string()))?;

        let tx = conn.transaction()?;
        for (key, value) in entries {
            tx.execute(
                "INSERT OR REPLACE INTO kv_store (key, value) VALUES (?, ?)",
                params![key, value],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
