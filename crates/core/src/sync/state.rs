//! Persistence of mirror list and refresh timestamps.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{MirrorList, SyncError};

const MIRROR_LIST_UPDATED_AT: &str = "mirror_list_updated_at";
const CATALOG_UPDATED_AT: &str = "catalog_updated_at";

/// Trait for sync state storage.
pub trait SyncStateStore: Send + Sync {
    /// The stored mirror list, if one was ever saved.
    fn mirror_list(&self) -> Result<Option<MirrorList>, SyncError>;

    /// Replace the stored mirror list.
    fn save_mirror_list(&self, list: &MirrorList) -> Result<(), SyncError>;

    /// When the catalog was last imported successfully.
    fn catalog_updated_at(&self) -> Result<Option<DateTime<Utc>>, SyncError>;

    fn set_catalog_updated_at(&self, at: DateTime<Utc>) -> Result<(), SyncError>;
}

/// SQLite-backed sync state.
pub struct SqliteSyncStateStore {
    conn: Mutex<Connection>,
}

impl SqliteSyncStateStore {
    pub fn new(path: &Path) -> Result<Self, SyncError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, SyncError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), SyncError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS mirrors (
                position INTEGER PRIMARY KEY,
                url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sync_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SyncError> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Internal("sync state lock poisoned".to_string()))
    }

    fn timestamp(conn: &Connection, key: &str) -> Result<Option<DateTime<Utc>>, SyncError> {
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM sync_meta WHERE key = ?",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        value
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| SyncError::State(format!("invalid timestamp for {key}: {e}")))
            })
            .transpose()
    }

    fn set_timestamp(conn: &Connection, key: &str, at: DateTime<Utc>) -> Result<(), SyncError> {
        conn.execute(
            "INSERT INTO sync_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, at.to_rfc3339()],
        )?;
        Ok(())
    }
}

impl SyncStateStore for SqliteSyncStateStore {
    fn mirror_list(&self) -> Result<Option<MirrorList>, SyncError> {
        let conn = self.conn()?;

        let Some(updated_at) = Self::timestamp(&conn, MIRROR_LIST_UPDATED_AT)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT url FROM mirrors ORDER BY position")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut urls = Vec::new();
        for row in rows {
            urls.push(row?);
        }

        Ok(Some(MirrorList { urls, updated_at }))
    }

    fn save_mirror_list(&self, list: &MirrorList) -> Result<(), SyncError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM mirrors", [])?;
        {
            let mut stmt = tx.prepare("INSERT INTO mirrors (position, url) VALUES (?1, ?2)")?;
            for (position, url) in list.urls.iter().enumerate() {
                stmt.execute(params![position as i64, url])?;
            }
        }
        Self::set_timestamp(&tx, MIRROR_LIST_UPDATED_AT, list.updated_at)?;

        tx.commit()?;
        Ok(())
    }

    fn catalog_updated_at(&self) -> Result<Option<DateTime<Utc>>, SyncError> {
        let conn = self.conn()?;
        Self::timestamp(&conn, CATALOG_UPDATED_AT)
    }

    fn set_catalog_updated_at(&self, at: DateTime<Utc>) -> Result<(), SyncError> {
        let conn = self.conn()?;
        Self::set_timestamp(&conn, CATALOG_UPDATED_AT, at)
    }
}
