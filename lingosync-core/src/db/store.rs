//! Key/value snapshot store

use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Durable key/value storage for serialized state
pub trait SnapshotStore {
    /// Blob stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Store `blob` under `key`, replacing any previous value
    fn save(&self, key: &str, blob: &str) -> Result<()>;
}

/// SQLite-backed [`SnapshotStore`]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create the database file
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;

        tracing::debug!(path = %path.display(), "Opened snapshot store");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run migrations on this database
    pub fn migrate(&self) -> Result<()> {
        super::schema::run_migrations(&self.connection())
    }

    fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Remove a stored blob. Returns true if something was deleted.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let removed = self
            .connection()
            .execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }
}

impl SnapshotStore for SqliteStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let blob = self
            .connection()
            .query_row(
                "SELECT value FROM snapshots WHERE key = ?1",
                params![key],
                |r| r.get(0),
            )
            .optional()?;
        Ok(blob)
    }

    fn save(&self, key: &str, blob: &str) -> Result<()> {
        self.connection().execute(
            r#"
            INSERT INTO snapshots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, blob, Utc::now().to_rfc3339()],
        )?;
        tracing::debug!(key, bytes = blob.len(), "Saved snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store.migrate().unwrap();
        store
    }

    #[test]
    fn test_load_missing_key() {
        assert_eq!(store().load("nothing").unwrap(), None);
    }

    #[test]
    fn test_save_overwrites() {
        let store = store();
        store.save("state", "{\"v\":1}").unwrap();
        store.save("state", "{\"v\":2}").unwrap();
        assert_eq!(store.load("state").unwrap().as_deref(), Some("{\"v\":2}"));

        assert!(store.delete("state").unwrap());
        assert!(!store.delete("state").unwrap());
        assert_eq!(store.load("state").unwrap(), None);
    }

    #[test]
    fn test_file_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.migrate().unwrap();
            store.save("state", "blob").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        store.migrate().unwrap();
        assert_eq!(store.load("state").unwrap().as_deref(), Some("blob"));
    }
}
