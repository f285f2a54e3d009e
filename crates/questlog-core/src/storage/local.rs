//! Client-side key-value storage.
//!
//! The device keeps its own copy of the progression state as a JSON value
//! under a fixed key. Nothing here knows about the server.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::progression::{ProgressionState, StatsStore};

pub const PROGRESSION_KEY: &str = "progression_state";

/// SQLite key-value store at `<data_dir>/questlog.db`.
pub struct LocalDb {
    conn: Connection,
}

impl LocalDb {
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        Self::open_at(&data_dir()?.join("questlog.db"))
    }

    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }
}

/// [`StatsStore`] over the device's kv store.
pub struct LocalStatsStore {
    db: LocalDb,
}

impl LocalStatsStore {
    pub fn new(db: LocalDb) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &LocalDb {
        &self.db
    }
}

impl StatsStore for LocalStatsStore {
    fn load(&mut self) -> Result<Option<ProgressionState>> {
        match self.db.kv_get(PROGRESSION_KEY)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, state: &ProgressionState) -> Result<()> {
        self.db.kv_set(PROGRESSION_KEY, &serde_json::to_string(state)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = LocalDb::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        db.kv_set("test", "again").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "again");
    }

    #[test]
    fn stats_store_round_trip() {
        let mut store = LocalStatsStore::new(LocalDb::open_memory().unwrap());
        assert!(store.load().unwrap().is_none());
        let state = ProgressionState {
            level: 2,
            experience: 15,
            experience_to_next_level: 69,
            ..Default::default()
        };
        store.save(&state).unwrap();
        assert_eq!(store.load().unwrap(), Some(state));
    }

    #[test]
    fn corrupt_value_surfaces_as_error() {
        let mut store = LocalStatsStore::new(LocalDb::open_memory().unwrap());
        store.db().kv_set(PROGRESSION_KEY, "{not json").unwrap();
        assert!(store.load().is_err());
    }

    #[test]
    fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questlog.db");
        {
            let mut store = LocalStatsStore::new(LocalDb::open_at(&path).unwrap());
            store
                .save(&ProgressionState {
                    coins: 42,
                    ..Default::default()
                })
                .unwrap();
        }
        let mut store = LocalStatsStore::new(LocalDb::open_at(&path).unwrap());
        assert_eq!(store.load().unwrap().unwrap().coins, 42);
    }
}
