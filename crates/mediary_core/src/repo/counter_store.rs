//! Counter store contract with SQLite and in-memory implementations.
//!
//! # Responsibility
//! - Provide atomic single-key get/set over 64-bit integer preferences.
//! - Provide compare-and-set so read-modify-write cycles can detect
//!   concurrent writers, including the co-resident Flutter application.
//!
//! # Invariants
//! - `get` distinguishes an absent key (`Ok(None)`) from a failure (`Err`).
//! - Values are stored verbatim; range policy belongs to the service layer.

use crate::db::{open_db, open_db_in_memory, DbError};
use parking_lot::{Mutex, RwLock};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by a counter store backend.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    /// Failure reported by a non-SQLite backend, such as a host adapter.
    Backend(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Backend(message) => write!(f, "store backend failure: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Backend(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value access used by the counter sync service.
pub trait CounterStore: Send + Sync {
    /// Reads the raw value stored under `key`.
    fn get(&self, key: &str) -> StoreResult<Option<i64>>;

    /// Writes `value` under `key` unconditionally.
    fn set(&self, key: &str, value: i64) -> StoreResult<()>;

    /// Writes `value` only when the stored value still equals `expected`.
    ///
    /// `expected = None` means the key must still be absent. Returns whether
    /// the write happened.
    fn compare_and_set(&self, key: &str, expected: Option<i64>, value: i64) -> StoreResult<bool>;
}

/// SQLite-backed store emulating the shared preferences file.
pub struct SqliteCounterStore {
    conn: Mutex<Connection>,
}

impl SqliteCounterStore {
    /// Opens (and migrates) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    /// Opens a private in-memory store.
    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps an already migrated connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl CounterStore for SqliteCounterStore {
    fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM shared_preferences WHERE key = ?1;",
                [key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: i64) -> StoreResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO shared_preferences (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: Option<i64>, value: i64) -> StoreResult<bool> {
        let conn = self.conn.lock();
        let changed = match expected {
            None => conn.execute(
                "INSERT INTO shared_preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO NOTHING;",
                params![key, value],
            )?,
            Some(current) => conn.execute(
                "UPDATE shared_preferences
                 SET
                    value = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE key = ?1 AND value = ?3;",
                params![key, value, current],
            )?,
        };
        Ok(changed == 1)
    }
}

/// Process-local store for hosts without a preferences file.
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    values: RwLock<HashMap<String, i64>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CounterStore for MemoryCounterStore {
    fn get(&self, key: &str) -> StoreResult<Option<i64>> {
        Ok(self.values.read().get(key).copied())
    }

    fn set(&self, key: &str, value: i64) -> StoreResult<()> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: Option<i64>, value: i64) -> StoreResult<bool> {
        let mut values = self.values.write();
        if values.get(key).copied() != expected {
            return Ok(false);
        }
        values.insert(key.to_string(), value);
        Ok(true)
    }
}
