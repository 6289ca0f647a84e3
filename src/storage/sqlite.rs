//! SQLite-backed durable store.

use std::path::Path;

use axum::body::Bytes;
use r2d2::Pool;
use r2d2_sqlite::{
    rusqlite::{
        params,
        types::{FromSql, FromSqlError, FromSqlResult, ValueRef},
        OptionalExtension,
    },
    SqliteConnectionManager,
};
use tracing::info;

use super::DurableStore;
use crate::error::StorageError;

const POOL_SIZE: u32 = 8;

/// Raw bytes of a stored JSON value.
///
/// Values written here are BLOBs, but the column has NUMERIC affinity, so rows
/// written by other clients may come back as TEXT, or as INTEGER/REAL when the
/// text looked like a number.
struct StoredValue(Bytes);

impl FromSql for StoredValue {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let bytes = match value {
            ValueRef::Text(raw) | ValueRef::Blob(raw) => Bytes::copy_from_slice(raw),
            ValueRef::Integer(n) => Bytes::from(n.to_string()),
            ValueRef::Real(n) => serde_json::Number::from_f64(n)
                .map(|n| Bytes::from(n.to_string()))
                .ok_or(FromSqlError::InvalidType)?,
            ValueRef::Null => return Err(FromSqlError::InvalidType),
        };
        Ok(Self(bytes))
    }
}

/// Durable store keeping every record in a single `data` table.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and ensures the schema exists.
    ///
    /// Safe to call on every start; existing data is left untouched.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let manager = SqliteConnectionManager::file(path)
            .with_init(|conn| conn.execute_batch("PRAGMA busy_timeout = 5000;"));
        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;

        pool.get()?.execute_batch(
            "CREATE TABLE IF NOT EXISTS data (
                key TEXT PRIMARY KEY,
                value JSON NOT NULL
            );",
        )?;

        info!("SQLite store opened at {}", path.display());
        Ok(Self { pool })
    }
}

impl DurableStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        let value: Option<StoredValue> = self
            .pool
            .get()?
            .query_row("SELECT value FROM data WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value.map(|StoredValue(bytes)| bytes))
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.pool.get()?.execute(
            "INSERT INTO data (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, Bytes)>, StorageError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT key, value FROM data")?;
        let rows = stmt.query_map([], |row| {
            let key: String = row.get(0)?;
            let StoredValue(value) = row.get(1)?;
            Ok((key, value))
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
