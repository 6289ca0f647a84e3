//! Durable Storage Module
//!
//! The persistent key-value table behind the cache. Backends are reached only
//! through [`DurableStore`], so any store with point lookup and upsert fits.

mod memory;
mod sqlite;

use axum::body::Bytes;

use crate::error::StorageError;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

// == Durable Store Trait ==
/// Blocking interface to a durable key-value table.
///
/// Calls may block on I/O; async callers go through `spawn_blocking`.
pub trait DurableStore: Send + Sync + 'static {
    /// Point lookup. An absent key is `Ok(None)`, not an error.
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError>;

    /// Insert or overwrite the value stored under `key`.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Full scan of every stored record, used to warm the cache.
    fn load_all(&self) -> Result<Vec<(String, Bytes)>, StorageError>;
}
