//! In-memory durable store
//!
//! Non-persistent backend for tests and embedders. Counts calls so callers can
//! observe whether the cache actually reached the backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use axum::body::Bytes;

use super::DurableStore;
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, Bytes>>,
    reads: AtomicU64,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-filled with `records`.
    pub fn with_records<K, V>(records: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Bytes>,
    {
        let store = Self::new();
        if let Ok(mut map) = store.records.lock() {
            map.extend(records.into_iter().map(|(k, v)| (k.into(), v.into())));
        }
        store
    }

    /// Number of point lookups served so far.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Number of upserts applied so far.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Bytes>>, StorageError> {
        self.records
            .lock()
            .map_err(|_| StorageError::Task("memory store lock poisoned".to_string()))
    }
}

impl DurableStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.lock()?
            .insert(key.to_string(), Bytes::copy_from_slice(value));
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, Bytes)>, StorageError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
