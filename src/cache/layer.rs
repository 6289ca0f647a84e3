//! Cache Layer Module
//!
//! Read-through, write-behind cache in front of a [`DurableStore`].
//!
//! Reads are answered from memory; a miss consults the durable store once and
//! caches a hit. Writes update memory immediately and are persisted by the
//! write-behind worker without the caller waiting.

use std::sync::Arc;

use axum::body::Bytes;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::cache::{CacheStats, CacheStore, StatsSnapshot};
use crate::error::StorageError;
use crate::storage::DurableStore;
use crate::tasks::{spawn_persist_task, WriteBehind};

/// Tuning for [`CacheLayer`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheOptions {
    /// Bound on cached entries; `None` keeps every key in memory.
    ///
    /// A bound costs read throughput: every hit takes the write lock to
    /// record recency, so reads no longer run concurrently, and the recency
    /// update is linear in the number of cached entries.
    pub max_entries: Option<usize>,
}

// == Cache Layer ==
pub struct CacheLayer {
    cache: Arc<RwLock<CacheStore>>,
    /// Only a bounded cache tracks recency, which needs the write lock on reads
    bounded: bool,
    durable: Arc<dyn DurableStore>,
    stats: Arc<CacheStats>,
    writer: WriteBehind,
}

impl CacheLayer {
    // == Open ==
    /// Preloads every durable record into memory, then starts the
    /// write-behind worker. Must be called from within a tokio runtime.
    pub async fn open(
        durable: Arc<dyn DurableStore>,
        options: CacheOptions,
    ) -> Result<Self, StorageError> {
        let backend = Arc::clone(&durable);
        let records = tokio::task::spawn_blocking(move || backend.load_all())
            .await
            .map_err(|err| StorageError::Task(err.to_string()))??;

        let stats = Arc::new(CacheStats::new());
        let mut store = CacheStore::new(options.max_entries);
        let total = records.len();
        for (key, value) in records {
            let (_, evicted) = store.populate(key, value);
            stats.record_evictions(evicted);
        }
        info!(
            "Preloaded {} records into cache ({} resident)",
            total,
            store.len()
        );

        let cache = Arc::new(RwLock::new(store));
        let writer = spawn_persist_task(Arc::clone(&cache), Arc::clone(&durable), Arc::clone(&stats));

        Ok(Self {
            cache,
            bounded: options.max_entries.is_some(),
            durable,
            stats,
            writer,
        })
    }

    // == Get ==
    /// Returns the value for `key`, or `None` if it was never written.
    pub async fn get(&self, key: &str) -> Result<Option<Bytes>, StorageError> {
        if let Some(value) = self.cached(key).await {
            self.stats.record_hit();
            return Ok(Some(value));
        }
        self.stats.record_miss();

        // The lock is not held across the durable lookup.
        let backend = Arc::clone(&self.durable);
        let owned_key = key.to_string();
        let found = tokio::task::spawn_blocking(move || backend.get(&owned_key))
            .await
            .map_err(|err| StorageError::Task(err.to_string()))??;

        let Some(value) = found else {
            return Ok(None);
        };
        self.stats.record_read_through();

        let (value, evicted) = self.cache.write().await.populate(key.to_string(), value);
        self.record_evictions(evicted);
        Ok(Some(value))
    }

    async fn cached(&self, key: &str) -> Option<Bytes> {
        if self.bounded {
            self.cache.write().await.get(key)
        } else {
            self.cache.read().await.peek(key)
        }
    }

    // == Set ==
    /// Replaces the value for `key`. Visible to every `get` once this returns;
    /// persistence happens afterwards.
    pub async fn set(&self, key: String, value: Bytes) -> Result<(), StorageError> {
        let mut cache = self.cache.write().await;
        // Queued under the write lock so persistence order matches update order.
        self.writer.enqueue(key.clone(), value.clone())?;
        let evicted = cache.write(key, value);
        drop(cache);

        self.record_evictions(evicted);
        Ok(())
    }

    fn record_evictions(&self, evicted: usize) {
        if evicted > 0 {
            self.stats.record_evictions(evicted);
            debug!("Evicted {} cache entries", evicted);
        }
    }

    // == Stats ==
    pub async fn stats(&self) -> StatsSnapshot {
        let total = self.cache.read().await.len();
        self.stats.snapshot(total)
    }

    // == Shutdown ==
    /// Stops accepting writes and flushes every queued write to the durable store.
    pub async fn shutdown(&self) {
        self.writer.close().await;
    }
}
