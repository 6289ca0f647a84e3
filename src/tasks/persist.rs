//! Write-Behind Persistence Task
//!
//! A single worker drains a queue of accepted writes into the durable store.
//! One writer means writes for a key reach the store in the order they were
//! queued.

use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::{CacheStats, CacheStore};
use crate::error::StorageError;
use crate::storage::DurableStore;

/// One accepted write waiting to be persisted.
#[derive(Debug)]
pub struct PersistJob {
    pub key: String,
    pub value: Bytes,
}

/// Handle to the running write-behind worker.
pub struct WriteBehind {
    tx: Mutex<Option<mpsc::UnboundedSender<PersistJob>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl WriteBehind {
    /// Queues a write. Never waits for the durable store.
    pub fn enqueue(&self, key: String, value: Bytes) -> Result<(), StorageError> {
        let guard = self
            .tx
            .lock()
            .map_err(|_| StorageError::Task("write-behind queue lock poisoned".to_string()))?;
        let tx = guard
            .as_ref()
            .ok_or_else(|| StorageError::Task("write-behind worker stopped".to_string()))?;
        tx.send(PersistJob { key, value })
            .map_err(|_| StorageError::Task("write-behind worker stopped".to_string()))
    }

    /// Stops accepting writes and waits until every queued write is handled.
    pub async fn close(&self) {
        // Dropping the sender ends the worker loop once the queue is empty.
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        let handle = self.handle.lock().ok().and_then(|mut h| h.take());
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("Write-behind worker ended abnormally: {}", err);
            }
        }
    }
}

/// Spawns the worker that persists queued writes one at a time.
///
/// Each outcome, success or failure, settles the pending write on the cache
/// entry so a bounded cache may evict it again. Failures are logged and
/// dropped; the cache keeps serving the accepted value.
///
/// # Arguments
/// * `cache` - The cache map whose entries track pending writes
/// * `durable` - Backend receiving the upserts
/// * `stats` - Counters for persisted and failed writes
pub fn spawn_persist_task(
    cache: Arc<RwLock<CacheStore>>,
    durable: Arc<dyn DurableStore>,
    stats: Arc<CacheStats>,
) -> WriteBehind {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistJob>();

    let handle = tokio::spawn(async move {
        info!("Write-behind worker started");

        while let Some(job) = rx.recv().await {
            let key = job.key.clone();
            let backend = Arc::clone(&durable);
            let result = tokio::task::spawn_blocking(move || backend.set(&job.key, &job.value))
                .await
                .map_err(|err| StorageError::Task(err.to_string()))
                .and_then(|inner| inner);

            match result {
                Ok(()) => {
                    stats.record_persisted();
                    debug!(key = %key, "persisted value");
                }
                Err(err) => {
                    stats.record_persist_failure();
                    error!(key = %key, error = %err, "failed to persist value, write dropped");
                }
            }

            let evicted = cache.write().await.write_settled(&key);
            if evicted > 0 {
                stats.record_evictions(evicted);
                debug!("Evicted {} cache entries", evicted);
            }
        }

        info!("Write-behind worker drained and stopped");
    });

    WriteBehind {
        tx: Mutex::new(Some(tx)),
        handle: Mutex::new(Some(handle)),
    }
}
