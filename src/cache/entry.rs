//! Cache Entry Module
//!
//! Defines the structure for individual cache entries.

use axum::body::Bytes;
use chrono::{DateTime, Utc};

// == Cache Entry ==
/// Last known value of a key plus bookkeeping for write-behind persistence.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Raw JSON document, exactly as received
    pub value: Bytes,
    /// When the value was last replaced in memory
    pub updated_at: DateTime<Utc>,
    /// Writes accepted for this key that the durable store has not confirmed yet
    pending_writes: u32,
}

impl CacheEntry {
    // == Constructors ==
    /// Entry mirroring a value that is already durable.
    pub fn clean(value: Bytes) -> Self {
        Self {
            value,
            updated_at: Utc::now(),
            pending_writes: 0,
        }
    }

    /// Entry for a freshly accepted write that still has to be persisted.
    pub fn dirty(value: Bytes) -> Self {
        Self {
            pending_writes: 1,
            ..Self::clean(value)
        }
    }

    // == Write Tracking ==
    /// Replaces the value with a new accepted write.
    pub fn overwrite(&mut self, value: Bytes) {
        self.value = value;
        self.updated_at = Utc::now();
        self.pending_writes += 1;
    }

    /// Records that one queued write reached the durable store (or failed for good).
    pub fn write_settled(&mut self) {
        self.pending_writes = self.pending_writes.saturating_sub(1);
    }

    /// True while at least one write is still queued for persistence.
    ///
    /// Such entries must stay cached: the durable copy may be stale.
    pub fn is_pending(&self) -> bool {
        self.pending_writes > 0
    }
}
