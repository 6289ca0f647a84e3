//! Cache Store Module
//!
//! The in-memory map mirroring the durable store, with optional LRU bounding.

use std::collections::HashMap;

use axum::body::Bytes;

use crate::cache::{CacheEntry, LruTracker};

// == Cache Store ==
/// Key-value map owned by the cache layer.
///
/// Unbounded unless created with a capacity. A bounded store evicts the least
/// recently used entry that has no write waiting for persistence.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    /// Present only when the store is bounded
    lru: Option<LruTracker>,
    max_entries: Option<usize>,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore. `None` means the store never evicts.
    pub fn new(max_entries: Option<usize>) -> Self {
        Self {
            entries: HashMap::new(),
            lru: max_entries.map(|_| LruTracker::new()),
            max_entries,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.max_entries.is_some()
    }

    // == Peek ==
    /// Returns the cached value without touching recency.
    pub fn peek(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    // == Get ==
    /// Returns the cached value and marks the key as recently used.
    pub fn get(&mut self, key: &str) -> Option<Bytes> {
        let value = self.entries.get(key).map(|entry| entry.value.clone())?;
        if let Some(lru) = self.lru.as_mut() {
            lru.touch(key);
        }
        Some(value)
    }

    // == Entry ==
    pub fn entry(&self, key: &str) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    // == Write ==
    /// Stores an accepted write. The entry stays pending until
    /// [`CacheStore::write_settled`] is called for it.
    ///
    /// Returns the number of entries evicted to make room.
    pub fn write(&mut self, key: String, value: Bytes) -> usize {
        match self.entries.get_mut(&key) {
            Some(entry) => entry.overwrite(value),
            None => {
                self.entries.insert(key.clone(), CacheEntry::dirty(value));
            }
        }
        self.touch_and_trim(&key)
    }

    // == Populate ==
    /// Caches a value read from the durable store, unless the key is already
    /// cached; a concurrent write always wins over a read-through.
    ///
    /// Returns the value now associated with the key and the eviction count.
    pub fn populate(&mut self, key: String, value: Bytes) -> (Bytes, usize) {
        let current = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CacheEntry::clean(value))
            .value
            .clone();
        let evicted = self.touch_and_trim(&key);
        (current, evicted)
    }

    // == Write Settled ==
    /// Marks one queued write for `key` as finished, successfully or not.
    ///
    /// Returns the number of entries evicted now that the key may be dropped.
    pub fn write_settled(&mut self, key: &str) -> usize {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.write_settled();
        }
        self.trim()
    }

    fn touch_and_trim(&mut self, key: &str) -> usize {
        if let Some(lru) = self.lru.as_mut() {
            lru.touch(key);
        }
        self.trim()
    }

    // Evicts until within bounds or until only pending entries remain.
    fn trim(&mut self) -> usize {
        let (Some(max), Some(lru)) = (self.max_entries, self.lru.as_mut()) else {
            return 0;
        };

        let mut evicted = 0;
        while self.entries.len() > max {
            let entries = &self.entries;
            let victim = lru.evict_oldest_where(|k| {
                entries.get(k).map_or(true, |entry| !entry.is_pending())
            });
            match victim {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        evicted += 1;
                    }
                }
                None => break,
            }
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
