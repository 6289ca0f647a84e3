//! Cache Module
//!
//! In-memory view of the key space, kept coherent with the durable store.

mod entry;
mod layer;
mod lru;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use layer::{CacheLayer, CacheOptions};
pub use lru::LruTracker;
pub use stats::{CacheStats, StatsSnapshot};
pub use store::CacheStore;
