//! JSON key-value store over HTTP
//!
//! An in-memory cache answers reads and absorbs writes; a SQLite table is the
//! durable copy, kept up to date by a write-behind worker.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod storage;
pub mod tasks;
pub mod validation;

pub use api::{AccessPolicy, AppState};
pub use cache::{CacheLayer, CacheOptions};
pub use config::Config;
pub use storage::{DurableStore, MemoryStore, SqliteStore};
