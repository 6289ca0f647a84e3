//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the server.
//!
//! # Tasks
//! - Write-behind: persists accepted writes to the durable store in order

mod persist;

pub use persist::{spawn_persist_task, PersistJob, WriteBehind};
