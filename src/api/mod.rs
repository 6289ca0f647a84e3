//! API Module
//!
//! The request gateway: HTTP handlers, origin policy and routing.
//!
//! # Endpoints
//! - `GET /<key>` - Read a stored JSON document
//! - `POST /<key>` - Store a JSON document (requires `Authorization`)
//! - `OPTIONS *` - Cross-origin pre-flight
//! - `GET /ui` - Debug view of a single key

pub mod cors;
pub mod handlers;
pub mod routes;
pub mod ui;

pub use handlers::*;
pub use routes::create_router;
