//! Configuration Module
//!
//! Handles loading and managing server configuration from environment variables.

use std::env;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Default cap on a write request body (1 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Server configuration parameters.
///
/// Everything except the write password has a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port
    pub server_port: u16,
    /// Shared secret expected verbatim in the `Authorization` header of writes
    pub password: String,
    /// `Origin` suffix that receives permissive cross-origin headers
    pub allowed_origin_suffix: String,
    /// Location of the SQLite database file
    pub database_path: PathBuf,
    /// Maximum accepted write body size in bytes
    pub max_body_bytes: usize,
    /// Optional bound on cached entries; `None` keeps every key in memory
    pub cache_max_entries: Option<usize>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `PORT` - HTTP server port (default: 8080)
    /// - `PASSWORD` - Write password (required)
    /// - `ALLOWED_ORIGIN_SUFFIX` - CORS origin suffix (default: noxchat.in)
    /// - `DATABASE_PATH` - SQLite file (default: data.db)
    /// - `MAX_BODY_BYTES` - Write body cap (default: 1048576)
    /// - `CACHE_MAX_ENTRIES` - Cache bound, 0 or unset for unbounded
    pub fn from_env() -> Result<Self, ConfigError> {
        let password = env::var("PASSWORD").unwrap_or_default();
        if password.is_empty() {
            return Err(ConfigError::MissingPassword);
        }

        let defaults = Self::default();
        Ok(Self {
            server_port: parse_var("PORT").unwrap_or(defaults.server_port),
            password,
            allowed_origin_suffix: env::var("ALLOWED_ORIGIN_SUFFIX")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or(defaults.allowed_origin_suffix),
            database_path: env::var("DATABASE_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            max_body_bytes: parse_var("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            cache_max_entries: parse_var::<usize>("CACHE_MAX_ENTRIES").filter(|n| *n > 0),
        })
    }

    /// Returns a copy of this config using the given password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_port: 8080,
            password: "changeme".to_string(),
            allowed_origin_suffix: "noxchat.in".to_string(),
            database_path: PathBuf::from("data.db"),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cache_max_entries: None,
        }
    }
}
