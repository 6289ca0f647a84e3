//! Error types for the key-value server
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use r2d2_sqlite::rusqlite;
use thiserror::Error;
use tracing::error;

// == Storage Error Enum ==
/// Failures of the durable store or of the tasks that drive it.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Connection pool could not hand out a connection
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// SQLite rejected a statement
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Blocking task panicked or the persistence worker is gone
    #[error("storage task failed: {0}")]
    Task(String),
}

// == Api Error Enum ==
/// Terminal outcomes of the request gateway other than success.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Key required")]
    KeyRequired,

    #[error("Invalid key format")]
    InvalidKey,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Key not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Storage failure; the detail is logged, never sent to the client
    #[error("Internal server error")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::KeyRequired | ApiError::InvalidKey | ApiError::InvalidJson => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized => StatusCode::FORBIDDEN,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Storage(err) = &self {
            error!(error = %err, "storage failure while handling request");
        }

        let mut response = (self.status(), format!("{self}\n")).into_response();
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        headers.insert(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        );
        response
    }
}

// == Config Error Enum ==
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("PASSWORD must be set")]
    MissingPassword,
}

// == Result Type Alias ==
/// Convenience Result type for the request gateway.
pub type Result<T> = std::result::Result<T, ApiError>;
