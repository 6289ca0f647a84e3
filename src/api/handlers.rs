//! API Handlers
//!
//! The gateway state machine: every request that is not `/ui` lands here.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
};
use http_body_util::LengthLimitError;
use percent_encoding::percent_decode_str;
use serde::de::IgnoredAny;

use crate::cache::CacheLayer;
use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::validation::is_valid_key;

/// Access rules applied before anything reaches the cache.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    /// Expected verbatim in the `Authorization` header of writes
    pub password: String,
    /// Origins ending with this receive cross-origin headers
    pub allowed_origin_suffix: String,
    pub max_body_bytes: usize,
}

impl AccessPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            password: config.password.clone(),
            allowed_origin_suffix: config.allowed_origin_suffix.clone(),
            max_body_bytes: config.max_body_bytes,
        }
    }

    /// Plain string comparison against the shared secret.
    pub fn is_authorized(&self, credential: Option<&[u8]>) -> bool {
        credential.unwrap_or_default() == self.password.as_bytes()
    }

    pub fn origin_allowed(&self, origin: &str) -> bool {
        origin.ends_with(&self.allowed_origin_suffix)
    }
}

/// Application state shared across all handlers.
///
/// Built once at startup and handed to the router; nothing is global.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheLayer>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(cache: Arc<CacheLayer>, policy: AccessPolicy) -> Self {
        Self {
            cache,
            policy: Arc::new(policy),
        }
    }
}

/// Answers a pre-flight. Origin headers are added by the origin policy.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Fallback handler implementing the read/write contract.
///
/// Order matters: pre-flight, then key presence, then the method. The key is
/// the percent-decoded path without its leading `/`, so `/a%2Eb` addresses
/// `a.b`; invalid UTF-8 decodes lossily and then fails key validation.
pub async fn handle_request(State(state): State<AppState>, request: Request) -> Result<Response> {
    if request.method() == Method::OPTIONS {
        return Ok(preflight().await.into_response());
    }

    let key = request_key(request.uri().path());
    if key.is_empty() {
        return Err(ApiError::KeyRequired);
    }

    let method = request.method().clone();
    if method == Method::GET {
        get_value(&state, &key).await
    } else if method == Method::POST {
        set_value(&state, key, request).await
    } else {
        Err(ApiError::MethodNotAllowed)
    }
}

fn request_key(path: &str) -> String {
    let raw = path.strip_prefix('/').unwrap_or(path);
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

async fn get_value(state: &AppState, key: &str) -> Result<Response> {
    let value = state.cache.get(key).await?.ok_or(ApiError::NotFound)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], value).into_response())
}

async fn set_value(state: &AppState, key: String, request: Request) -> Result<Response> {
    if !is_valid_key(&key) {
        return Err(ApiError::InvalidKey);
    }

    let credential = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|value| value.as_bytes());
    if !state.policy.is_authorized(credential) {
        return Err(ApiError::Unauthorized);
    }

    let body = read_body(request, state.policy.max_body_bytes).await?;

    // Validated only; the stored bytes are the request body as sent.
    serde_json::from_slice::<IgnoredAny>(&body).map_err(|_| ApiError::InvalidJson)?;

    state.cache.set(key, body).await?;
    Ok(StatusCode::OK.into_response())
}

/// Buffers at most `limit` bytes; anything larger is refused mid-stream.
async fn read_body(request: Request, limit: usize) -> Result<Bytes> {
    axum::body::to_bytes(request.into_body(), limit)
        .await
        .map_err(|err| {
            if exceeds_limit(&err) {
                ApiError::PayloadTooLarge
            } else {
                ApiError::InvalidJson
            }
        })
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(current) = source {
        if current.is::<LengthLimitError>() {
            return true;
        }
        source = current.source();
    }
    false
}
