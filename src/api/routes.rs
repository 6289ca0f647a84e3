//! API Routes
//!
//! Configures the Axum router for the key-value gateway.

use axum::{middleware, routing::options, Router};
use tower_http::trace::TraceLayer;

use super::cors::origin_policy;
use super::handlers::{handle_request, preflight, AppState};
use super::ui::ui_handler;

/// Creates the main router.
///
/// Every path except `/ui` is a key, handled by the fallback. `/ui` answers
/// pre-flights like any other path and renders the page for every other
/// method. The origin policy wraps both.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ui", options(preflight).fallback(ui_handler))
        .fallback(handle_request)
        .layer(middleware::from_fn_with_state(state.clone(), origin_policy))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
