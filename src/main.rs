//! JSON key-value store server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kv_cache::api::create_router;
use kv_cache::{AccessPolicy, AppState, CacheLayer, CacheOptions, Config, SqliteStore};

/// Main entry point for the key-value server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Open the SQLite store and preload it into the cache
/// 4. Create Axum router with the gateway
/// 5. Serve until SIGINT/SIGTERM, then flush pending writes
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kv_cache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting key-value server");

    let config = Config::from_env().context("loading configuration")?;
    info!(
        "Configuration loaded: port={}, database={}, origin_suffix={}, max_body_bytes={}, cache_max_entries={:?}",
        config.server_port,
        config.database_path.display(),
        config.allowed_origin_suffix,
        config.max_body_bytes,
        config.cache_max_entries
    );

    let store = SqliteStore::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path.display()))?;
    let cache = Arc::new(
        CacheLayer::open(
            Arc::new(store),
            CacheOptions {
                max_entries: config.cache_max_entries,
            },
        )
        .await
        .context("preloading cache")?,
    );

    let state = AppState::new(Arc::clone(&cache), AccessPolicy::from_config(&config));
    let app = create_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    info!("Flushing pending writes");
    cache.shutdown().await;
    let stats = cache.stats().await;
    info!(
        "Server shutdown complete: entries={}, hits={}, misses={}, persisted={}, persist_failures={}",
        stats.total_entries, stats.hits, stats.misses, stats.persisted, stats.persist_failures
    );
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
