//! Catbox Table - a table-store cache backend
//!
//! Serves the cache backend contract over HTTP, backed by an in-process
//! table store.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catbox_table::api::create_router;
use catbox_table::engine::MemoryEngine;
use catbox_table::{AppState, Config, Connection, ServerConfig};

/// Main entry point for the cache server.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load adapter and server configuration from environment variables
/// 3. Start the connection (schema bootstrap, expiry sweep)
/// 4. Create Axum router with all endpoints
/// 5. Serve until SIGINT/SIGTERM, then stop the connection
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "catbox_table=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Catbox Table cache server");

    let config = Config::from_env();
    let server = ServerConfig::from_env();
    info!(
        "Configuration loaded: db={}, table={}, flush_interval={}ms, port={}",
        config.db, config.table, config.flush_interval, server.port
    );

    let connection = Arc::new(
        Connection::new(config, Arc::new(MemoryEngine::new()))
            .context("invalid cache configuration")?,
    );
    connection
        .start()
        .await
        .context("failed to start cache connection")?;

    let app = create_router(AppState::new(connection.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    connection.stop();
    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
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
