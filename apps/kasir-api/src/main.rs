//! # Kasir API server
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Kasir API Server                               │
//! │                                                                         │
//! │  Browser ───► HTTP/JSON (8080) ───► axum handlers ───► SQLite (WAL)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::HeaderValue;
use kasir_api::{build_router, ApiConfig, AppState};
use kasir_db::{Database, DbConfig};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,kasir=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Kasir API server...");

    // Load configuration
    let config = ApiConfig::load()?;
    info!(
        port = config.http_port,
        db_path = %config.database_path,
        "Configuration loaded"
    );
    if config.uses_dev_secret() {
        warn!("JWT_SECRET not set, using the development secret");
    }

    // Open database (runs migrations)
    let db = Database::new(
        DbConfig::new(config.database_path.as_str()).max_connections(config.database_max_connections),
    )
    .await
    .context("failed to open database")?;
    info!("Database ready");

    let cors = match config.cors_origin.as_deref() {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .with_context(|| format!("invalid KASIR_CORS_ORIGIN: {origin}"))?,
            )
            .allow_methods(Any)
            .allow_headers(Any),
        None => CorsLayer::permissive(),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    let state = AppState::new(db, config);
    let app = build_router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
