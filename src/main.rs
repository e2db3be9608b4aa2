//! satlog - satellite position telemetry logger and read API

mod config;
mod error;
mod models;
mod query;
mod routes;
mod source;
mod state;
mod store;
mod tasks;

use anyhow::Context;
use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::routes::{export, health, positions, stats};
use crate::source::PositionSource;
use crate::state::AppState;
use crate::store::PositionStore;
use crate::tasks::acquisition;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "satlog=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = PositionStore::open(&config.db_path)
        .await
        .context("failed to open position store")?;

    let source = PositionSource::new(config.upstream_url.as_str())
        .context("failed to build upstream client")?;

    // Cooperative stop signal for the acquisition loop; checked between ticks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let state = AppState::new(store, config.clone());

    let loop_store = Arc::clone(&state.store);
    let fetch_interval = Duration::from_secs(config.fetch_interval_secs);
    let retention_days = config.retention_days;
    tokio::spawn(async move {
        acquisition::acquisition_task(source, loop_store, fetch_interval, retention_days, shutdown_rx)
            .await;
    });

    // Build router
    let app = Router::new()
        .route("/health", get(health::health))
        // Read API
        .route("/api/current", get(positions::current))
        .route("/api/last3days", get(positions::preview))
        .route("/api/preview", get(positions::preview))
        .route("/api/all-records", get(positions::all_records))
        .route("/api/days-with-data", get(positions::days_with_data))
        .route("/api/stats", get(stats::stats))
        .route("/api/download-csv", get(export::download_csv))
        // Dashboard pages
        .route_service("/", ServeFile::new(config.static_dir.join("index.html")))
        .route_service(
            "/database",
            ServeFile::new(config.static_dir.join("database.html")),
        )
        // State and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    info!(
        "satlog v{} starting on {}",
        env!("CARGO_PKG_VERSION"),
        config.listen_addr
    );
    info!(
        upstream = %config.upstream_url,
        interval_secs = config.fetch_interval_secs,
        retention_days = config.retention_days,
        db = %config.db_path.display(),
        "configuration loaded"
    );

    // Start server; Ctrl-C stops the listener and flips the loop's flag
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .context("failed to bind listen address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("server error")?;

    Ok(())
}
