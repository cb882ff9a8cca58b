//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development and debugging when only the HTTP surface (with OpenAPI/Swagger UI)
//! is wanted. The workspace's main `klinik-run` binary also seeds the catalog and keeps a
//! background queue board watcher running.

use api_rest::{app, AppState};
use klinik_core::{config, ClinicServices};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Klinik REST API server.
///
/// # Environment Variables
/// - `KLINIK_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `KLINIK_BACKEND`, `KLINIK_DB_PATH`, `KLINIK_DATA_DIR`: storage selection
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the configuration or the storage backend cannot be loaded,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("klinik_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("KLINIK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config::from_process_env()?);
    let services = ClinicServices::open(cfg)?;

    tracing::info!("-- Starting Klinik REST API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(AppState::new(services))).await?;

    Ok(())
}
