use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, app};
use klinik_core::refresh::watch_queue_board;
use klinik_core::{ClinicServices, config};

/// Main entry point for the Klinik application
///
/// Opens the configured storage backend, seeds the medicine catalog when it is empty, keeps a
/// background queue board projection current and serves the REST API until Ctrl-C.
///
/// # Environment Variables
/// - `KLINIK_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `KLINIK_BACKEND`: `relational` (default) or `tree`
/// - `KLINIK_DB_PATH` / `KLINIK_DATA_DIR`: storage locations
/// - `KLINIK_MINUTES_PER_SLOT`, `KLINIK_POLL_SECS`: queue timing and refresh polling
/// - `KLINIK_ADMIN_USERNAME` / `KLINIK_ADMIN_PASSWORD`: admin credentials
///
/// # Returns
/// * `Ok(())` - If the server starts and shuts down cleanly
/// * `Err(anyhow::Error)` - If configuration, storage or server startup fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("klinik=info".parse()?)
                .add_directive("klinik_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("KLINIK_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = Arc::new(config::from_process_env()?);
    let services = ClinicServices::open(cfg)?;
    services.catalog.seed_default_catalog()?;

    tracing::info!(
        backend = services.store().backend_name(),
        "++ Starting Klinik REST on {}",
        rest_addr
    );

    // Logs board changes so operators can see the queue move without a browser.
    let (mut board, watcher) = watch_queue_board(services.views.clone())?;
    let board_log = tokio::spawn(async move {
        while board.changed().await.is_ok() {
            let summary = board.borrow_and_update().summary;
            tracing::info!(
                waiting = summary.waiting,
                being_examined = summary.being_examined,
                next_wait = summary.next_wait,
                "queue board updated"
            );
        }
    });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app(AppState::new(services)))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
        })
        .await?;

    watcher.abort();
    board_log.abort();
    tracing::info!("-- Klinik stopped");

    Ok(())
}
