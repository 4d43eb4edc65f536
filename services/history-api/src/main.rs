//! Benchmark history API server.

use anyhow::Context;
use bench_history_core::{logging, Settings};
use bench_history_storage::{FileBackedStore, JsonFileBackend};
use history_api::{router, AppState};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let config_path = std::env::var_os("BENCH_HISTORY_CONFIG").map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref()).context("failed to load settings")?;
    logging::init(&settings.log);

    let backend = JsonFileBackend::new(&settings.store.path);
    let store = FileBackedStore::open(Box::new(backend), &settings.store.repo_url)
        .context("failed to open benchmark history")?;

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let state = Arc::new(AppState::new(store, settings));
    let app = router(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(address = %addr, store = %state.store.location(), "History API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // Persist anything a failed save left in memory only.
    if let Err(e) = state.store.flush() {
        warn!(error = %e, "Final flush failed");
    }
    info!("History API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
