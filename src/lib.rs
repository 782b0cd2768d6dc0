pub mod commands;
pub mod core;

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use crate::core::config::MirrorConfig;
use crate::core::error::{MirrorError, MirrorResult};
use crate::core::scan::spawn_schedule;
use crate::core::state::AppState;

pub async fn run() -> MirrorResult<()> {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,launcher_mirror_lib=debug")),
        )
        .init();

    tracing::info!("Launcher mirror starting...");

    let config = MirrorConfig::load()?;
    tokio::fs::create_dir_all(&config.storage_path)
        .await
        .map_err(|e| MirrorError::io(&config.storage_path, e))?;

    let state = Arc::new(AppState::new(config)?);
    state.bootstrap_index();

    let schedule = spawn_schedule(Arc::clone(&state.scanner), state.config.check_interval());

    let listener = TcpListener::bind(&state.config.bind_address)
        .await
        .map_err(|e| {
            MirrorError::Config(format!("cannot bind {}: {}", state.config.bind_address, e))
        })?;
    tracing::info!("Status API listening on {}", state.config.bind_address);

    let served = axum::serve(listener, commands::router(Arc::clone(&state)))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    schedule.abort();
    tracing::info!("Launcher mirror stopped");
    served.map_err(MirrorError::from)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
