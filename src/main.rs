use cec_alerts::config::AppConfig;
use cec_alerts::engine::{now_ms, AlertEngine};
use cec_alerts::http::{self, AppState};
use cec_alerts::sessions::SessionTracker;
use cec_alerts::storage::{self, SnapshotStore};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load config
    let config = AppConfig::load()?;

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(&config.log_level)
        .init();

    info!("Starting Civil Emergency Connect alert service...");

    let store = Arc::new(SnapshotStore::new(config.data_file.clone()));
    let (alerts, next_id) = storage::load_or_fresh(&store);

    let sessions = Arc::new(SessionTracker::new(config.session_ttl_secs as i64 * 1000));
    let engine = AlertEngine::with_snapshot(sessions.clone(), alerts, next_id);

    let state = Arc::new(AppState {
        engine,
        sessions,
        store: store.clone(),
        started_at: now_ms(),
    });

    // Periodic GC of stale tracking-window keys. Memory bound only.
    let sweeper = state.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(60));
        loop {
            tick.tick().await;
            sweeper.engine.sweep_windows();
        }
    });

    let app = http::router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP ready on http://{addr} (LAN-shareable, offline capable)");
    info!(
        "Endpoints: GET/POST/DELETE /api/alerts, POST /api/vouch/:id, GET /api/status, GET /admin/export, GET /admin/json"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // Final snapshot on the way out; tracking windows are not persisted.
    let (alerts, next_id) = state.engine.persistable();
    if let Err(e) = store.save(&alerts, next_id) {
        error!("DISK ERROR on shutdown: {e}");
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received, saving snapshot...");
}
