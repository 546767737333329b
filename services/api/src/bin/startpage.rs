//! services/api/src/bin/startpage.rs

use startpage_api::{
    adapters::spawn_session_sweeper,
    config::{Config, StorageBackend},
    error::ApiError,
    web::{build_router, state::AppState},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Adapters & Build the Shared AppState ---
    let bind_address = config.bind_address;
    let sweep_interval = config.session_sweep_interval;
    let storage = config.storage.clone();
    let app_state = Arc::new(AppState::from_config(config)?);

    // Loading once up front creates or repairs the document before the first request.
    app_state.documents.load().await?;
    info!("Navigation document ready.");

    // --- 3. Start Background Tasks ---
    let shutdown = CancellationToken::new();
    let sweeper = (storage == StorageBackend::Filesystem).then(|| {
        spawn_session_sweeper(app_state.sessions.clone(), sweep_interval, shutdown.clone())
    });

    // --- 4. Create the Web Router ---
    let app = build_router(app_state)?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", bind_address);
    info!("Swagger UI available at http://{}/swagger-ui", bind_address);
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    let signal = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutdown signal received.");
            signal.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Some(handle) = sweeper {
        handle.await.ok();
    }
    Ok(())
}
