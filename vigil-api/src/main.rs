//! Vigil API server entry point
//!
//! Bootstraps configuration and tracing, builds the in-memory store and
//! the Axum router, and serves until interrupted.

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vigil_api::{create_router, AppState, ServerConfig};
use vigil_storage::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone())),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(store, config.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "starting vigil API server");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    Ok(())
}
