//! Shared application state for Axum routers.

use std::sync::Arc;

use crate::config::ServerConfig;
use vigil_storage::Storage;

/// Application-wide state shared across all routes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(store: Arc<dyn Storage>, config: ServerConfig) -> Self {
        Self { store, config }
    }
}
