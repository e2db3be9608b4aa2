//! Application state shared across handlers

use std::sync::Arc;

use crate::config::Config;
use crate::store::PositionStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Sole owner of the persisted sample collection
    pub store: Arc<PositionStore>,
    /// Startup configuration, read-only after parse
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: PositionStore, config: Config) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
        }
    }
}
