//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::relay::DriveRelay;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    relay: DriveRelay,
}

impl AppState {
    pub fn new(config: Config, relay: DriveRelay) -> Self {
        Self {
            inner: Arc::new(AppStateInner { config, relay }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the upstream Drive client
    pub fn relay(&self) -> &DriveRelay {
        &self.inner.relay
    }
}
