use std::sync::Arc;

use orderflow_core::{Config, OrderStore, SlaScheduler};

/// Shared application state handed to every request handler.
pub struct AppState {
    config: Config,
    store: Arc<dyn OrderStore>,
    scheduler: Arc<SlaScheduler>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn OrderStore>, scheduler: Arc<SlaScheduler>) -> Self {
        Self {
            config,
            store,
            scheduler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn OrderStore> {
        &self.store
    }

    pub fn scheduler(&self) -> &Arc<SlaScheduler> {
        &self.scheduler
    }
}
