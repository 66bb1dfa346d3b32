//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use study_market_core::ports::{FileStorage, MarketplaceStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub storage: Arc<dyn FileStorage>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        storage: Arc<dyn FileStorage>,
        config: Config,
    ) -> Self {
        Self {
            store,
            storage,
            config: Arc::new(config),
        }
    }

    /// Lifetime of a freshly issued download link.
    pub fn signed_url_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.config.signed_url_ttl_secs)
    }
}
