use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::JobStore;
use crate::services::{
    auth::IdentityResolver, fetch::ImageFetcher, provider::TryOnProvider, storage::ObjectStore,
};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn JobStore>,
    pub storage: Arc<dyn ObjectStore>,
    pub provider: Arc<dyn TryOnProvider>,
    pub fetcher: Arc<dyn ImageFetcher>,
    pub identity: Arc<dyn IdentityResolver>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: impl JobStore + 'static,
        storage: impl ObjectStore + 'static,
        provider: impl TryOnProvider + 'static,
        fetcher: impl ImageFetcher + 'static,
        identity: impl IdentityResolver + 'static,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            storage: Arc::new(storage),
            provider: Arc::new(provider),
            fetcher: Arc::new(fetcher),
            identity: Arc::new(identity),
        }
    }
}
