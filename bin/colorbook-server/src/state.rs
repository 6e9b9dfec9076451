//! Shared state handed to every request handler.

use std::sync::Arc;

use crate::config::Config;
use crate::provider::ProviderClient;

/// Application state, shared across handlers via `State<Arc<AppState>>`.
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub provider: ProviderClient,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let provider = ProviderClient::new(&config.provider_base_url, &config.provider_api_key)
            .model(&config.provider_model)
            .quality(&config.provider_quality);
        Self {
            config: Arc::new(config),
            provider,
        }
    }
}
