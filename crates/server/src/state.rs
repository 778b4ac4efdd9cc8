use std::sync::Arc;
use scout_core::{Config, DiscoveryService, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    discovery: Arc<DiscoveryService>,
}

impl AppState {
    pub fn new(config: Config, discovery: Arc<DiscoveryService>) -> Self {
        Self { config, discovery }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn discovery(&self) -> &DiscoveryService {
        self.discovery.as_ref()
    }
}
