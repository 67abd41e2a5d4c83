use scorecard_core::{Config, MatchProcessingService, SanitizedConfig};
use tokio_util::sync::CancellationToken;

/// Shared application state
pub struct AppState {
    config: Config,
    service: MatchProcessingService,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        service: MatchProcessingService,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            config,
            service,
            shutdown,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn service(&self) -> &MatchProcessingService {
        &self.service
    }

    /// Cancelled when the server begins shutting down; submissions run on
    /// child tokens.
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
