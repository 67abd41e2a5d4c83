//! Orchestrator configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::retry::RetryConfig;

/// Configuration for the submission orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound for any single call to the league site (seconds).
    /// An elapsed bound counts as a retryable timeout.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// Backoff for result submission and image upload.
    /// The league check is never retried.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_call_timeout() -> u64 {
    30
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            retry: RetryConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
