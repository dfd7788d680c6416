use std::time::Duration;

use backon::ExponentialBuilder;
use serde::Deserialize;

/// Command coordinator configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CommandsConfig {
    /// How long a commit waits for event handlers before reporting the stragglers.
    pub handler_wait_timeout_ms: u64,
    pub conflict_retry: ConflictRetryConfig,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            handler_wait_timeout_ms: 5_000,
            conflict_retry: ConflictRetryConfig::default(),
        }
    }
}

impl CommandsConfig {
    pub fn handler_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_wait_timeout_ms)
    }
}

/// Backoff used by `CommandCoordinator::handle_with_retry`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConflictRetryConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_attempts: usize,
}

impl Default for ConflictRetryConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 10,
            max_delay_ms: 2_000,
            max_attempts: 10,
        }
    }
}

impl ConflictRetryConfig {
    pub fn builder(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(self.max_attempts)
            .with_jitter()
    }
}
