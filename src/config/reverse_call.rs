use std::time::Duration;

use backon::ExponentialBuilder;
use serde::Deserialize;

/// Reverse-call connection configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReverseCallConfig {
    /// How often the runtime is asked to ping; silence for twice this long drops the connection.
    pub ping_interval_ms: u64,
    /// Delay between reconnect attempts.
    pub backoff: BackoffConfig,
}

impl Default for ReverseCallConfig {
    fn default() -> Self {
        Self {
            ping_interval_ms: 5_000,
            backoff: BackoffConfig::default(),
        }
    }
}

impl ReverseCallConfig {
    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }
}

/// Exponential reconnect backoff. Reconnecting never gives up.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: 100,
            max_delay_ms: 30_000,
            jitter: true,
        }
    }
}

impl BackoffConfig {
    pub fn builder(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.min_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_max_times(usize::MAX);
        if self.jitter {
            builder.with_jitter()
        } else {
            builder
        }
    }
}
