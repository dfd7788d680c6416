//! Backoff builders.
//!
//! Uses `backon` for exponential backoff with jitter.

use backon::ExponentialBuilder;

use crate::config::{BackoffConfig, ConflictRetryConfig};

/// Standard backoff for commands that lost an optimistic concurrency race.
///
/// - Min delay: 10ms
/// - Max delay: 2s
/// - Max attempts: 10
/// - Jitter enabled
pub fn conflict_backoff() -> ExponentialBuilder {
    ConflictRetryConfig::default().builder()
}

/// Standard backoff between event processor reconnects. Never exhausted.
///
/// - Min delay: 100ms
/// - Max delay: 30s
/// - Jitter enabled
pub fn reconnect_backoff() -> ExponentialBuilder {
    BackoffConfig::default().builder()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use backon::BackoffBuilder;

    use super::*;

    #[test]
    fn test_conflict_backoff_is_bounded() {
        let delays: Vec<Duration> = conflict_backoff().build().collect();
        assert_eq!(delays.len(), 10);
        assert!(delays.iter().all(|delay| *delay <= Duration::from_secs(4)));
    }

    #[test]
    fn test_reconnect_backoff_keeps_going() {
        assert_eq!(reconnect_backoff().build().take(100).count(), 100);
    }
}
