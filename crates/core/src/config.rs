use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr};

#[serde_as]
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct LoggingConfig {
    #[serde_as(as = "DisplayFromStr")]
    pub max_level: tracing::Level,

    /// Also show logs from the http client stack.
    #[serde(default)]
    pub include_http: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            max_level: tracing::Level::INFO,
            include_http: Default::default(),
        }
    }
}

/// Bounded polling policy used while waiting on the chain.
///
/// The delay before attempt `n` (zero based) is
/// `backoff_unit_ms * backoff_factor^n`, capped at `max_backoff_ms`. Polling
/// stops after `max_retries` attempts or once `timeout_ms` has elapsed,
/// whichever comes first.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub backoff_unit_ms: u64,
    pub backoff_factor: u32,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 20,
            backoff_unit_ms: 250,
            backoff_factor: 2,
            max_backoff_ms: 2_000,
            timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// A policy that never sleeps; handy for tests and fakes.
    pub fn immediate(max_retries: usize) -> Self {
        Self {
            max_retries,
            backoff_unit_ms: 0,
            backoff_factor: 1,
            max_backoff_ms: 0,
            timeout_ms: u64::MAX,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_for(&self, attempt: usize) -> Duration {
        let exp = u32::try_from(attempt).unwrap_or(u32::MAX);
        let factor = u64::from(self.backoff_factor).saturating_pow(exp);
        let delay = self.backoff_unit_ms.saturating_mul(factor);

        Duration::from_millis(delay.min(self.max_backoff_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_until_capped() {
        let retries = RetryConfig::default();

        assert_eq!(retries.backoff_for(0), Duration::from_millis(250));
        assert_eq!(retries.backoff_for(1), Duration::from_millis(500));
        assert_eq!(retries.backoff_for(2), Duration::from_millis(1_000));
        assert_eq!(retries.backoff_for(3), Duration::from_millis(2_000));
        assert_eq!(retries.backoff_for(40), Duration::from_millis(2_000));
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        let retries = RetryConfig::immediate(3);
        assert_eq!(retries.backoff_for(10), Duration::ZERO);
    }
}
