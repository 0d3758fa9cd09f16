//! Retry configuration for transient source failures.

use serde::{Deserialize, Serialize};

use crate::shared::ValidationError;

/// Configuration for the bounded retry-with-backoff applied to one query attempt.
///
/// Only failures classified as transient (connection or pool level) are retried.
/// Exhausting `max_attempts` surfaces the last failure to the caller unmodified.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Total number of attempts for one query, including the first.
    ///
    /// Default: 2 (one retry after the first failure)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum backoff duration in milliseconds after a failed attempt.
    ///
    /// Default: 1000 (1 second)
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    /// Maximum backoff duration in milliseconds after repeated failures.
    ///
    /// Default: 10000 (10 seconds)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Jitter percentage to apply to backoff durations (0-100).
    ///
    /// Default: 25
    #[serde(default = "default_jitter_percent")]
    pub jitter_percent: u8,
}

impl RetryConfig {
    /// Default attempt count: one retry after the first failure.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

    /// Default minimum backoff: 1 second.
    pub const DEFAULT_MIN_BACKOFF_MS: u64 = 1_000;

    /// Default maximum backoff: 10 seconds.
    pub const DEFAULT_MAX_BACKOFF_MS: u64 = 10_000;

    /// Default jitter percentage: 25%.
    pub const DEFAULT_JITTER_PERCENT: u8 = 25;

    /// Validates the retry configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.max_attempts == 0 {
            return Err(ValidationError::RetryConfig(
                "`max_attempts` cannot be zero".to_string(),
            ));
        }

        if self.jitter_percent > 100 {
            return Err(ValidationError::RetryConfig(
                "`jitter_percent` must be <= 100".to_string(),
            ));
        }

        if self.min_backoff_ms > self.max_backoff_ms {
            return Err(ValidationError::RetryConfig(
                "`min_backoff_ms` must be <= `max_backoff_ms`".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            min_backoff_ms: Self::DEFAULT_MIN_BACKOFF_MS,
            max_backoff_ms: Self::DEFAULT_MAX_BACKOFF_MS,
            jitter_percent: Self::DEFAULT_JITTER_PERCENT,
        }
    }
}

fn default_max_attempts() -> u32 {
    RetryConfig::DEFAULT_MAX_ATTEMPTS
}

fn default_min_backoff_ms() -> u64 {
    RetryConfig::DEFAULT_MIN_BACKOFF_MS
}

fn default_max_backoff_ms() -> u64 {
    RetryConfig::DEFAULT_MAX_BACKOFF_MS
}

fn default_jitter_percent() -> u8 {
    RetryConfig::DEFAULT_JITTER_PERCENT
}
