//! Retry limits and backoff bounds

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How many times to run an operation and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,

    /// Base delay before the first retry
    pub initial_backoff: Duration,

    /// Upper bound on any single wait, jitter included
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            // First attempt plus two retries
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Build a validated policy
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Result<Self> {
        let policy = Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Policy that runs the operation exactly once
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Validate the policy bounds
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(RelayError::ConfigError(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        if self.initial_backoff.is_zero() {
            return Err(RelayError::ConfigError(
                "initial_backoff must be greater than zero".to_string(),
            ));
        }

        if self.max_backoff < self.initial_backoff {
            return Err(RelayError::ConfigError(format!(
                "max_backoff ({:?}) must not be less than initial_backoff ({:?})",
                self.max_backoff, self.initial_backoff
            )));
        }

        Ok(())
    }
}
