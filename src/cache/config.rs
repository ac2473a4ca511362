//! Configuration for the context cache

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the context cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// When false, every `create` fails with `CachingDisabled`
    pub enabled: bool,

    /// Lifetime applied when a request leaves the TTL empty
    pub default_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // 1 hour
            default_ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(RelayError::ConfigError(
                "default cache TTL must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    enabled: Option<bool>,
    default_ttl: Option<Duration>,
}

impl CacheConfigBuilder {
    /// Enable or disable context caching
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Set default TTL for cache entries
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            enabled: self.enabled.unwrap_or(defaults.enabled),
            default_ttl: self.default_ttl.unwrap_or(defaults.default_ttl),
        }
    }
}
