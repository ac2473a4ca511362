//! Cached context records

use crate::error::{RelayError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request to create a cached context
///
/// An empty `ttl` selects the configured default lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheRequest {
    /// Model ID to use
    pub model: String,

    /// System prompt, may be empty
    pub system_prompt: String,

    /// File paths to include with queries against this context
    pub file_paths: Vec<String>,

    /// Lifetime such as `"1h"` or `"10m"`
    pub ttl: String,
}

impl CacheRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_file_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_ttl(mut self, ttl: impl Into<String>) -> Self {
        self.ttl = ttl.into();
        self
    }
}

/// A cached context: model choice, system prompt and referenced files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub id: String,
    pub model: String,
    pub system_prompt: String,
    pub file_paths: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Build an entry that expires exactly `ttl` after `created_at`
    pub(crate) fn new(
        id: String,
        request: CacheRequest,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Result<Self> {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| created_at.checked_add_signed(ttl))
            .ok_or_else(|| RelayError::ConfigError(format!("TTL {:?} is too large", ttl)))?;

        Ok(Self {
            id,
            model: request.model,
            system_prompt: request.system_prompt,
            file_paths: request.file_paths,
            created_at,
            expires_at,
        })
    }

    /// The lifetime the entry was created with
    pub fn ttl(&self) -> chrono::Duration {
        self.expires_at - self.created_at
    }

    /// Whether the entry is past its expiration at `now`
    ///
    /// An entry is still valid at exactly `expires_at`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Remaining lifetime at `now`, `None` once expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Option<Duration> {
        if self.is_expired_at(now) {
            None
        } else {
            (self.expires_at - now).to_std().ok()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Duration) -> CacheEntry {
        CacheEntry::new(
            "cache-test".to_string(),
            CacheRequest::new("deepseek-chat").with_file_paths(["src/main.rs"]),
            Utc::now(),
            ttl,
        )
        .unwrap()
    }

    #[test]
    fn test_cache_entry_creation() {
        let entry = entry(Duration::from_secs(3600));

        assert_eq!(entry.id, "cache-test");
        assert_eq!(entry.model, "deepseek-chat");
        assert_eq!(entry.file_paths, vec!["src/main.rs".to_string()]);
        assert_eq!(entry.ttl(), chrono::Duration::seconds(3600));
    }

    #[test]
    fn test_expiration_boundary() {
        let entry = entry(Duration::from_secs(60));

        assert!(!entry.is_expired_at(entry.created_at));
        assert!(!entry.is_expired_at(entry.expires_at));
        assert!(entry.is_expired_at(entry.expires_at + chrono::Duration::nanoseconds(1)));
    }

    #[test]
    fn test_time_until_expiration() {
        let entry = entry(Duration::from_secs(60));

        let left = entry.time_until_expiration(entry.created_at).unwrap();
        assert_eq!(left, Duration::from_secs(60));

        let after = entry.expires_at + chrono::Duration::seconds(1);
        assert!(entry.time_until_expiration(after).is_none());
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let result = CacheEntry::new(
            "cache-test".to_string(),
            CacheRequest::new("deepseek-chat"),
            Utc::now(),
            Duration::from_secs(u64::MAX),
        );
        assert!(matches!(result, Err(RelayError::ConfigError(_))));
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: CacheRequest =
            serde_json::from_str(r#"{"model": "deepseek-chat", "ttl": "10m"}"#).unwrap();

        assert_eq!(request.model, "deepseek-chat");
        assert_eq!(request.ttl, "10m");
        assert!(request.system_prompt.is_empty());
        assert!(request.file_paths.is_empty());
    }
}
