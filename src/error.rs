//! Error types for the relay
//!
//! Every failure the cache store, retry executor and request handler can
//! report is a variant of [`RelayError`]. Nothing here is recovered
//! internally; callers decide how to present each condition.

use crate::retry::{CallError, RetryError};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Main error type for relay operations
#[derive(Error, Debug)]
pub enum RelayError {
    /// Malformed duration string, bad environment value or invalid policy bounds
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Model id is empty or not present in the registry
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Malformed inbound request, such as an empty query
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced file is missing, too large or of a disallowed type
    #[error("File rejected: {path}: {reason}")]
    FileRejected { path: String, reason: String },

    /// Context caching is switched off in the configuration
    #[error("Caching is disabled")]
    CachingDisabled,

    /// No cache entry exists for the id (never created or already reaped)
    #[error("Cache not found: {id}")]
    NotFound { id: String },

    /// The cache entry existed but its time-to-live has elapsed
    #[error("Cache {id} expired at {expired_at}")]
    Expired {
        id: String,
        expired_at: DateTime<Utc>,
    },

    /// The caller cancelled while the executor was waiting between attempts
    #[error("Operation cancelled during backoff after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    /// Every retryable attempt failed
    #[error("Operation failed after {attempts} attempt(s): {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: CallError,
    },

    /// The classifier rejected the failure, so no retry was attempted
    #[error("Non-retryable error: {source}")]
    NonRetryable {
        #[source]
        source: CallError,
    },

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl RelayError {
    /// True for the two cache lookup failures
    pub fn is_cache_miss(&self) -> bool {
        matches!(self, RelayError::NotFound { .. } | RelayError::Expired { .. })
    }
}

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;

impl From<RetryError<CallError>> for RelayError {
    fn from(err: RetryError<CallError>) -> Self {
        match err {
            RetryError::Cancelled { attempts } => RelayError::Cancelled { attempts },
            RetryError::Exhausted { attempts, source } => {
                RelayError::Exhausted { attempts, source }
            }
            RetryError::NonRetryable { source, .. } => RelayError::NonRetryable { source },
        }
    }
}

impl From<String> for RelayError {
    fn from(s: String) -> Self {
        RelayError::Other(s)
    }
}

impl From<&str> for RelayError {
    fn from(s: &str) -> Self {
        RelayError::Other(s.to_string())
    }
}
