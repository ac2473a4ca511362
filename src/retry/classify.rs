//! Outbound-call errors and retry classification
//!
//! The outbound client reports failures as a [`CallError`] tagged with a
//! [`CallErrorKind`]. Classification works on the kind; the message is only
//! inspected for errors that arrive as [`CallErrorKind::Unknown`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Message fragments that mark an otherwise unclassified error as transient
const TRANSIENT_MARKERS: &[&str] = &[
    "timeout",
    "deadline",
    "timed out",
    "network",
    "connection",
    "broken pipe",
    "reset",
    "eof",
    "closed",
];

/// Structured category of an outbound-call failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallErrorKind {
    /// The call did not finish before its deadline
    Timeout,
    /// The peer reset or aborted the connection
    ConnectionReset,
    /// Other transport failure (refused, broken pipe, DNS, unexpected EOF)
    Network,
    /// Upstream asked us to slow down (HTTP 429)
    RateLimited,
    /// Upstream failed internally (HTTP 5xx)
    ServerError,
    /// Credentials rejected (HTTP 401/403)
    Auth,
    /// The request itself is malformed (HTTP 400/404/413/422)
    InvalidRequest,
    /// No structured information available
    Unknown,
}

impl CallErrorKind {
    /// Whether this kind is worth retrying, `None` when the kind alone cannot tell
    pub fn is_transient(self) -> Option<bool> {
        match self {
            CallErrorKind::Timeout
            | CallErrorKind::ConnectionReset
            | CallErrorKind::Network
            | CallErrorKind::RateLimited
            | CallErrorKind::ServerError => Some(true),
            CallErrorKind::Auth | CallErrorKind::InvalidRequest => Some(false),
            CallErrorKind::Unknown => None,
        }
    }
}

impl fmt::Display for CallErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CallErrorKind::Timeout => "timeout",
            CallErrorKind::ConnectionReset => "connection reset",
            CallErrorKind::Network => "network error",
            CallErrorKind::RateLimited => "rate limited",
            CallErrorKind::ServerError => "server error",
            CallErrorKind::Auth => "authentication failed",
            CallErrorKind::InvalidRequest => "invalid request",
            CallErrorKind::Unknown => "error",
        };
        f.write_str(label)
    }
}

/// Failure of a single outbound call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: CallErrorKind,
    pub message: String,
}

impl CallError {
    pub fn new(kind: CallErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Error without structured kind information
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Unknown, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(CallErrorKind::Timeout, message)
    }

    /// Map an HTTP status and response body to a call error
    pub fn from_status(status: u16, body: &str) -> Self {
        let kind = match status {
            401 | 403 => CallErrorKind::Auth,
            408 => CallErrorKind::Timeout,
            429 => CallErrorKind::RateLimited,
            400 | 404 | 413 | 422 => CallErrorKind::InvalidRequest,
            500..=599 => CallErrorKind::ServerError,
            _ => CallErrorKind::Unknown,
        };
        Self::new(kind, format!("HTTP {}: {}", status, body))
    }

    /// Whether a retry might succeed
    pub fn is_retryable(&self) -> bool {
        self.kind
            .is_transient()
            .unwrap_or_else(|| message_suggests_transient(&self.message))
    }
}

impl From<std::io::Error> for CallError {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind;

        let kind = match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => CallErrorKind::Timeout,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
                CallErrorKind::ConnectionReset
            }
            ErrorKind::ConnectionRefused
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::UnexpectedEof => CallErrorKind::Network,
            _ => CallErrorKind::Unknown,
        };
        Self::new(kind, err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for CallError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::timeout(err.to_string())
    }
}

/// Last-resort check for errors that carry only a message
pub fn message_suggests_transient(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Default classifier for outbound calls
pub fn is_retryable(err: &CallError) -> bool {
    err.is_retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_kinds() {
        assert!(is_retryable(&CallError::timeout("slow")));
        assert!(is_retryable(&CallError::new(CallErrorKind::ConnectionReset, "")));
        assert!(is_retryable(&CallError::new(CallErrorKind::RateLimited, "")));
        assert!(!is_retryable(&CallError::new(CallErrorKind::Auth, "bad key")));
        assert!(!is_retryable(&CallError::new(
            CallErrorKind::InvalidRequest,
            "connection field missing"
        )));
    }

    #[test]
    fn test_message_fallback() {
        assert!(is_retryable(&CallError::unknown("read tcp: connection reset by peer")));
        assert!(is_retryable(&CallError::unknown("context deadline exceeded")));
        assert!(is_retryable(&CallError::unknown("unexpected EOF")));
        assert!(!is_retryable(&CallError::unknown("invalid api key")));
        assert!(!is_retryable(&CallError::unknown("")));
    }

    #[test]
    fn test_from_status() {
        assert_eq!(CallError::from_status(401, "").kind, CallErrorKind::Auth);
        assert_eq!(CallError::from_status(403, "").kind, CallErrorKind::Auth);
        assert_eq!(CallError::from_status(408, "").kind, CallErrorKind::Timeout);
        assert_eq!(CallError::from_status(422, "").kind, CallErrorKind::InvalidRequest);
        assert_eq!(CallError::from_status(429, "").kind, CallErrorKind::RateLimited);
        assert_eq!(CallError::from_status(503, "").kind, CallErrorKind::ServerError);
        assert_eq!(CallError::from_status(302, "").kind, CallErrorKind::Unknown);

        let err = CallError::from_status(500, "upstream exploded");
        assert_eq!(err.message, "HTTP 500: upstream exploded");
    }

    #[test]
    fn test_from_io_error() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(CallError::from(reset).kind, CallErrorKind::ConnectionReset);

        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert_eq!(CallError::from(refused).kind, CallErrorKind::Network);

        let other = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = CallError::from(other);
        assert_eq!(err.kind, CallErrorKind::Unknown);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = CallError::new(CallErrorKind::Auth, "invalid key");
        assert_eq!(err.to_string(), "authentication failed: invalid key");
    }
}
