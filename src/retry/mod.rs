//! # Retry Executor
//!
//! Runs outbound calls under a bounded retry budget with exponential backoff
//! and additive jitter, so concurrent callers hitting the same transient
//! failure do not retry in lockstep.
//!
//! ## Behaviour
//!
//! - Success returns immediately; no further attempts or waits
//! - Errors the classifier rejects return at once as `NonRetryable`
//! - Retryable errors are retried until `max_attempts`, then `Exhausted`
//! - Base delays double from `initial_backoff`, capped at `max_backoff`;
//!   jitter adds up to 10% of the base and the wait never exceeds the cap
//! - Cancelling the token during a wait aborts with `Cancelled`
//!
//! ## Example
//!
//! ```rust
//! use deepseek_relay::retry::{is_retryable, CallError, RetryExecutor, RetryPolicy};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(2))?;
//! let executor = RetryExecutor::new(policy)?;
//! let cancel = CancellationToken::new();
//!
//! let answer = executor
//!     .execute(&cancel, is_retryable, || async { Ok::<_, CallError>(42) })
//!     .await?;
//! assert_eq!(answer, 42);
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
pub mod executor;
pub mod policy;

pub use backoff::{Backoff, Jitter, NoJitter, RandomJitter, SeededJitter, JITTER_FACTOR};
pub use classify::{is_retryable, message_suggests_transient, CallError, CallErrorKind};
pub use executor::{RetryAttempt, RetryError, RetryExecutor};
pub use policy::RetryPolicy;
