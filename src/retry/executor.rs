//! Retry executor with jittered exponential backoff

use crate::error::Result;
use crate::retry::backoff::{Backoff, Jitter, RandomJitter};
use crate::retry::policy::RetryPolicy;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Why the executor gave up
#[derive(Error, Debug)]
pub enum RetryError<E> {
    /// The cancellation token fired during a backoff wait
    #[error("operation cancelled during backoff after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },

    /// Every attempt failed with a retryable error
    #[error("operation failed after {attempts} attempt(s): {source}")]
    Exhausted { attempts: u32, source: E },

    /// The classifier rejected the error
    #[error("non-retryable error on attempt {attempt}: {source}")]
    NonRetryable { attempt: u32, source: E },
}

impl<E> RetryError<E> {
    /// Number of times the operation ran
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Cancelled { attempts } | RetryError::Exhausted { attempts, .. } => {
                *attempts
            }
            RetryError::NonRetryable { attempt, .. } => *attempt,
        }
    }

    /// The last operation error, if the executor did not stop on cancellation
    pub fn into_source(self) -> Option<E> {
        match self {
            RetryError::Cancelled { .. } => None,
            RetryError::Exhausted { source, .. } | RetryError::NonRetryable { source, .. } => {
                Some(source)
            }
        }
    }
}

/// A failed attempt that is about to be retried
#[derive(Debug)]
pub struct RetryAttempt<'a, E> {
    /// The attempt that just failed, starting at 1
    pub attempt: u32,
    pub max_attempts: u32,
    /// Delay before jitter
    pub base_delay: Duration,
    /// Delay that will actually be waited
    pub delay: Duration,
    pub error: &'a E,
}

/// Runs fallible async operations under a [`RetryPolicy`]
///
/// The executor itself never logs. Callers that want attempt diagnostics
/// pass an observer to [`RetryExecutor::execute_observed`].
#[derive(Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
    jitter: Arc<dyn Jitter>,
}

impl std::fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl RetryExecutor {
    /// Create an executor with random jitter
    pub fn new(policy: RetryPolicy) -> Result<Self> {
        Self::with_jitter(policy, Arc::new(RandomJitter))
    }

    /// Create an executor with an injected jitter source
    pub fn with_jitter(policy: RetryPolicy, jitter: Arc<dyn Jitter>) -> Result<Self> {
        policy.validate()?;
        Ok(Self { policy, jitter })
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run `operation` until it succeeds, fails for good, or `cancel` fires
    /// during a wait
    pub async fn execute<T, E, Op, Fut, C>(
        &self,
        cancel: &CancellationToken,
        classifier: C,
        operation: Op,
    ) -> std::result::Result<T, RetryError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        C: Fn(&E) -> bool,
    {
        self.execute_observed(cancel, classifier, operation, |_| {})
            .await
    }

    /// Like [`execute`](Self::execute), reporting each retry to `observer`
    /// before its wait begins
    pub async fn execute_observed<T, E, Op, Fut, C, Obs>(
        &self,
        cancel: &CancellationToken,
        classifier: C,
        mut operation: Op,
        mut observer: Obs,
    ) -> std::result::Result<T, RetryError<E>>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        C: Fn(&E) -> bool,
        Obs: FnMut(&RetryAttempt<'_, E>),
    {
        let max_attempts = self.policy.max_attempts;
        let mut backoff = Backoff::new(&self.policy);
        let mut attempt = 1;

        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !classifier(&error) {
                return Err(RetryError::NonRetryable {
                    attempt,
                    source: error,
                });
            }

            if attempt >= max_attempts {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    source: error,
                });
            }

            let base_delay = backoff.next_base();
            let delay = backoff.wait_for(base_delay, self.jitter.sample(base_delay));

            observer(&RetryAttempt {
                attempt,
                max_attempts,
                base_delay,
                delay,
                error: &error,
            });

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(RetryError::Cancelled { attempts: attempt });
                }
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::backoff::{NoJitter, SeededJitter};
    use crate::retry::classify::{is_retryable, CallError, CallErrorKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn executor(max_attempts: u32, initial: u64, max: u64) -> RetryExecutor {
        let policy = RetryPolicy::new(
            max_attempts,
            Duration::from_secs(initial),
            Duration::from_secs(max),
        )
        .unwrap();
        RetryExecutor::with_jitter(policy, Arc::new(NoJitter)).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_short_circuits() {
        let executor = executor(5, 1, 10);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let started = Instant::now();
        let result = executor
            .execute(&cancel, is_retryable, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CallError>("done")
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_with_doubling_delays() {
        let executor = executor(5, 1, 10);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let mut bases = Vec::new();

        let started = Instant::now();
        let result: std::result::Result<(), _> = executor
            .execute_observed(
                &cancel,
                is_retryable,
                move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(CallError::timeout("request timed out"))
                },
                |attempt| bases.push(attempt.base_delay.as_secs()),
            )
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 5, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(bases, vec![1, 2, 4, 8]);
        assert_eq!(started.elapsed(), Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_runs_once() {
        let executor = executor(5, 1, 10);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let started = Instant::now();
        let result: std::result::Result<(), _> = executor
            .execute(&cancel, is_retryable, move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(CallError::new(CallErrorKind::Auth, "invalid api key"))
            })
            .await;

        match result {
            Err(RetryError::NonRetryable { attempt, source }) => {
                assert_eq!(attempt, 1);
                assert_eq!(source.kind, CallErrorKind::Auth);
            }
            other => panic!("expected NonRetryable, got {:?}", other),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let executor = executor(4, 1, 10);
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);
        let calls = &calls;

        let result = executor
            .execute(&cancel, is_retryable, move || async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(CallError::unknown("connection reset by peer"))
                } else {
                    Ok(n)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait() {
        let executor = executor(3, 30, 60);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let started = Instant::now();
        let result: std::result::Result<(), _> = executor
            .execute(&cancel, is_retryable, || async {
                Err(CallError::timeout("request timed out"))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Cancelled { attempts: 1 })));
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(500));
        assert!(waited < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jittered_wait_is_capped() {
        let policy = RetryPolicy::new(3, Duration::from_secs(10), Duration::from_secs(10)).unwrap();
        let executor = RetryExecutor::with_jitter(policy, Arc::new(SeededJitter::new(1))).unwrap();
        let cancel = CancellationToken::new();
        let mut delays = Vec::new();

        let _: std::result::Result<(), _> = executor
            .execute_observed(
                &cancel,
                |_: &CallError| true,
                || async { Err(CallError::unknown("boom")) },
                |attempt| delays.push(attempt.delay),
            )
            .await;

        assert_eq!(delays, vec![Duration::from_secs(10), Duration::from_secs(10)]);
    }

    #[test]
    fn test_retry_error_accessors() {
        let exhausted = RetryError::Exhausted {
            attempts: 4,
            source: CallError::timeout("slow"),
        };
        assert_eq!(exhausted.attempts(), 4);
        assert!(exhausted.into_source().is_some());

        let cancelled: RetryError<CallError> = RetryError::Cancelled { attempts: 2 };
        assert_eq!(cancelled.attempts(), 2);
        assert!(cancelled.into_source().is_none());
    }
}
