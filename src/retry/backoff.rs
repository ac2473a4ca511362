//! Exponential backoff schedule and jitter sources

use crate::retry::policy::RetryPolicy;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;
use std::time::Duration;

/// Jitter never exceeds this fraction of the base delay
pub const JITTER_FACTOR: f64 = 0.1;

/// Doubling schedule of base delays, capped at the policy maximum
///
/// The cap applies to the base before any jitter, so the sequence for
/// `1s`/`10s` is `1s, 2s, 4s, 8s, 10s, 10s, ...`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            next: policy.initial_backoff.min(policy.max_backoff),
            max: policy.max_backoff,
        }
    }

    /// Base delay for the upcoming retry
    pub fn next_base(&mut self) -> Duration {
        let base = self.next;
        self.next = base.saturating_mul(2).min(self.max);
        base
    }

    /// Actual wait for a base delay and a jitter draw
    pub fn wait_for(&self, base: Duration, jitter: Duration) -> Duration {
        base.saturating_add(jitter).min(self.max)
    }
}

/// Source of additive jitter in `[0, JITTER_FACTOR * base]`
pub trait Jitter: Send + Sync {
    fn sample(&self, base: Duration) -> Duration;
}

fn scaled(base: Duration, unit: f64) -> Duration {
    base.mul_f64(JITTER_FACTOR * unit.clamp(0.0, 1.0))
}

/// Jitter drawn from the thread-local RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self, base: Duration) -> Duration {
        scaled(base, rand::thread_rng().gen_range(0.0..=1.0))
    }
}

/// Reproducible jitter from a fixed seed
#[derive(Debug)]
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self, base: Duration) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        scaled(base, rng.gen_range(0.0..=1.0))
    }
}

/// No jitter; waits equal the base delays
#[derive(Debug, Clone, Copy, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn sample(&self, _base: Duration) -> Duration {
        Duration::ZERO
    }
}
