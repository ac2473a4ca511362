//! Time sources for the cache store
//!
//! The store never calls `Utc::now()` directly. It reads time through a
//! [`Clock`] handed to it at construction, so tests can move time forward
//! without sleeping.

use chrono::{DateTime, Utc};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant as a UTC timestamp
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time that never runs backwards
///
/// The wall clock is read once at construction and every later reading is
/// that anchor plus the elapsed monotonic time, so NTP adjustments cannot
/// make an entry appear to have been created after it expired.
#[derive(Debug, Clone)]
pub struct SystemClock {
    anchor_wall: DateTime<Utc>,
    anchor_mono: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            anchor_wall: Utc::now(),
            anchor_mono: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.anchor_mono.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.anchor_wall + elapsed
    }
}

/// Manually driven clock for tests and simulations
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// Start at the given instant
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Start at the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward
    ///
    /// Steps past the representable range saturate at `DateTime::<Utc>::MAX_UTC`.
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        let next = chrono::Duration::from_std(by)
            .ok()
            .and_then(|step| current.checked_add_signed(step))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        *current = next;
    }

    /// Jump to an absolute instant
    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
