//! Deterministic clocks.

use chrono::{DateTime, Duration, Utc};
use rollcall_core::environment::Clock;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use rollcall_testing::FixedClock;
/// use rollcall_core::environment::Clock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
///
/// # Panics
///
/// This function will panic if the hardcoded timestamp fails to parse,
/// which should never happen in practice.
#[must_use]
#[allow(clippy::expect_used)]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
            .expect("hardcoded timestamp should always parse")
            .with_timezone(&Utc),
    )
}

/// Clock that moves forward by a fixed step on every reading.
///
/// Gives each write a distinct, increasing timestamp so ordering by time is
/// deterministic. Clones share the same position.
///
/// ```
/// use rollcall_testing::{SteppingClock, test_clock};
/// use rollcall_core::environment::Clock;
/// use chrono::Duration;
///
/// let clock = SteppingClock::starting_at(test_clock().now(), Duration::seconds(1));
/// let first = clock.now();
/// assert_eq!(clock.now() - first, Duration::seconds(1));
/// ```
#[derive(Debug, Clone)]
pub struct SteppingClock {
    next_millis: Arc<AtomicI64>,
    step_millis: i64,
}

impl SteppingClock {
    /// Start at `start` and advance by `step` after each reading.
    #[must_use]
    pub fn starting_at(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next_millis: Arc::new(AtomicI64::new(start.timestamp_millis())),
            step_millis: step.num_milliseconds(),
        }
    }
}

impl Default for SteppingClock {
    fn default() -> Self {
        Self::starting_at(test_clock().now(), Duration::seconds(1))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let millis = self.next_millis.fetch_add(self.step_millis, Ordering::SeqCst);
        DateTime::from_timestamp_millis(millis).unwrap_or_default()
    }
}
