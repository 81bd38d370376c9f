//! Clock sources.
//!
//! The lock guarantee is only as strong as the clock: callers can never
//! supply or move the time themselves. Both implementations are monotonic
//! non-decreasing.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use lockbox_types::TimePoint;

/// Supplies the current logical time in milliseconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> TimePoint;
}

/// Wall-clock milliseconds since the UNIX epoch.
///
/// If the host clock steps backwards, the last reading is repeated until
/// the host catches up.
#[derive(Debug, Default)]
pub struct SystemClock {
    last: AtomicU64,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> TimePoint {
        // Pre-epoch host time reads as zero.
        let observed = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let previous = self.last.fetch_max(observed, Ordering::AcqRel);
        TimePoint(previous.max(observed))
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: TimePoint) -> Self {
        Self {
            now: AtomicU64::new(start.as_millis()),
        }
    }

    /// Move the clock to `t`. Ignored if `t` is earlier than the current time.
    pub fn set(&self, t: TimePoint) {
        self.now.fetch_max(t.as_millis(), Ordering::AcqRel);
    }

    /// Move the clock forward by `ms`, saturating at the end of time.
    pub fn advance(&self, ms: u64) {
        self.now
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| {
                Some(t.saturating_add(ms))
            })
            .ok();
    }
}

impl Clock for ManualClock {
    fn now(&self) -> TimePoint {
        TimePoint(self.now.load(Ordering::Acquire))
    }
}
