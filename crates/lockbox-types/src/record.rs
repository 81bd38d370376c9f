//! # LockRecord: the per-account custody entry
//!
//! Every account has at most one record: the value held in custody and the
//! time point after which it may be retrieved.
//!
//! ## State Machine
//!
//! ```text
//!              lock                 now >= unlock_time
//!   ┌───────┐ ──────▶ ┌────────┐ ─────────────────────▶ ┌────────────┐
//!   │ EMPTY │         │ LOCKED │                         │ UNLOCKABLE │
//!   └───────┘ ◀─┐     └────────┘ ◀─────────────────────  └─────┬──────┘
//!               │       ▲    │         lock (top-up)           │
//!               │       └────┘ lock (top-up)                   │
//!               └──────────────────────────────────────────────┘
//!                                   retrieve
//! ```
//!
//! `LOCKED` and `UNLOCKABLE` share the same stored record; the state is
//! derived from the record and the current time.

use serde::{Deserialize, Serialize};

use crate::{Amount, TimePoint};

/// Externally computed eligibility of a record at a given time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockState {
    /// Nothing in custody.
    Empty,
    /// Value held and the unlock time is still in the future.
    Locked,
    /// Value held and retrievable.
    Unlockable,
}

impl std::fmt::Display for LockState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "EMPTY"),
            Self::Locked => write!(f, "LOCKED"),
            Self::Unlockable => write!(f, "UNLOCKABLE"),
        }
    }
}

/// Custody entry for a single account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Value currently held for the account.
    pub amount: Amount,
    /// Time after which `amount` becomes withdrawable. `ZERO` when empty.
    pub unlock_time: TimePoint,
}

impl LockRecord {
    /// The empty record (never locked, or fully retrieved).
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            amount: 0,
            unlock_time: TimePoint::ZERO,
        }
    }

    #[must_use]
    pub const fn new(amount: Amount, unlock_time: TimePoint) -> Self {
        Self {
            amount,
            unlock_time,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount == 0
    }

    /// Enforce `amount == 0 ⇒ unlock_time == ZERO`.
    #[must_use]
    pub fn normalized(self) -> Self {
        if self.is_empty() { Self::empty() } else { self }
    }

    /// Milliseconds until the record unlocks; zero when already unlockable
    /// or never locked.
    #[must_use]
    pub fn time_remaining(&self, now: TimePoint) -> u64 {
        self.unlock_time.saturating_millis_since(now)
    }

    /// Whether a retrieve at `now` would be allowed.
    #[must_use]
    pub fn is_unlockable(&self, now: TimePoint) -> bool {
        !self.is_empty() && now >= self.unlock_time
    }

    #[must_use]
    pub fn state(&self, now: TimePoint) -> LockState {
        if self.is_empty() {
            LockState::Empty
        } else if now >= self.unlock_time {
            LockState::Unlockable
        } else {
            LockState::Locked
        }
    }
}

/// A lock call as the caller submits it.
///
/// `amount` is the declared value; `attached_value` is what actually came
/// with the call. They must match exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRequest {
    pub amount: Amount,
    /// Requested lock duration. Signed so a negative request can be rejected
    /// instead of silently wrapping.
    pub duration_ms: i64,
    pub attached_value: Amount,
}

impl LockRequest {
    #[must_use]
    pub const fn new(amount: Amount, duration_ms: i64, attached_value: Amount) -> Self {
        Self {
            amount,
            duration_ms,
            attached_value,
        }
    }

    /// The external call shape: the declared amount is the attached value.
    #[must_use]
    pub const fn from_value(value: Amount, duration_ms: i64) -> Self {
        Self::new(value, duration_ms, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_record_defaults() {
        let rec = LockRecord::default();
        assert_eq!(rec, LockRecord::empty());
        assert!(rec.is_empty());
        assert_eq!(rec.time_remaining(TimePoint(500)), 0);
        assert_eq!(rec.state(TimePoint(500)), LockState::Empty);
        assert!(!rec.is_unlockable(TimePoint(500)));
    }

    #[test]
    fn normalized_clears_stale_unlock_time() {
        let rec = LockRecord::new(0, TimePoint(9_000)).normalized();
        assert_eq!(rec, LockRecord::empty());

        let held = LockRecord::new(10, TimePoint(9_000));
        assert_eq!(held.normalized(), held);
    }

    #[test]
    fn state_follows_time() {
        let rec = LockRecord::new(500, TimePoint(6_000));
        assert_eq!(rec.state(TimePoint(1_000)), LockState::Locked);
        assert_eq!(rec.time_remaining(TimePoint(3_000)), 3_000);
        assert_eq!(rec.state(TimePoint(6_000)), LockState::Unlockable);
        assert_eq!(rec.time_remaining(TimePoint(6_000)), 0);
        assert!(rec.is_unlockable(TimePoint(7_000)));
    }

    #[test]
    fn lock_state_display() {
        assert_eq!(format!("{}", LockState::Empty), "EMPTY");
        assert_eq!(format!("{}", LockState::Locked), "LOCKED");
        assert_eq!(format!("{}", LockState::Unlockable), "UNLOCKABLE");
    }

    #[test]
    fn request_from_value_matches_amount() {
        let req = LockRequest::from_value(100, 1_000);
        assert_eq!(req.amount, 100);
        assert_eq!(req.attached_value, 100);
        assert_eq!(req.duration_ms, 1_000);
    }

    #[test]
    fn record_serde_roundtrip() {
        let rec = LockRecord::new(1_000_000_000_000_000_000, TimePoint(42));
        let json = serde_json::to_string(&rec).unwrap();
        let back: LockRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, back);
    }
}
