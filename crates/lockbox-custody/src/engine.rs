//! Lock engine: pure validation of custody requests.
//!
//! Given the account's current record, the request and a time point, the
//! engine either rejects the request or returns a plan describing exactly
//! what the service must commit. It never touches the ledger, the vault or
//! the clock itself, so every decision is reproducible from its inputs.
//!
//! Re-locking an account that already holds value is an additive top-up:
//! the amounts are summed and the unlock time is reset to `now + duration`
//! of the newest call, whether the previous lock was still running or
//! already unlockable.

use lockbox_types::{Amount, CustodyConfig, LockRecord, LockRequest, LockboxError, Result, TimePoint};

/// What a successful lock call commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockPlan {
    /// Value to collect into custody.
    pub deposit: Amount,
    /// The account's record after the call.
    pub next: LockRecord,
}

/// What a successful retrieve call commits. The next record is always empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrievePlan {
    /// Value to pay back out (the full balance).
    pub payout: Amount,
}

/// Stateless lock/retrieve validator.
#[derive(Debug, Clone)]
pub struct LockEngine {
    max_lock_duration_ms: i64,
}

impl LockEngine {
    #[must_use]
    pub fn new(config: &CustodyConfig) -> Self {
        Self {
            max_lock_duration_ms: config.max_lock_duration_ms,
        }
    }

    /// Validate a lock request against `current` at time `now`.
    ///
    /// # Errors
    /// - `InvalidAmount` if the declared amount is zero
    /// - `InvalidDuration` if the duration is negative, above the configured
    ///   maximum, or pushes the unlock time past the end of the clock
    /// - `InsufficientFundsSupplied` if the attached value differs from the
    ///   declared amount
    /// - `BalanceOverflow` if the topped-up balance is not representable
    pub fn plan_lock(
        &self,
        current: &LockRecord,
        request: &LockRequest,
        now: TimePoint,
    ) -> Result<LockPlan> {
        if request.amount == 0 {
            return Err(LockboxError::InvalidAmount);
        }

        let duration = u64::try_from(request.duration_ms).map_err(|_| {
            LockboxError::InvalidDuration {
                reason: format!("duration {}ms is negative", request.duration_ms),
            }
        })?;
        if request.duration_ms > self.max_lock_duration_ms {
            return Err(LockboxError::InvalidDuration {
                reason: format!(
                    "duration {}ms exceeds maximum {}ms",
                    request.duration_ms, self.max_lock_duration_ms
                ),
            });
        }
        let unlock_time =
            now.checked_add_millis(duration)
                .ok_or_else(|| LockboxError::InvalidDuration {
                    reason: format!("unlock time {now} + {duration}ms overflows"),
                })?;

        if request.attached_value != request.amount {
            return Err(LockboxError::InsufficientFundsSupplied {
                declared: request.amount,
                attached: request.attached_value,
            });
        }

        let amount = current
            .amount
            .checked_add(request.amount)
            .ok_or(LockboxError::BalanceOverflow)?;

        Ok(LockPlan {
            deposit: request.amount,
            next: LockRecord::new(amount, unlock_time),
        })
    }

    /// Validate a full retrieve of `current` at time `now`.
    ///
    /// # Errors
    /// - `NoFundsLocked` if the account holds nothing
    /// - `LockNotExpired` (with the remaining time) if `now < unlock_time`
    pub fn plan_retrieve(&self, current: &LockRecord, now: TimePoint) -> Result<RetrievePlan> {
        if current.is_empty() {
            return Err(LockboxError::NoFundsLocked);
        }
        if now < current.unlock_time {
            return Err(LockboxError::LockNotExpired {
                remaining_ms: current.time_remaining(now),
            });
        }
        Ok(RetrievePlan {
            payout: current.amount,
        })
    }

    /// `max(0, unlock_time - now)`. Zero both when never locked and when
    /// already unlockable; callers tell them apart by the amount.
    #[must_use]
    pub fn time_remaining(current: &LockRecord, now: TimePoint) -> u64 {
        current.time_remaining(now)
    }
}

impl Default for LockEngine {
    fn default() -> Self {
        Self::new(&CustodyConfig::default())
    }
}
