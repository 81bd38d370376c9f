//! Supply conservation invariant checker.
//!
//! Mathematical invariant checked after every custody mutation:
//! ```text
//! total_locked == opening + Σ(deposits) - Σ(payouts) == vault holdings
//! ```
//!
//! The tally is kept independently of the ledger, so a bug that moves the
//! ledger total without moving value (or the reverse) shows up here.
//!
//! Only the net amount in custody is tracked. Lifetime volume is unbounded
//! and would eventually exceed any fixed-width counter, while the net is
//! bounded by the ledger total.

use lockbox_types::{Amount, LockboxError, Result};

/// Net value that should be in custody, plus a count of movements.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    expected: Amount,
    deposits: u64,
    payouts: u64,
}

impl SupplyConservation {
    /// Create a new supply conservation tracker starting from zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker seeded with value already in custody.
    #[must_use]
    pub fn with_opening(opening: Amount) -> Self {
        Self {
            expected: opening,
            ..Self::default()
        }
    }

    /// Record value taken into custody.
    ///
    /// # Errors
    /// Returns [`LockboxError::SupplyInvariantViolation`] if the expected
    /// supply would exceed the representable range; the tally is unchanged.
    pub fn record_deposit(&mut self, amount: Amount) -> Result<()> {
        self.expected = self.expected.checked_add(amount).ok_or_else(|| {
            LockboxError::SupplyInvariantViolation {
                reason: format!(
                    "deposit of {amount} overflows expected supply {}",
                    self.expected
                ),
            }
        })?;
        self.deposits += 1;
        Ok(())
    }

    /// Record value paid back out.
    ///
    /// # Errors
    /// Returns [`LockboxError::SupplyInvariantViolation`] if more would be
    /// paid out than is in custody; the tally is unchanged.
    pub fn record_payout(&mut self, amount: Amount) -> Result<()> {
        self.expected = self.expected.checked_sub(amount).ok_or_else(|| {
            LockboxError::SupplyInvariantViolation {
                reason: format!(
                    "payout of {amount} exceeds expected supply {}",
                    self.expected
                ),
            }
        })?;
        self.payouts += 1;
        Ok(())
    }

    /// Expected value in custody.
    #[must_use]
    pub fn expected_supply(&self) -> Amount {
        self.expected
    }

    /// Verify that `actual` (a ledger total or vault holdings) matches the
    /// expected supply.
    ///
    /// # Errors
    /// Returns [`LockboxError::SupplyInvariantViolation`] if actual ≠ expected.
    pub fn verify(&self, source: &str, actual: Amount) -> Result<()> {
        if actual == self.expected {
            return Ok(());
        }
        Err(LockboxError::SupplyInvariantViolation {
            reason: format!(
                "{source}: actual supply {actual} != expected {} \
                 (deposits={}, payouts={})",
                self.expected, self.deposits, self.payouts,
            ),
        })
    }

    /// Number of deposits recorded.
    #[must_use]
    pub fn deposit_count(&self) -> u64 {
        self.deposits
    }

    /// Number of payouts recorded.
    #[must_use]
    pub fn payout_count(&self) -> u64 {
        self.payouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_supply_is_zero() {
        let sc = SupplyConservation::new();
        assert_eq!(sc.expected_supply(), 0);
        assert!(sc.verify("ledger", 0).is_ok());
    }

    #[test]
    fn deposits_and_payouts_net_out() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(1_000).unwrap();
        sc.record_deposit(500).unwrap();
        sc.record_payout(300).unwrap();
        assert_eq!(sc.expected_supply(), 1_200);
        assert_eq!(sc.deposit_count(), 2);
        assert_eq!(sc.payout_count(), 1);
        assert!(sc.verify("ledger", 1_200).is_ok());
    }

    #[test]
    fn opening_supply_counts_as_custody() {
        let mut sc = SupplyConservation::with_opening(70);
        assert!(sc.verify("vault", 70).is_ok());
        sc.record_payout(70).unwrap();
        assert_eq!(sc.expected_supply(), 0);
    }

    #[test]
    fn verify_fails_when_imbalanced() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(10).unwrap();
        let err = sc.verify("vault", 11).unwrap_err();
        assert!(matches!(err, LockboxError::SupplyInvariantViolation { .. }));
        assert!(format!("{err}").contains("vault"));
    }

    #[test]
    fn overdrawn_payout_rejected() {
        let mut sc = SupplyConservation::new();
        sc.record_deposit(5).unwrap();
        let err = sc.record_payout(6).unwrap_err();
        assert!(matches!(err, LockboxError::SupplyInvariantViolation { .. }));
        assert_eq!(sc.expected_supply(), 5);
        assert_eq!(sc.payout_count(), 0);
    }

    #[test]
    fn lifetime_volume_beyond_amount_range_stays_exact() {
        let half = 1u128 << 127;
        let mut sc = SupplyConservation::new();
        for _ in 0..4 {
            sc.record_deposit(half).unwrap();
            sc.record_payout(half).unwrap();
        }
        sc.record_deposit(half).unwrap();
        assert_eq!(sc.expected_supply(), half);
        assert!(sc.verify("ledger", half).is_ok());
        assert_eq!(sc.deposit_count(), 5);
    }

    #[test]
    fn expected_supply_overflow_rejected() {
        let mut sc = SupplyConservation::with_opening(Amount::MAX);
        assert!(sc.record_deposit(1).is_err());
        assert_eq!(sc.expected_supply(), Amount::MAX);
    }
}
