//! Value vault: where custody value physically sits.
//!
//! The ledger only records who is owed what. The vault is the collaborator
//! that actually receives the value attached to a lock call and sends it
//! back on retrieval. Either direction can fail; the service treats a
//! failure as `TransferFailed` and leaves the ledger untouched.

use std::collections::HashMap;

use lockbox_types::{AccountId, Amount, LockboxError, Result};

/// Moves value into and out of custody.
pub trait ValueVault: Send + Sync {
    /// Take `amount` attached by `from` into custody.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the value could not be received.
    fn collect(&mut self, from: AccountId, amount: Amount) -> Result<()>;

    /// Pay `amount` out of custody to `to`.
    ///
    /// # Errors
    /// Returns `TransferFailed` if the payout could not be completed.
    fn disburse(&mut self, to: AccountId, amount: Amount) -> Result<()>;

    /// Value currently held.
    fn holdings(&self) -> Amount;
}

/// Process-local vault that keeps a tally of value held and paid out.
#[derive(Debug, Default)]
pub struct InMemoryVault {
    holdings: Amount,
    /// Lifetime payouts per account.
    disbursed: HashMap<AccountId, Amount>,
}

impl InMemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total ever paid out to `account`.
    #[must_use]
    pub fn disbursed_to(&self, account: &AccountId) -> Amount {
        self.disbursed.get(account).copied().unwrap_or(0)
    }
}

impl ValueVault for InMemoryVault {
    fn collect(&mut self, from: AccountId, amount: Amount) -> Result<()> {
        self.holdings = self
            .holdings
            .checked_add(amount)
            .ok_or_else(|| LockboxError::TransferFailed {
                reason: format!("vault holdings overflow collecting {amount} from {from}"),
            })?;
        Ok(())
    }

    fn disburse(&mut self, to: AccountId, amount: Amount) -> Result<()> {
        if amount > self.holdings {
            return Err(LockboxError::TransferFailed {
                reason: format!(
                    "vault holds {} but {amount} requested for {to}",
                    self.holdings
                ),
            });
        }
        self.holdings -= amount;
        let paid = self.disbursed.entry(to).or_default();
        *paid = paid.saturating_add(amount);
        Ok(())
    }

    fn holdings(&self) -> Amount {
        self.holdings
    }
}
