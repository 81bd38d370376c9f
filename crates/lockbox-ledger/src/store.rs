//! Ledger storage for lock records.
//!
//! Tracks one [`LockRecord`] per account and keeps `total_locked` equal to
//! the sum of every record's amount. All mutations are atomic: either the
//! record and the total both change, or neither does.

use std::collections::HashMap;

use lockbox_types::{AccountId, Amount, LockRecord, LockboxError, Result};

/// Storage contract for lock records.
///
/// The Custody Service owns exactly one store; nothing else holds a mutable
/// reference to it.
pub trait LedgerStore: Send + Sync {
    /// The account's record, or the empty record if it has none.
    fn get(&self, account: &AccountId) -> LockRecord;

    /// Replace the account's record and adjust the running total by the
    /// difference. A zero-amount record removes the account.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the new total is not representable; the
    /// store is unchanged in that case.
    fn put(&mut self, account: AccountId, record: LockRecord) -> Result<()>;

    /// Sum of all amounts. O(1).
    fn total_locked(&self) -> Amount;

    /// Accounts with a non-empty record.
    fn account_count(&self) -> usize;

    /// Full scan of all amounts. Audit only; never used to answer
    /// `total_locked`.
    fn recompute_total(&self) -> Amount;

    /// Every non-empty record, in no particular order.
    fn entries(&self) -> Vec<(AccountId, LockRecord)>;
}

/// `HashMap`-backed ledger living for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    /// Non-empty records only.
    records: HashMap<AccountId, LockRecord>,
    /// Maintained aggregate of `records[*].amount`.
    total_locked: Amount,
}

impl InMemoryLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterate over all non-empty records.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &LockRecord)> {
        self.records.iter()
    }
}

impl LedgerStore for InMemoryLedger {
    fn get(&self, account: &AccountId) -> LockRecord {
        self.records.get(account).copied().unwrap_or_default()
    }

    fn put(&mut self, account: AccountId, record: LockRecord) -> Result<()> {
        let record = record.normalized();
        let previous = self.get(&account).amount;

        let next_total = self
            .total_locked
            .checked_sub(previous)
            .ok_or_else(|| {
                LockboxError::Internal(format!(
                    "ledger total {} below record amount {previous} for {account}",
                    self.total_locked
                ))
            })?
            .checked_add(record.amount)
            .ok_or(LockboxError::BalanceOverflow)?;

        if record.is_empty() {
            self.records.remove(&account);
        } else {
            self.records.insert(account, record);
        }
        self.total_locked = next_total;

        tracing::trace!(
            account = %account,
            amount = record.amount,
            total = self.total_locked,
            "Ledger record replaced"
        );
        Ok(())
    }

    fn total_locked(&self) -> Amount {
        self.total_locked
    }

    fn account_count(&self) -> usize {
        self.records.len()
    }

    fn recompute_total(&self) -> Amount {
        self.records.values().map(|r| r.amount).sum()
    }

    fn entries(&self) -> Vec<(AccountId, LockRecord)> {
        self.iter().map(|(account, record)| (*account, *record)).collect()
    }
}
