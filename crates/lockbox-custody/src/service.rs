//! Custody Service: the externally callable surface.
//!
//! Every mutation runs as one atomic unit under the writer lock:
//! 1. Refuse if the service has been halted by an invariant failure
//! 2. Read the clock and the account's record
//! 3. Plan the mutation with the [`LockEngine`]
//! 4. Move the value through the [`ValueVault`]
//! 5. Commit the new record to the [`LedgerStore`]
//! 6. Tally the movement, append a receipt, audit conservation
//! 7. Publish the outcome to the query view
//!
//! If the vault transfer fails nothing is committed. If the ledger commit
//! fails after the transfer, the transfer is reversed before the lock is
//! released, so neither half is ever observable on its own.
//!
//! Balance and time queries never touch the writer lock. They read a view
//! that the writer refreshes at the end of each mutation, so they always
//! see the last committed state and a polling reader cannot hold up a
//! lock or retrieve. Audit queries (receipts, full conservation check)
//! need the journal and ledger themselves and queue behind the writer.

use std::sync::Arc;

use dashmap::DashMap;
use lockbox_ledger::{InMemoryLedger, LedgerStore, SupplyConservation};
use lockbox_types::{
    AccountId, Amount, CustodyConfig, CustodyReceipt, LockRecord, LockRequest, LockState,
    LockboxError, ReceiptKind, Result, TimePoint,
};
use parking_lot::{Mutex, RwLock};

use crate::{
    clock::Clock,
    engine::LockEngine,
    journal::ReceiptJournal,
    vault::{InMemoryVault, ValueVault},
};

/// Everything a mutation touches, guarded together.
struct CustodyState<L, V> {
    ledger: L,
    vault: V,
    supply: SupplyConservation,
    journal: ReceiptJournal,
    /// Set when an invariant check fails; blocks further mutations.
    halted: Option<String>,
}

impl<L: LedgerStore, V: ValueVault> CustodyState<L, V> {
    fn ensure_live(&self) -> Result<()> {
        match &self.halted {
            Some(reason) => Err(LockboxError::SupplyInvariantViolation {
                reason: format!("custody halted: {reason}"),
            }),
            None => Ok(()),
        }
    }

    fn halt(&mut self, reason: String) {
        tracing::error!(reason = %reason, "Custody halted: mutations disabled");
        self.halted = Some(reason);
    }

    fn check_conservation(&self) -> Result<()> {
        self.supply.verify("ledger", self.ledger.total_locked())?;
        self.supply.verify("vault", self.vault.holdings())
    }
}

/// Aggregates as of the last committed mutation. Replaced, never edited.
#[derive(Debug, Clone, Default)]
struct Summary {
    total_locked: Amount,
    vault_holdings: Amount,
    account_count: usize,
    head_hash: [u8; 32],
    halted: bool,
}

/// Read side of the service, written only by the holder of the writer lock.
struct QueryView {
    records: DashMap<AccountId, LockRecord>,
    summary: RwLock<Arc<Summary>>,
}

impl QueryView {
    fn seed<L: LedgerStore, V: ValueVault>(state: &CustodyState<L, V>) -> Self {
        let view = Self {
            records: state.ledger.entries().into_iter().collect(),
            summary: RwLock::default(),
        };
        view.publish(state, None);
        view
    }

    fn record(&self, account: &AccountId) -> LockRecord {
        self.records
            .get(account)
            .map(|entry| *entry)
            .unwrap_or_default()
    }

    /// The current summary. The returned snapshot stays valid however long
    /// the caller keeps it.
    fn summary(&self) -> Arc<Summary> {
        Arc::clone(&self.summary.read())
    }

    /// Copy `touched` (if any) and the aggregates out of the committed state.
    fn publish<L: LedgerStore, V: ValueVault>(
        &self,
        state: &CustodyState<L, V>,
        touched: Option<AccountId>,
    ) {
        if let Some(account) = touched {
            let record = state.ledger.get(&account);
            if record.is_empty() {
                self.records.remove(&account);
            } else {
                self.records.insert(account, record);
            }
        }
        let next = Arc::new(Summary {
            total_locked: state.ledger.total_locked(),
            vault_holdings: state.vault.holdings(),
            account_count: state.ledger.account_count(),
            head_hash: state.journal.head_hash(),
            halted: state.halted.is_some(),
        });
        *self.summary.write() = next;
    }
}

/// Time-locked custody facade.
///
/// Owns the ledger and the vault outright; shares the clock read-only.
pub struct CustodyService<L = InMemoryLedger, V = InMemoryVault> {
    state: Mutex<CustodyState<L, V>>,
    view: QueryView,
    clock: Arc<dyn Clock>,
    engine: LockEngine,
    config: CustodyConfig,
}

impl CustodyService<InMemoryLedger, InMemoryVault> {
    /// Fresh in-memory service with the default configuration.
    #[must_use]
    pub fn in_memory(clock: Arc<dyn Clock>) -> Self {
        Self::assemble(
            InMemoryLedger::new(),
            InMemoryVault::new(),
            clock,
            CustodyConfig::default(),
        )
    }
}

impl<L: LedgerStore, V: ValueVault> CustodyService<L, V> {
    /// Build a service over an existing ledger and vault.
    ///
    /// Whatever the ledger already holds is taken as the opening supply, and
    /// the vault must hold exactly that much.
    ///
    /// # Errors
    /// Returns `Configuration` if the config is invalid or the vault and
    /// ledger disagree on the value in custody.
    pub fn new(ledger: L, vault: V, clock: Arc<dyn Clock>, config: CustodyConfig) -> Result<Self> {
        config.validate()?;
        if vault.holdings() != ledger.total_locked() {
            return Err(LockboxError::Configuration(format!(
                "vault holds {} but ledger records {}",
                vault.holdings(),
                ledger.total_locked()
            )));
        }
        Ok(Self::assemble(ledger, vault, clock, config))
    }

    fn assemble(ledger: L, vault: V, clock: Arc<dyn Clock>, config: CustodyConfig) -> Self {
        let state = CustodyState {
            supply: SupplyConservation::with_opening(ledger.total_locked()),
            ledger,
            vault,
            journal: ReceiptJournal::new(config.journal_capacity),
            halted: None,
        };
        Self {
            view: QueryView::seed(&state),
            state: Mutex::new(state),
            clock,
            engine: LockEngine::new(&config),
            config,
        }
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Take the attached value into custody until `now + duration`.
    ///
    /// An account that already holds value is topped up and its unlock time
    /// reset to this call's duration.
    ///
    /// # Errors
    /// - `InvalidAmount`, `InvalidDuration`, `InsufficientFundsSupplied`,
    ///   `BalanceOverflow` when the request is rejected (nothing changes)
    /// - `TransferFailed` if the value could not be collected (nothing changes)
    /// - `SupplyInvariantViolation` if the service is halted
    pub fn lock_funds(&self, account: AccountId, request: LockRequest) -> Result<CustodyReceipt> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_live()?;

        let now = self.clock.now();
        let current = state.ledger.get(&account);
        let plan = self
            .engine
            .plan_lock(&current, &request, now)
            .inspect_err(|err| {
                tracing::debug!(account = %account, error = %err, "Lock rejected");
            })?;

        if state
            .ledger
            .total_locked()
            .checked_add(plan.deposit)
            .is_none()
        {
            tracing::debug!(account = %account, deposit = plan.deposit, "Lock rejected: total overflow");
            return Err(LockboxError::BalanceOverflow);
        }

        state
            .vault
            .collect(account, plan.deposit)
            .map_err(as_transfer_failure)
            .inspect_err(|err| {
                tracing::warn!(account = %account, deposit = plan.deposit, error = %err, "Collect failed");
            })?;

        if let Err(err) = state.ledger.put(account, plan.next) {
            tracing::warn!(account = %account, error = %err, "Ledger commit failed, returning deposit");
            if let Err(refund) = state.vault.disburse(account, plan.deposit) {
                state.halt(format!(
                    "refund of {} to {account} failed after ledger error: {refund}",
                    plan.deposit
                ));
                self.view.publish(state, None);
            }
            return Err(err);
        }

        if let Err(err) = state.supply.record_deposit(plan.deposit) {
            state.halt(err.to_string());
        }
        let receipt = state.journal.append(
            ReceiptKind::Locked,
            account,
            plan.deposit,
            plan.next.amount,
            plan.next.unlock_time,
            now,
        );

        tracing::info!(
            account = %account,
            deposit = plan.deposit,
            balance = plan.next.amount,
            unlock_time = plan.next.unlock_time.as_millis(),
            sequence = receipt.sequence,
            "Funds locked"
        );

        self.audit(state);
        self.view.publish(state, Some(account));
        Ok(receipt)
    }

    /// Pay the account's full balance back out, if its lock has expired.
    ///
    /// # Errors
    /// - `NoFundsLocked` if the account holds nothing
    /// - `LockNotExpired` (with the remaining time) before the unlock time
    /// - `TransferFailed` if the payout failed (the record is kept intact)
    /// - `SupplyInvariantViolation` if the service is halted
    pub fn retrieve_funds(&self, account: AccountId) -> Result<CustodyReceipt> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.ensure_live()?;

        let now = self.clock.now();
        let current = state.ledger.get(&account);
        let plan = self
            .engine
            .plan_retrieve(&current, now)
            .inspect_err(|err| {
                tracing::debug!(account = %account, error = %err, "Retrieve rejected");
            })?;

        state
            .vault
            .disburse(account, plan.payout)
            .map_err(as_transfer_failure)
            .inspect_err(|err| {
                tracing::warn!(account = %account, payout = plan.payout, error = %err, "Payout failed");
            })?;

        if let Err(err) = state.ledger.put(account, LockRecord::empty()) {
            tracing::warn!(account = %account, error = %err, "Ledger commit failed, reclaiming payout");
            if let Err(reclaim) = state.vault.collect(account, plan.payout) {
                state.halt(format!(
                    "reclaim of {} from {account} failed after ledger error: {reclaim}",
                    plan.payout
                ));
                self.view.publish(state, None);
            }
            return Err(err);
        }

        if let Err(err) = state.supply.record_payout(plan.payout) {
            state.halt(err.to_string());
        }
        let receipt = state.journal.append(
            ReceiptKind::Retrieved,
            account,
            plan.payout,
            0,
            TimePoint::ZERO,
            now,
        );

        tracing::info!(
            account = %account,
            payout = plan.payout,
            sequence = receipt.sequence,
            "Funds retrieved"
        );

        self.audit(state);
        self.view.publish(state, Some(account));
        Ok(receipt)
    }

    fn audit(&self, state: &mut CustodyState<L, V>) {
        if !self.config.verify_after_commit || state.halted.is_some() {
            return;
        }
        if let Err(err) = state.check_conservation() {
            state.halt(err.to_string());
        }
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// Aggregate value in custody across all accounts.
    pub fn get_contract_balance(&self) -> Amount {
        self.view.summary().total_locked
    }

    /// The account's current custody balance.
    pub fn get_balance(&self, account: &AccountId) -> Amount {
        self.view.record(account).amount
    }

    /// Milliseconds until the account's lock expires; 0 if never locked or
    /// already unlockable.
    pub fn get_lock_time_remaining(&self, account: &AccountId) -> u64 {
        LockEngine::time_remaining(&self.view.record(account), self.clock.now())
    }

    pub fn get_lock_record(&self, account: &AccountId) -> LockRecord {
        self.view.record(account)
    }

    pub fn lock_state(&self, account: &AccountId) -> LockState {
        self.view.record(account).state(self.clock.now())
    }

    /// Accounts currently holding value.
    pub fn account_count(&self) -> usize {
        self.view.summary().account_count
    }

    /// Value the vault currently holds.
    pub fn vault_holdings(&self) -> Amount {
        self.view.summary().vault_holdings
    }

    /// Hex hash of the most recent receipt.
    pub fn journal_head(&self) -> String {
        hex::encode(self.view.summary().head_hash)
    }

    /// Whether an invariant failure has disabled mutations.
    pub fn is_halted(&self) -> bool {
        self.view.summary().halted
    }

    /// Retained receipts, oldest first.
    pub fn receipts(&self) -> Vec<CustodyReceipt> {
        self.state.lock().journal.iter().cloned().collect()
    }

    pub fn receipt(&self, sequence: u64) -> Option<CustodyReceipt> {
        self.state.lock().journal.get(sequence).cloned()
    }

    /// Full audit: tally vs ledger total vs vault holdings vs a scan of
    /// every record, plus the receipt chain and the published view.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` or `JournalCorrupted` on the first failure.
    pub fn verify_conservation(&self) -> Result<()> {
        let state = self.state.lock();
        state.check_conservation()?;
        let scanned = state.ledger.recompute_total();
        if scanned != state.ledger.total_locked() {
            return Err(LockboxError::SupplyInvariantViolation {
                reason: format!(
                    "running total {} != scanned total {scanned}",
                    state.ledger.total_locked()
                ),
            });
        }
        let published = self.view.summary().total_locked;
        if published != scanned {
            return Err(LockboxError::SupplyInvariantViolation {
                reason: format!("published total {published} != scanned total {scanned}"),
            });
        }
        state.journal.verify_chain()
    }
}

/// Anything a vault reports is surfaced to the caller as a transfer failure.
fn as_transfer_failure(err: LockboxError) -> LockboxError {
    match err {
        LockboxError::TransferFailed { .. } => err,
        other => LockboxError::TransferFailed {
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn setup(start: u64) -> (CustodyService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(TimePoint(start)));
        let service = CustodyService::in_memory(clock.clone());
        (service, clock)
    }

    #[test]
    fn lock_then_retrieve_round_trip() {
        let (svc, clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);

        svc.lock_funds(alice, LockRequest::from_value(100, 1_000)).unwrap();
        clock.advance(1_000);
        let receipt = svc.retrieve_funds(alice).unwrap();

        assert_eq!(receipt.kind, ReceiptKind::Retrieved);
        assert_eq!(receipt.amount, 100);
        assert_eq!(svc.get_balance(&alice), 0);
        assert_eq!(svc.get_contract_balance(), 0);
        assert_eq!(svc.vault_holdings(), 0);
    }

    #[test]
    fn early_retrieve_is_rejected_without_change() {
        let (svc, clock) = setup(1_000);
        let alice = AccountId::repeat_byte(0xa1);
        svc.lock_funds(alice, LockRequest::from_value(500, 5_000)).unwrap();

        clock.set(TimePoint(3_000));
        let before = svc.get_lock_record(&alice);
        let err = svc.retrieve_funds(alice).unwrap_err();
        assert!(matches!(err, LockboxError::LockNotExpired { remaining_ms: 3_000 }));
        assert_eq!(svc.get_lock_record(&alice), before);
        assert_eq!(svc.receipts().len(), 1);
    }

    #[test]
    fn rejected_lock_leaves_no_trace() {
        let (svc, _clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);
        let err = svc
            .lock_funds(alice, LockRequest::from_value(0, 1_000))
            .unwrap_err();
        assert!(matches!(err, LockboxError::InvalidAmount));
        assert_eq!(svc.get_contract_balance(), 0);
        assert_eq!(svc.account_count(), 0);
        assert!(svc.receipts().is_empty());
    }

    #[test]
    fn lock_state_tracks_clock() {
        let (svc, clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);
        assert_eq!(svc.lock_state(&alice), LockState::Empty);

        svc.lock_funds(alice, LockRequest::from_value(1, 10)).unwrap();
        assert_eq!(svc.lock_state(&alice), LockState::Locked);

        clock.advance(10);
        assert_eq!(svc.lock_state(&alice), LockState::Unlockable);
    }

    #[test]
    fn volume_beyond_amount_range_keeps_service_live() {
        let (svc, _clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);
        let half: Amount = 1 << 127;

        for _ in 0..3 {
            svc.lock_funds(alice, LockRequest::from_value(half, 0)).unwrap();
            assert_eq!(svc.retrieve_funds(alice).unwrap().amount, half);
        }
        svc.lock_funds(alice, LockRequest::from_value(half, 0)).unwrap();

        assert!(!svc.is_halted());
        assert_eq!(svc.retrieve_funds(alice).unwrap().amount, half);
        assert_eq!(svc.get_contract_balance(), 0);
        assert!(svc.verify_conservation().is_ok());
    }

    #[test]
    fn queries_answer_while_writer_lock_is_held() {
        let (svc, clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);
        svc.lock_funds(alice, LockRequest::from_value(40, 100)).unwrap();

        let _writer = svc.state.lock();
        assert_eq!(svc.get_contract_balance(), 40);
        assert_eq!(svc.get_balance(&alice), 40);
        clock.advance(30);
        assert_eq!(svc.get_lock_time_remaining(&alice), 70);
        assert_eq!(svc.lock_state(&alice), LockState::Locked);
        assert_eq!(svc.account_count(), 1);
        assert_eq!(svc.vault_holdings(), 40);
        assert!(!svc.is_halted());
    }

    #[test]
    fn held_summary_does_not_hold_up_mutations() {
        let (svc, _clock) = setup(0);
        let alice = AccountId::repeat_byte(0xa1);

        let before = svc.view.summary();
        svc.lock_funds(alice, LockRequest::from_value(100, 1_000)).unwrap();

        assert_eq!(before.total_locked, 0);
        assert_eq!(svc.get_contract_balance(), 100);
        assert_eq!(svc.journal_head(), svc.receipts()[0].hash_hex());
    }

    #[test]
    fn mismatched_vault_rejected_at_construction() {
        let mut vault = InMemoryVault::new();
        vault.collect(AccountId::repeat_byte(1), 5).unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(TimePoint(0)));
        let err = CustodyService::new(InMemoryLedger::new(), vault, clock, CustodyConfig::default())
            .err()
            .unwrap();
        assert!(matches!(err, LockboxError::Configuration(_)));
    }

    #[test]
    fn invalid_config_rejected_at_construction() {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(TimePoint(0)));
        let config = CustodyConfig {
            journal_capacity: 0,
            ..CustodyConfig::default()
        };
        let result = CustodyService::new(InMemoryLedger::new(), InMemoryVault::new(), clock, config);
        assert!(matches!(result, Err(LockboxError::Configuration(_))));
    }

    #[test]
    fn existing_ledger_becomes_opening_supply() {
        let alice = AccountId::repeat_byte(0xa1);
        let mut ledger = InMemoryLedger::new();
        ledger.put(alice, LockRecord::new(70, TimePoint(50))).unwrap();
        let mut vault = InMemoryVault::new();
        vault.collect(alice, 70).unwrap();

        let clock = Arc::new(ManualClock::new(TimePoint(100)));
        let svc = CustodyService::new(ledger, vault, clock, CustodyConfig::default()).unwrap();
        assert!(svc.verify_conservation().is_ok());
        assert_eq!(svc.get_balance(&alice), 70);
        assert_eq!(svc.get_contract_balance(), 70);
        assert_eq!(svc.account_count(), 1);

        let receipt = svc.retrieve_funds(alice).unwrap();
        assert_eq!(receipt.amount, 70);
        assert!(svc.verify_conservation().is_ok());
    }
}
