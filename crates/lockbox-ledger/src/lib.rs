//! # lockbox-ledger
//!
//! **Ledger Store**: the durable mapping from account to [`LockRecord`]
//! plus the aggregate `total_locked`.
//!
//! ## Architecture
//!
//! 1. **LedgerStore**: the storage contract (get / put / total)
//! 2. **InMemoryLedger**: `HashMap`-backed store with an O(1) running total
//! 3. **SupplyConservation**: independent deposit/payout tally used to audit
//!    the ledger total
//!
//! The running total is adjusted by the delta of every `put`, so a reader
//! never observes a half-summed aggregate.
//!
//! [`LockRecord`]: lockbox_types::LockRecord

pub mod conservation;
pub mod store;

pub use conservation::SupplyConservation;
pub use store::{InMemoryLedger, LedgerStore};
