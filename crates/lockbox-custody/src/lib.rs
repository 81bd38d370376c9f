//! # lockbox-custody
//!
//! **Custody plane**: the externally callable surface of LockBox and the
//! logic behind it.
//!
//! ## Architecture
//!
//! 1. **Clock**: trusted, monotonic time source (never caller-supplied)
//! 2. **LockEngine**: pure validation of lock / retrieve against a record
//! 3. **ValueVault**: moves attached value into and out of custody
//! 4. **ReceiptJournal**: bounded, hash-chained audit trail
//! 5. **CustodyService**: facade that runs each mutation as one atomic unit
//!
//! ## Mutation Flow
//!
//! ```text
//! caller → CustodyService (writer lock)
//!        → Clock.now() → LockEngine.plan_*() → ValueVault transfer
//!        → LedgerStore.put() → ReceiptJournal.append() → publish view
//! ```
//!
//! Balance and time queries read the published view and never wait on the
//! writer lock.

pub mod clock;
pub mod engine;
pub mod journal;
pub mod service;
pub mod vault;

pub use clock::{Clock, ManualClock, SystemClock};
pub use engine::{LockEngine, LockPlan, RetrievePlan};
pub use journal::ReceiptJournal;
pub use service::CustodyService;
pub use vault::{InMemoryVault, ValueVault};
