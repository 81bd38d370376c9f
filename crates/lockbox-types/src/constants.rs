//! System-wide constants for the LockBox custody engine.

/// Length of an account address in bytes.
pub const ACCOUNT_ID_LEN: usize = 20;

/// Default number of receipts retained by the journal before the oldest
/// are evicted.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 10_000;

/// Default upper bound on a single lock duration (milliseconds).
/// `i64::MAX` leaves durations unbounded apart from time-point overflow.
pub const DEFAULT_MAX_LOCK_DURATION_MS: i64 = i64::MAX;

/// Domain separator mixed into every receipt hash.
pub const RECEIPT_HASH_DOMAIN: &[u8] = b"lockbox:receipt:v1:";
