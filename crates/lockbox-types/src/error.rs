//! Error types for the LockBox custody engine.
//!
//! All errors use the `LB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Request validation errors
//! - 2xx: Lock state errors
//! - 3xx: Value transfer errors
//! - 4xx: Ledger invariant errors
//! - 9xx: General / internal errors

use thiserror::Error;

use crate::Amount;

/// Central error enum for all LockBox operations.
#[derive(Debug, Error)]
pub enum LockboxError {
    // =================================================================
    // Request Errors (1xx)
    // =================================================================
    /// A lock was requested for a zero amount.
    #[error("LB_ERR_100: Invalid amount: lock amount must be greater than zero")]
    InvalidAmount,

    /// The account identifier could not be parsed.
    #[error("LB_ERR_101: Invalid account: {reason}")]
    InvalidAccount { reason: String },

    /// The lock duration is negative, above the configured maximum, or
    /// would push the unlock time past the end of the clock.
    #[error("LB_ERR_102: Invalid duration: {reason}")]
    InvalidDuration { reason: String },

    /// The attached value does not match the declared lock amount.
    #[error("LB_ERR_103: Insufficient funds supplied: declared {declared}, attached {attached}")]
    InsufficientFundsSupplied { declared: Amount, attached: Amount },

    // =================================================================
    // Lock State Errors (2xx)
    // =================================================================
    /// The account has nothing in custody.
    #[error("LB_ERR_200: No funds locked for account")]
    NoFundsLocked,

    /// The lock has not expired yet.
    #[error("LB_ERR_201: Lock not expired: {remaining_ms}ms remaining")]
    LockNotExpired { remaining_ms: u64 },

    // =================================================================
    // Transfer Errors (3xx)
    // =================================================================
    /// Moving value into or out of custody failed. The ledger is unchanged.
    #[error("LB_ERR_300: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Invariant Errors (4xx)
    // =================================================================
    /// A balance or the ledger total would exceed the representable range.
    #[error("LB_ERR_400: Balance overflow")]
    BalanceOverflow,

    /// Supply conservation invariant violated. Critical safety alert.
    #[error("LB_ERR_401: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    /// A receipt hash no longer matches its contents or its predecessor.
    #[error("LB_ERR_402: Receipt journal corrupted at sequence {sequence}")]
    JournalCorrupted { sequence: u64 },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("LB_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("LB_ERR_901: Serialization error: {0}")]
    Serialization(String),

    /// Configuration error (invalid config file, bad values, etc.).
    #[error("LB_ERR_902: Configuration error: {0}")]
    Configuration(String),
}

impl LockboxError {
    /// Whether the same call may succeed later without any change on the
    /// caller's side (only an unexpired lock qualifies).
    #[must_use]
    pub fn is_retryable_later(&self) -> bool {
        matches!(self, Self::LockNotExpired { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LockboxError>;

impl From<serde_json::Error> for LockboxError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let msg = format!("{}", LockboxError::InvalidAmount);
        assert!(msg.starts_with("LB_ERR_100"), "Got: {msg}");
    }

    #[test]
    fn insufficient_funds_display() {
        let err = LockboxError::InsufficientFundsSupplied {
            declared: 100,
            attached: 50,
        };
        let msg = format!("{err}");
        assert!(msg.contains("LB_ERR_103"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn lock_not_expired_reports_remaining_time() {
        let err = LockboxError::LockNotExpired { remaining_ms: 3000 };
        let msg = format!("{err}");
        assert!(msg.contains("LB_ERR_201"));
        assert!(msg.contains("3000ms"));
        assert!(err.is_retryable_later());
        assert!(!LockboxError::NoFundsLocked.is_retryable_later());
    }

    #[test]
    fn all_errors_have_lb_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(LockboxError::NoFundsLocked),
            Box::new(LockboxError::BalanceOverflow),
            Box::new(LockboxError::TransferFailed {
                reason: "test".into(),
            }),
            Box::new(LockboxError::JournalCorrupted { sequence: 7 }),
            Box::new(LockboxError::Internal("test".into())),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("LB_ERR_"),
                "Error missing LB_ERR_ prefix: {msg}"
            );
        }
    }

    #[test]
    fn serde_json_error_converts() {
        let raw = serde_json::from_str::<u64>("nope").unwrap_err();
        let err: LockboxError = raw.into();
        assert!(matches!(err, LockboxError::Serialization(_)));
    }
}
