//! Identifiers and scalar units used throughout LockBox.
//!
//! Accounts are identified by a 20-byte address. Time is logical
//! milliseconds supplied by a trusted clock, never by the caller.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{LockboxError, constants::ACCOUNT_ID_LEN};

/// Value in the smallest denomination (e.g. wei). Never negative.
pub type Amount = u128;

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// The identity under which locked value is tracked (one ledger entry each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct AccountId(pub [u8; ACCOUNT_ID_LEN]);

impl AccountId {
    #[must_use]
    pub const fn from_bytes(bytes: [u8; ACCOUNT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// An address with every byte set to `byte`. Handy for fixtures.
    #[must_use]
    pub const fn repeat_byte(byte: u8) -> Self {
        Self([byte; ACCOUNT_ID_LEN])
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; ACCOUNT_ID_LEN] {
        &self.0
    }

    /// Parse a hex address, with or without the `0x` prefix.
    ///
    /// # Errors
    /// Returns `InvalidAccount` if the input is not exactly 20 hex-encoded bytes.
    pub fn from_hex(input: &str) -> crate::Result<Self> {
        let trimmed = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);
        let bytes = hex::decode(trimmed).map_err(|e| LockboxError::InvalidAccount {
            reason: format!("{input:?}: {e}"),
        })?;
        let bytes: [u8; ACCOUNT_ID_LEN] =
            bytes
                .try_into()
                .map_err(|v: Vec<u8>| LockboxError::InvalidAccount {
                    reason: format!("{input:?}: expected {ACCOUNT_ID_LEN} bytes, got {}", v.len()),
                })?;
        Ok(Self(bytes))
    }

    /// First four bytes in hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// A random address.
    #[cfg(any(test, feature = "test-helpers"))]
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl FromStr for AccountId {
    type Err = LockboxError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Self::from_hex(s)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// TimePoint
// ---------------------------------------------------------------------------

/// Absolute logical time in milliseconds.
///
/// `TimePoint::ZERO` doubles as "no active lock" inside a [`crate::LockRecord`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize,
)]
pub struct TimePoint(pub u64);

impl TimePoint {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// `self + ms`, or `None` on overflow.
    #[must_use]
    pub fn checked_add_millis(self, ms: u64) -> Option<Self> {
        self.0.checked_add(ms).map(Self)
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    #[must_use]
    pub fn saturating_millis_since(self, earlier: Self) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl fmt::Display for TimePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t:{}ms", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_display_is_prefixed_hex() {
        let id = AccountId::repeat_byte(0xab);
        assert_eq!(
            id.to_string(),
            "0xabababababababababababababababababababab"
        );
        assert_eq!(id.short(), "abababab");
    }

    #[test]
    fn account_parse_accepts_both_prefixes() {
        let id = AccountId::repeat_byte(0x11);
        let with = id.to_string();
        let without = with.trim_start_matches("0x").to_string();
        assert_eq!(AccountId::from_hex(&with).unwrap(), id);
        assert_eq!(without.parse::<AccountId>().unwrap(), id);
    }

    #[test]
    fn account_parse_rejects_bad_input() {
        let err = AccountId::from_hex("0x1234").unwrap_err();
        assert!(matches!(err, LockboxError::InvalidAccount { .. }));

        let err = AccountId::from_hex("not-hex").unwrap_err();
        assert!(matches!(err, LockboxError::InvalidAccount { .. }));
    }

    #[test]
    fn random_accounts_differ() {
        assert_ne!(AccountId::random(), AccountId::random());
    }

    #[test]
    fn time_point_arithmetic() {
        let t = TimePoint::from_millis(1_000);
        assert_eq!(t.checked_add_millis(500), Some(TimePoint(1_500)));
        assert_eq!(TimePoint(u64::MAX).checked_add_millis(1), None);
        assert_eq!(TimePoint(4_000).saturating_millis_since(t), 3_000);
        assert_eq!(t.saturating_millis_since(TimePoint(4_000)), 0);
    }

    #[test]
    fn serde_roundtrips() {
        let id = AccountId::random();
        let json = serde_json::to_string(&id).unwrap();
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);

        let t = TimePoint(42);
        assert_eq!(serde_json::to_string(&t).unwrap(), "42");
    }
}
