//! Custody receipts for the LockBox audit trail.
//!
//! Every committed custody mutation (lock, retrieve) produces a
//! [`CustodyReceipt`]. Receipts are hash-chained: each one commits to its
//! own payload and to the hash of the receipt before it, so any edit to a
//! retained receipt breaks every hash after it.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{AccountId, Amount, TimePoint, constants};

/// The type of custody action this receipt proves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// Value was taken into custody (new lock or top-up).
    Locked,
    /// The full balance was paid back out.
    Retrieved,
}

impl ReceiptKind {
    fn tag(self) -> u8 {
        match self {
            Self::Locked => 1,
            Self::Retrieved => 2,
        }
    }
}

impl std::fmt::Display for ReceiptKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "LOCKED"),
            Self::Retrieved => write!(f, "RETRIEVED"),
        }
    }
}

/// Proof that a custody mutation was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustodyReceipt {
    /// Position in the global mutation order, starting at 1.
    pub sequence: u64,
    pub kind: ReceiptKind,
    pub account: AccountId,
    /// Value deposited (`Locked`) or paid out (`Retrieved`).
    pub amount: Amount,
    /// The account's custody balance after the mutation.
    pub balance_after: Amount,
    /// The account's unlock time after the mutation (`ZERO` after retrieve).
    pub unlock_time: TimePoint,
    /// Clock reading the mutation was evaluated against.
    pub committed_at: TimePoint,
    /// Hash of the preceding receipt (all zeros for the first).
    pub prev_hash: [u8; 32],
    /// SHA-256 over the canonical payload and `prev_hash`.
    pub hash: [u8; 32],
}

impl CustodyReceipt {
    /// Build a receipt and seal it onto the chain ending at `prev_hash`.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn sealed(
        sequence: u64,
        kind: ReceiptKind,
        account: AccountId,
        amount: Amount,
        balance_after: Amount,
        unlock_time: TimePoint,
        committed_at: TimePoint,
        prev_hash: [u8; 32],
    ) -> Self {
        let mut receipt = Self {
            sequence,
            kind,
            account,
            amount,
            balance_after,
            unlock_time,
            committed_at,
            prev_hash,
            hash: [0u8; 32],
        };
        receipt.hash = receipt.compute_hash();
        receipt
    }

    /// Canonical hashing payload.
    ///
    /// Format: `domain || sequence || kind || account || amount || balance_after
    /// || unlock_time || committed_at || prev_hash`, integers little-endian.
    #[must_use]
    pub fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(constants::RECEIPT_HASH_DOMAIN);
        hasher.update(self.sequence.to_le_bytes());
        hasher.update([self.kind.tag()]);
        hasher.update(self.account.as_bytes());
        hasher.update(self.amount.to_le_bytes());
        hasher.update(self.balance_after.to_le_bytes());
        hasher.update(self.unlock_time.as_millis().to_le_bytes());
        hasher.update(self.committed_at.as_millis().to_le_bytes());
        hasher.update(self.prev_hash);
        hasher.finalize().into()
    }

    /// Whether `hash` still matches the receipt's contents.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.compute_hash() == self.hash
    }

    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}
