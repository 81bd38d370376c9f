//! Receipt journal: bounded, hash-chained audit trail.
//!
//! Every committed mutation appends one [`CustodyReceipt`]. Each receipt's
//! `prev_hash` is the hash of the receipt before it (all zeros for the very
//! first), so the retained window can be verified end to end.
//!
//! The journal keeps at most `capacity` receipts. When full, the oldest is
//! evicted; the chain head keeps advancing, so eviction never breaks
//! verification of what is retained.

use std::collections::VecDeque;

use lockbox_types::{
    AccountId, Amount, CustodyReceipt, LockboxError, ReceiptKind, Result, TimePoint,
};

/// Append-only receipt log with oldest-first eviction.
#[derive(Debug)]
pub struct ReceiptJournal {
    /// Retained receipts, front = oldest.
    receipts: VecDeque<CustodyReceipt>,
    /// Maximum number of receipts before eviction kicks in.
    capacity: usize,
    /// Sequence number for the next receipt.
    next_sequence: u64,
    /// Hash of the most recent receipt, evicted or not.
    head_hash: [u8; 32],
}

impl ReceiptJournal {
    /// Create a new journal with the given capacity.
    ///
    /// # Panics
    /// Panics if `capacity` is zero.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ReceiptJournal capacity must be > 0");
        Self {
            receipts: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_sequence: 1,
            head_hash: [0u8; 32],
        }
    }

    /// Seal a new receipt onto the chain and return a copy of it.
    pub fn append(
        &mut self,
        kind: ReceiptKind,
        account: AccountId,
        amount: Amount,
        balance_after: Amount,
        unlock_time: TimePoint,
        committed_at: TimePoint,
    ) -> CustodyReceipt {
        let receipt = CustodyReceipt::sealed(
            self.next_sequence,
            kind,
            account,
            amount,
            balance_after,
            unlock_time,
            committed_at,
            self.head_hash,
        );

        if self.receipts.len() >= self.capacity {
            self.receipts.pop_front();
        }

        self.next_sequence += 1;
        self.head_hash = receipt.hash;
        self.receipts.push_back(receipt.clone());
        receipt
    }

    /// Look up a retained receipt by sequence number.
    #[must_use]
    pub fn get(&self, sequence: u64) -> Option<&CustodyReceipt> {
        let first = self.receipts.front()?.sequence;
        let idx = usize::try_from(sequence.checked_sub(first)?).ok()?;
        self.receipts.get(idx)
    }

    /// Retained receipts, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &CustodyReceipt> {
        self.receipts.iter()
    }

    /// Hash of the latest receipt (all zeros before the first append).
    #[must_use]
    pub fn head_hash(&self) -> [u8; 32] {
        self.head_hash
    }

    /// Number of receipts ever appended.
    #[must_use]
    pub fn total_appended(&self) -> u64 {
        self.next_sequence - 1
    }

    /// Number of receipts currently retained.
    #[must_use]
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }

    /// Recompute every retained hash and check the links between them.
    ///
    /// # Errors
    /// Returns [`LockboxError::JournalCorrupted`] naming the first receipt
    /// whose hash or link does not check out.
    pub fn verify_chain(&self) -> Result<()> {
        let mut prev: Option<&CustodyReceipt> = None;
        for receipt in &self.receipts {
            let linked = prev.is_none_or(|p| {
                p.hash == receipt.prev_hash && p.sequence + 1 == receipt.sequence
            });
            if !linked || !receipt.is_intact() {
                return Err(LockboxError::JournalCorrupted {
                    sequence: receipt.sequence,
                });
            }
            prev = Some(receipt);
        }
        if let Some(last) = prev {
            if last.hash != self.head_hash {
                return Err(LockboxError::JournalCorrupted {
                    sequence: last.sequence,
                });
            }
        }
        Ok(())
    }
}
