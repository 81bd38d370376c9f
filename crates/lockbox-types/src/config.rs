//! Configuration for a LockBox custody service.

use serde::{Deserialize, Serialize};

use crate::{LockboxError, Result, constants};

/// Tunables for a custody service instance.
///
/// Every field has a default, so a config file only needs to name the
/// values it changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustodyConfig {
    /// Longest lock a single call may request, in milliseconds.
    pub max_lock_duration_ms: i64,
    /// Receipts retained before the oldest are evicted.
    pub journal_capacity: usize,
    /// Re-check supply conservation after every committed mutation and halt
    /// mutations if it fails.
    pub verify_after_commit: bool,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            max_lock_duration_ms: constants::DEFAULT_MAX_LOCK_DURATION_MS,
            journal_capacity: constants::DEFAULT_JOURNAL_CAPACITY,
            verify_after_commit: true,
        }
    }
}

impl CustodyConfig {
    /// Parse and validate a JSON config document.
    ///
    /// # Errors
    /// `Serialization` on malformed JSON, `Configuration` on invalid values.
    pub fn from_json(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    /// Returns `Configuration` if any value is out of range.
    pub fn validate(&self) -> Result<()> {
        if self.max_lock_duration_ms < 0 {
            return Err(LockboxError::Configuration(format!(
                "max_lock_duration_ms must be >= 0, got {}",
                self.max_lock_duration_ms
            )));
        }
        if self.journal_capacity == 0 {
            return Err(LockboxError::Configuration(
                "journal_capacity must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = CustodyConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.journal_capacity, 10_000);
        assert_eq!(cfg.max_lock_duration_ms, i64::MAX);
        assert!(cfg.verify_after_commit);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = CustodyConfig::from_json(r#"{ "journal_capacity": 16 }"#).unwrap();
        assert_eq!(cfg.journal_capacity, 16);
        assert_eq!(cfg.max_lock_duration_ms, i64::MAX);
        assert!(cfg.verify_after_commit);
    }

    #[test]
    fn zero_journal_capacity_rejected() {
        let err = CustodyConfig::from_json(r#"{ "journal_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, LockboxError::Configuration(_)));
    }

    #[test]
    fn negative_max_duration_rejected() {
        let cfg = CustodyConfig {
            max_lock_duration_ms: -1,
            ..CustodyConfig::default()
        };
        assert!(matches!(
            cfg.validate().unwrap_err(),
            LockboxError::Configuration(_)
        ));
    }

    #[test]
    fn malformed_json_is_serialization_error() {
        let err = CustodyConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, LockboxError::Serialization(_)));
    }
}
