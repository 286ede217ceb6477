use ctc_types::BatchHash;
use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Store layout and safety limits for a chain.
///
/// Key names are configuration so that several chains, or a test, can share
/// one store under separate namespaces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Key holding the hex hash of the newest record.
    pub head_key: String,
    /// Prepended to the hex hash to form a record's key.
    pub record_prefix: String,
    /// Upper bound on records visited by a single walk.
    pub max_history_depth: u64,
    /// Reject batches whose prior state differs from the head's new state.
    pub enforce_continuity: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            head_key: Self::DEFAULT_HEAD_KEY.to_string(),
            record_prefix: String::new(),
            max_history_depth: Self::DEFAULT_MAX_HISTORY_DEPTH,
            enforce_continuity: false,
        }
    }
}

impl LedgerConfig {
    pub const DEFAULT_HEAD_KEY: &'static str = "latestBatchHash";
    pub const DEFAULT_MAX_HISTORY_DEPTH: u64 = 1_000_000;

    pub fn with_head_key(mut self, key: impl Into<String>) -> Self {
        self.head_key = key.into();
        self
    }

    pub fn with_record_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.record_prefix = prefix.into();
        self
    }

    pub fn with_max_history_depth(mut self, depth: u64) -> Self {
        self.max_history_depth = depth;
        self
    }

    pub fn with_continuity(mut self, enforce: bool) -> Self {
        self.enforce_continuity = enforce;
        self
    }

    /// Store key of the record with the given hash.
    pub fn record_key(&self, hash: &BatchHash) -> String {
        format!("{}{}", self.record_prefix, hash.to_hex())
    }

    /// Reject layouts where the head key could collide with a record key.
    pub fn validate(&self) -> LedgerResult<()> {
        if self.head_key.is_empty() {
            return Err(LedgerError::InvalidConfig("head_key is empty".into()));
        }
        if self.max_history_depth == 0 {
            return Err(LedgerError::InvalidConfig(
                "max_history_depth must be at least 1".into(),
            ));
        }
        if let Some(rest) = self.head_key.strip_prefix(self.record_prefix.as_str()) {
            if BatchHash::from_hex(rest).is_ok() {
                return Err(LedgerError::InvalidConfig(format!(
                    "head_key {:?} is shaped like a record key",
                    self.head_key
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = LedgerConfig::default();
        assert_eq!(c.head_key, "latestBatchHash");
        assert!(c.record_prefix.is_empty());
        assert_eq!(c.max_history_depth, 1_000_000);
        assert!(!c.enforce_continuity);
        c.validate().unwrap();
    }

    #[test]
    fn record_key_is_prefix_plus_hex() {
        let hash = BatchHash::from_hash([0xab; 32]);
        assert_eq!(LedgerConfig::default().record_key(&hash), hash.to_hex());

        let namespaced = LedgerConfig::default().with_record_prefix("batch/");
        assert_eq!(namespaced.record_key(&hash), format!("batch/{}", hash.to_hex()));
    }

    #[test]
    fn builders_override_fields() {
        let c = LedgerConfig::default()
            .with_head_key("chain-a/head")
            .with_record_prefix("chain-a/")
            .with_max_history_depth(10)
            .with_continuity(true);
        assert_eq!(c.head_key, "chain-a/head");
        assert_eq!(c.record_prefix, "chain-a/");
        assert_eq!(c.max_history_depth, 10);
        assert!(c.enforce_continuity);
        c.validate().unwrap();
    }

    #[test]
    fn empty_head_key_is_rejected() {
        let err = LedgerConfig::default().with_head_key("").validate().unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn zero_depth_is_rejected() {
        let err = LedgerConfig::default()
            .with_max_history_depth(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn head_key_shaped_like_record_key_is_rejected() {
        let hex = BatchHash::from_hash([1; 32]).to_hex();
        let err = LedgerConfig::default()
            .with_head_key(hex)
            .validate()
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidConfig(_)));
    }

    #[test]
    fn partial_config_fills_defaults() {
        let c: LedgerConfig = serde_json::from_str(r#"{"head_key": "tip"}"#).unwrap();
        assert_eq!(c.head_key, "tip");
        assert_eq!(c.max_history_depth, LedgerConfig::DEFAULT_MAX_HISTORY_DEPTH);
    }
}
