use ctc_store::StoreError;

/// Errors produced by ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Submitted batch bytes do not decode into a batch.
    #[error("failed to decode batch: {0}")]
    Decode(String),

    /// The underlying store failed; passed through unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Stored chain data is inconsistent with what this core writes.
    #[error("corrupt chain at {key:?}: {reason}")]
    CorruptChain { key: String, reason: String },

    /// The batch's prior state does not match the head's resulting state.
    #[error("state discontinuity: head produced {expected:?}, batch assumes {found:?}")]
    Continuity { expected: String, found: String },

    #[error("invalid ledger configuration: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Coarse classification of [`LedgerError`] for hosts that branch on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Decode,
    Store,
    CorruptChain,
    Continuity,
    InvalidConfig,
    Serialization,
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Decode(_) => ErrorKind::Decode,
            Self::Store(_) => ErrorKind::Store,
            Self::CorruptChain { .. } => ErrorKind::CorruptChain,
            Self::Continuity { .. } => ErrorKind::Continuity,
            Self::InvalidConfig(_) => ErrorKind::InvalidConfig,
            Self::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns `true` if the host may retry the same unit of work.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_conflict())
    }

    pub(crate) fn corrupt(key: &str, reason: impl Into<String>) -> Self {
        Self::CorruptChain {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
