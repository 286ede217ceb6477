/// Errors from key-value store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A key read by the unit of work changed before it could be applied.
    #[error("write conflict on key {key:?}: read version {expected}, found {found}")]
    Conflict {
        key: String,
        expected: u64,
        found: u64,
    },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Persisted store data is malformed.
    #[error("corrupt store data: {reason}")]
    Corrupt { reason: String },

    /// A backend lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// Failure reported by an external backend.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns `true` if retrying the whole unit of work may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
