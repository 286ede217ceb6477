use serde::{Deserialize, Serialize};

use crate::error::StoreResult;
use crate::transaction::{ReadSet, Transaction, WriteSet};

/// Per-key write counter. A key that was never written has version 0.
pub type Version = u64;

/// Byte-oriented key-value store, as supplied by the host.
///
/// Keys are opaque text; no ordering or range scans are assumed. All errors
/// are propagated, never silently ignored.
pub trait KvStore {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if the key is absent.
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Create or overwrite the value under `key`.
    fn put(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()>;

    /// Remove `key`. Removing an absent key succeeds.
    fn delete(&mut self, key: &str) -> StoreResult<()>;
}

/// A value together with the version it was read at.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned {
    pub version: Version,
    /// `None` if the key was never written or has been deleted.
    pub value: Option<Vec<u8>>,
}

impl Versioned {
    /// The state of a key that was never written.
    pub fn absent() -> Self {
        Self::default()
    }
}

/// Backend that can apply a unit of work atomically.
///
/// Implementations must satisfy these invariants:
/// - `apply` validates every read version and installs every write under one
///   critical section; either all writes become visible or none do.
/// - Every put or delete bumps the key's version, so a reader can always
///   detect that a key changed underneath it.
pub trait VersionedStore: Send + Sync {
    /// Read the current value and version of `key`.
    fn read_versioned(&self, key: &str) -> StoreResult<Versioned>;

    /// Validate `reads` against current versions and install `writes`.
    ///
    /// Fails with [`StoreError::Conflict`](crate::StoreError::Conflict) if any
    /// read key has moved on, in which case nothing is written.
    fn apply(&self, reads: &ReadSet, writes: &WriteSet) -> StoreResult<()>;

    /// Start a unit of work against this store.
    fn begin(&self) -> Transaction<'_, Self>
    where
        Self: Sized,
    {
        Transaction::new(self)
    }
}
