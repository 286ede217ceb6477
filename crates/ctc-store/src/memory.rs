use std::collections::HashMap;
use std::sync::RwLock;

use tracing::warn;

use crate::error::{StoreError, StoreResult};
use crate::traits::{KvStore, Versioned, VersionedStore};
use crate::transaction::{ReadSet, WriteOp, WriteSet};

/// In-memory, HashMap-based versioned store.
///
/// Intended for tests and embedding. Entries live behind a `RwLock`; values
/// are cloned on read and write. Deleted keys keep a tombstone so their
/// version keeps increasing.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Versioned>>,
}

impl InMemoryKvStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of keys currently holding a value.
    pub fn len(&self) -> StoreResult<usize> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.values().filter(|e| e.value.is_some()).count())
    }

    /// Returns `true` if no key holds a value.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Sorted list of keys currently holding a value.
    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut keys: Vec<String> = map
            .iter()
            .filter(|(_, e)| e.value.is_some())
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        Ok(keys)
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VersionedStore for InMemoryKvStore {
    fn read_versioned(&self, key: &str) -> StoreResult<Versioned> {
        let map = self.entries.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(map.get(key).cloned().unwrap_or_default())
    }

    fn apply(&self, reads: &ReadSet, writes: &WriteSet) -> StoreResult<()> {
        let mut map = self.entries.write().map_err(|_| StoreError::LockPoisoned)?;
        validate_reads(&map, reads)?;
        install_writes(&mut map, writes);
        Ok(())
    }
}

/// Direct access outside a transaction: every call is its own unit of work.
impl KvStore for InMemoryKvStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.read_versioned(key)?.value)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        let mut writes = WriteSet::default();
        writes.put(key, value);
        self.apply(&ReadSet::default(), &writes)
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        let mut writes = WriteSet::default();
        writes.delete(key);
        self.apply(&ReadSet::default(), &writes)
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len().unwrap_or_default();
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &count)
            .finish()
    }
}

pub(crate) fn validate_reads(
    map: &HashMap<String, Versioned>,
    reads: &ReadSet,
) -> StoreResult<()> {
    for (key, expected) in reads.iter() {
        let found = map.get(key).map(|e| e.version).unwrap_or(0);
        if found != expected {
            warn!(key, expected, found, "read set is stale; rejecting unit of work");
            return Err(StoreError::Conflict {
                key: key.to_string(),
                expected,
                found,
            });
        }
    }
    Ok(())
}

pub(crate) fn install_writes(map: &mut HashMap<String, Versioned>, writes: &WriteSet) {
    for (key, op) in writes.iter() {
        let entry = map.entry(key.to_string()).or_default();
        entry.version += 1;
        entry.value = match op {
            WriteOp::Put(value) => Some(value.clone()),
            WriteOp::Delete => None,
        };
    }
}
