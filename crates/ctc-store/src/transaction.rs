use std::cell::RefCell;
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::StoreResult;
use crate::traits::{KvStore, Version, VersionedStore};

/// A single buffered mutation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOp {
    Put(Vec<u8>),
    Delete,
}

/// Versions observed by a unit of work, keyed by store key.
///
/// Only the first observation of a key is kept: that is the version the unit
/// of work based its decisions on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReadSet {
    versions: BTreeMap<String, Version>,
}

impl ReadSet {
    pub fn record(&mut self, key: &str, version: Version) {
        self.versions.entry(key.to_string()).or_insert(version);
    }

    pub fn version(&self, key: &str) -> Option<Version> {
        self.versions.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Version)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}

/// Buffered writes of a unit of work, in first-write order.
///
/// Writing a key twice replaces the earlier operation in place, so the set
/// holds at most one operation per key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteSet {
    ops: Vec<(String, WriteOp)>,
}

impl WriteSet {
    pub fn put(&mut self, key: &str, value: Vec<u8>) {
        self.insert(key, WriteOp::Put(value));
    }

    pub fn delete(&mut self, key: &str) {
        self.insert(key, WriteOp::Delete);
    }

    fn insert(&mut self, key: &str, op: WriteOp) {
        match self.ops.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = op,
            None => self.ops.push((key.to_string(), op)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&WriteOp> {
        self.ops.iter().find(|(k, _)| k == key).map(|(_, op)| op)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &WriteOp)> {
        self.ops.iter().map(|(k, op)| (k.as_str(), op))
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// One unit of work against a [`VersionedStore`].
///
/// Reads go to the backend (or to this transaction's own pending writes) and
/// record the version they observed. Writes are buffered until
/// [`Transaction::commit`], which hands both sets to
/// [`VersionedStore::apply`]. Dropping a transaction discards its writes.
pub struct Transaction<'a, S: VersionedStore + ?Sized> {
    store: &'a S,
    reads: RefCell<ReadSet>,
    writes: WriteSet,
}

impl<'a, S: VersionedStore + ?Sized> Transaction<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            reads: RefCell::new(ReadSet::default()),
            writes: WriteSet::default(),
        }
    }

    /// Snapshot of the versions observed so far.
    pub fn reads(&self) -> ReadSet {
        self.reads.borrow().clone()
    }

    pub fn writes(&self) -> &WriteSet {
        &self.writes
    }

    /// Apply buffered writes atomically.
    ///
    /// A transaction with no writes commits trivially.
    pub fn commit(self) -> StoreResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }
        let reads = self.reads.into_inner();
        debug!(
            reads = reads.len(),
            writes = self.writes.len(),
            "applying unit of work"
        );
        self.store.apply(&reads, &self.writes)
    }
}

impl<S: VersionedStore + ?Sized> KvStore for Transaction<'_, S> {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        if let Some(op) = self.writes.get(key) {
            return Ok(match op {
                WriteOp::Put(value) => Some(value.clone()),
                WriteOp::Delete => None,
            });
        }
        let versioned = self.store.read_versioned(key)?;
        self.reads.borrow_mut().record(key, versioned.version);
        Ok(versioned.value)
    }

    fn put(&mut self, key: &str, value: Vec<u8>) -> StoreResult<()> {
        self.writes.put(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> StoreResult<()> {
        self.writes.delete(key);
        Ok(())
    }
}
