use ctc_crypto::ChainLink;
use ctc_store::KvStore;
use ctc_types::{BatchHash, CommittedBatch};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::{dangling, decode_record, read_head};

/// One record reached by a walk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The hash the record is stored under.
    pub hash: BatchHash,
    pub batch: CommittedBatch,
    /// The exact bytes found in the store.
    pub raw: Vec<u8>,
}

impl ChainLink for HistoryEntry {
    fn batch_hash(&self) -> BatchHash {
        self.hash
    }

    fn prev_batch_hash(&self) -> Option<BatchHash> {
        self.batch.prev_batch_hash
    }

    fn stored_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// The full chain, newest record first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Record hashes, newest first.
    pub fn hashes(&self) -> Vec<BatchHash> {
        self.entries.iter().map(|e| e.hash).collect()
    }

    /// JSON array of the stored records, in walk order.
    ///
    /// Records are emitted exactly as stored, so the output is byte-for-byte
    /// reproducible for an unchanged chain.
    pub fn to_json(&self) -> Vec<u8> {
        let size: usize = self.entries.iter().map(|e| e.raw.len() + 1).sum();
        let mut out = Vec::with_capacity(size + 2);
        out.push(b'[');
        self.join_into(&mut out, b',');
        out.push(b']');
        out
    }

    /// Stored records joined with `;`.
    pub fn to_delimited(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.join_into(&mut out, b';');
        out
    }

    fn join_into(&self, out: &mut Vec<u8>, separator: u8) {
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.extend_from_slice(&entry.raw);
        }
    }
}

impl IntoIterator for History {
    type Item = HistoryEntry;
    type IntoIter = std::vec::IntoIter<HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Follows `prev_batch_hash` links backward from the head.
#[derive(Clone, Debug)]
pub struct ChainWalker {
    config: LedgerConfig,
}

impl ChainWalker {
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Collect the whole chain, newest first.
    ///
    /// An empty chain yields an empty history. Any corruption or store error
    /// aborts the walk; no partial history is returned.
    pub fn history<S: KvStore + ?Sized>(&self, store: &S) -> LedgerResult<History> {
        let mut entries = Vec::new();
        self.walk(store, |entry| {
            entries.push(entry);
            Ok(())
        })?;
        Ok(History { entries })
    }

    /// Visit each record from the head back to genesis.
    ///
    /// Returns the number of records visited. Each record is verified against
    /// the link that led to it before it is handed to `visit`; an error from
    /// `visit` stops the walk and is returned as is.
    pub fn walk<S, F>(&self, store: &S, mut visit: F) -> LedgerResult<u64>
    where
        S: KvStore + ?Sized,
        F: FnMut(HistoryEntry) -> LedgerResult<()>,
    {
        let mut next = read_head(&self.config, store)?;
        let mut steps = 0u64;

        while let Some(hash) = next {
            if steps == self.config.max_history_depth {
                warn!(
                    limit = self.config.max_history_depth,
                    "walk exceeded history depth limit"
                );
                return Err(LedgerError::corrupt(
                    &self.config.head_key,
                    format!(
                        "history exceeds {} records; the chain may contain a cycle",
                        self.config.max_history_depth
                    ),
                ));
            }

            let key = self.config.record_key(&hash);
            let raw = store.get(&key)?.ok_or_else(|| dangling(&key))?;
            let batch = decode_record(&key, &hash, &raw)?;
            debug!(step = steps, hash = %hash.short_hex(), "walked record");

            next = batch.prev_batch_hash;
            visit(HistoryEntry { hash, batch, raw })?;
            steps += 1;
        }

        Ok(steps)
    }
}
