use ctc_crypto::ContentHasher;
use ctc_store::KvStore;
use ctc_types::{Batch, BatchHash, CommittedBatch};
use tracing::{debug, info, warn};

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};

/// Appends batches to the chain and moves the head pointer.
///
/// Holds no chain state of its own: every operation reads what it needs from
/// the store it is handed, so one ledger can serve any number of stores or
/// transactions.
#[derive(Clone, Debug)]
pub struct BatchLedger {
    config: LedgerConfig,
}

impl BatchLedger {
    /// Create a ledger over the given layout.
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Hash of the newest record, or `None` if the chain is empty.
    pub fn head<S: KvStore + ?Sized>(&self, store: &S) -> LedgerResult<Option<BatchHash>> {
        read_head(&self.config, store)
    }

    /// Fetch one record by hash, checking that its bytes hash to `hash`.
    pub fn get<S: KvStore + ?Sized>(
        &self,
        store: &S,
        hash: &BatchHash,
    ) -> LedgerResult<Option<CommittedBatch>> {
        let key = self.config.record_key(hash);
        match store.get(&key)? {
            Some(raw) => decode_record(&key, hash, &raw).map(Some),
            None => Ok(None),
        }
    }

    /// Decode a submitted batch and append it to the chain.
    ///
    /// Nothing is read or written when `bytes` do not decode.
    pub fn commit<S: KvStore + ?Sized>(&self, store: &mut S, bytes: &[u8]) -> LedgerResult<BatchHash> {
        let batch = Batch::from_slice(bytes).map_err(|e| LedgerError::Decode(e.to_string()))?;
        self.commit_batch(store, batch)
    }

    /// Append an already decoded batch, linking it to the current head.
    ///
    /// The record is written before the head so the head never names a
    /// missing record.
    pub fn commit_batch<S: KvStore + ?Sized>(
        &self,
        store: &mut S,
        batch: Batch,
    ) -> LedgerResult<BatchHash> {
        let prev = read_head(&self.config, store)?;

        if self.config.enforce_continuity {
            if let Some(prev_hash) = prev {
                self.check_continuity(store, &prev_hash, &batch)?;
            }
        }

        let tx_count = batch.transactions.len();
        let record = CommittedBatch::link(batch, prev);
        let (hash, bytes) = ContentHasher::BATCH
            .seal(&record)
            .map_err(|e| LedgerError::Serialization(e.to_string()))?;

        store.put(&self.config.record_key(&hash), bytes)?;
        store.put(&self.config.head_key, hash.to_hex().into_bytes())?;

        info!(
            hash = %hash.short_hex(),
            prev = %prev.map(|p| p.short_hex()).unwrap_or_else(|| "genesis".into()),
            transactions = tx_count,
            "committed batch"
        );
        Ok(hash)
    }

    /// Forget the chain by deleting the head pointer.
    ///
    /// Records stay in the store but become unreachable. Resetting an empty
    /// chain succeeds.
    pub fn reset<S: KvStore + ?Sized>(&self, store: &mut S) -> LedgerResult<()> {
        store.delete(&self.config.head_key)?;
        info!(head_key = %self.config.head_key, "reset chain head");
        Ok(())
    }

    fn check_continuity<S: KvStore + ?Sized>(
        &self,
        store: &S,
        head: &BatchHash,
        batch: &Batch,
    ) -> LedgerResult<()> {
        let key = self.config.record_key(head);
        let head_record = self
            .get(store, head)?
            .ok_or_else(|| dangling(&key))?;

        if head_record.new_state_hash != batch.prev_state_hash {
            warn!(
                head = %head.short_hex(),
                "batch prior state does not continue from head"
            );
            return Err(LedgerError::Continuity {
                expected: hex::encode(&head_record.new_state_hash),
                found: hex::encode(&batch.prev_state_hash),
            });
        }
        Ok(())
    }
}

/// Read and parse the head pointer.
pub(crate) fn read_head<S: KvStore + ?Sized>(
    config: &LedgerConfig,
    store: &S,
) -> LedgerResult<Option<BatchHash>> {
    let Some(bytes) = store.get(&config.head_key)? else {
        debug!(head_key = %config.head_key, "chain is empty");
        return Ok(None);
    };
    match parse_head(&bytes) {
        Ok(hash) => {
            debug!(head = %hash.short_hex(), "read chain head");
            Ok(Some(hash))
        }
        Err(reason) => {
            warn!(head_key = %config.head_key, %reason, "unparsable chain head");
            Err(LedgerError::corrupt(&config.head_key, reason))
        }
    }
}

/// Parse a head pointer value: the UTF-8 hex of a record hash.
pub(crate) fn parse_head(bytes: &[u8]) -> Result<BatchHash, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| format!("head is not UTF-8: {e}"))?;
    BatchHash::from_hex(text).map_err(|e| format!("head is not a batch hash: {e}"))
}

/// Verify stored bytes against the hash that led to them, then decode.
pub(crate) fn decode_record(
    key: &str,
    hash: &BatchHash,
    raw: &[u8],
) -> LedgerResult<CommittedBatch> {
    if !ContentHasher::BATCH.verify(raw, hash) {
        warn!(key, "stored record does not hash to its key");
        return Err(LedgerError::corrupt(
            key,
            format!("stored bytes hash to {}", ContentHasher::BATCH.hash(raw)),
        ));
    }
    CommittedBatch::from_slice(raw).map_err(|e| {
        warn!(key, error = %e, "undecodable record");
        LedgerError::corrupt(key, format!("undecodable record: {e}"))
    })
}

pub(crate) fn dangling(key: &str) -> LedgerError {
    warn!(key, "link names a record that is not stored");
    LedgerError::corrupt(key, "dangling link: no record stored under this key")
}
