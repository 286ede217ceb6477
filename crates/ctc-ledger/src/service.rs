use ctc_store::VersionedStore;
use ctc_types::{Batch, BatchHash, CommittedBatch};
use tracing::warn;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::ledger::BatchLedger;
use crate::traits::{ChainReader, ChainWriter};
use crate::validation::{ChainValidator, ValidationReport};
use crate::walker::{ChainWalker, History};

/// Host-facing entry point: one chain over one versioned store.
///
/// Every call runs in its own [`ctc_store::Transaction`]. A mutation that
/// fails for any reason drops its transaction, so none of its writes become
/// visible. Two mutations that read the same head race; the loser fails with
/// a store conflict (see [`LedgerError::is_conflict`]) and may be retried.
pub struct ChainService<S: VersionedStore> {
    store: S,
    ledger: BatchLedger,
    walker: ChainWalker,
    validator: ChainValidator,
}

impl<S: VersionedStore> ChainService<S> {
    pub fn new(store: S, config: LedgerConfig) -> LedgerResult<Self> {
        Ok(Self {
            store,
            ledger: BatchLedger::new(config.clone())?,
            walker: ChainWalker::new(config.clone())?,
            validator: ChainValidator::new(config)?,
        })
    }

    pub fn config(&self) -> &LedgerConfig {
        self.ledger.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// History rendered as a JSON array of stored records, newest first.
    pub fn history_json(&self) -> LedgerResult<Vec<u8>> {
        Ok(self.history()?.to_json())
    }

    fn mutate<T>(
        &self,
        op: impl FnOnce(&mut ctc_store::Transaction<'_, S>) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut txn = self.store.begin();
        let out = op(&mut txn)?;
        txn.commit().map_err(|e| {
            if e.is_conflict() {
                warn!(error = %e, "chain mutation lost a race");
            }
            LedgerError::from(e)
        })?;
        Ok(out)
    }
}

impl<S: VersionedStore> ChainWriter for ChainService<S> {
    fn commit(&self, bytes: &[u8]) -> LedgerResult<BatchHash> {
        self.mutate(|txn| self.ledger.commit(txn, bytes))
    }

    fn commit_batch(&self, batch: Batch) -> LedgerResult<BatchHash> {
        self.mutate(|txn| self.ledger.commit_batch(txn, batch))
    }

    fn reset(&self) -> LedgerResult<()> {
        self.mutate(|txn| self.ledger.reset(txn))
    }
}

impl<S: VersionedStore> ChainReader for ChainService<S> {
    fn head(&self) -> LedgerResult<Option<BatchHash>> {
        self.ledger.head(&self.store.begin())
    }

    fn get(&self, hash: &BatchHash) -> LedgerResult<Option<CommittedBatch>> {
        self.ledger.get(&self.store.begin(), hash)
    }

    fn history(&self) -> LedgerResult<History> {
        self.walker.history(&self.store.begin())
    }

    fn validate(&self) -> LedgerResult<ValidationReport> {
        self.validator.validate(&self.store.begin())
    }
}

impl<S: VersionedStore + std::fmt::Debug> std::fmt::Debug for ChainService<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainService")
            .field("store", &self.store)
            .field("config", self.ledger.config())
            .finish()
    }
}
