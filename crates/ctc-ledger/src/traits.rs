use ctc_types::{Batch, BatchHash, CommittedBatch};

use crate::error::LedgerError;
use crate::validation::ValidationReport;
use crate::walker::History;

/// Write boundary for chain mutations. Each call is one unit of work.
pub trait ChainWriter: Send + Sync {
    fn commit(&self, bytes: &[u8]) -> Result<BatchHash, LedgerError>;

    fn commit_batch(&self, batch: Batch) -> Result<BatchHash, LedgerError>;

    fn reset(&self) -> Result<(), LedgerError>;
}

/// Read boundary for chain queries.
pub trait ChainReader: Send + Sync {
    fn head(&self) -> Result<Option<BatchHash>, LedgerError>;

    fn get(&self, hash: &BatchHash) -> Result<Option<CommittedBatch>, LedgerError>;

    fn history(&self) -> Result<History, LedgerError>;

    fn validate(&self) -> Result<ValidationReport, LedgerError>;
}
