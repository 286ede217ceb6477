use ctc_types::BatchHash;

use crate::hasher::ContentHasher;

/// A record that participates in a backward-linked hash chain.
pub trait ChainLink {
    /// The key the record was found under.
    fn batch_hash(&self) -> BatchHash;
    /// Hash of the preceding record (None for genesis).
    fn prev_batch_hash(&self) -> Option<BatchHash>;
    /// The exact bytes the record was stored as.
    fn stored_bytes(&self) -> &[u8];
}

/// Hash chain integrity verifier.
///
/// Works on sequences ordered newest-first, the order a backward walk from
/// the head produces them in.
pub struct HashChainVerifier;

impl HashChainVerifier {
    /// Verify a newest-first chain of records.
    ///
    /// Checks:
    /// 1. Each record's stored bytes hash to its key
    /// 2. Each record links to the record after it in the slice
    /// 3. The oldest record has no previous hash
    pub fn verify_chain(records: &[impl ChainLink]) -> Result<(), ChainError> {
        match Self::find_breaks(records, true).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Collect every integrity break instead of stopping at the first.
    ///
    /// With `complete == false` the slice is a prefix of a longer chain, so
    /// the oldest record is allowed to carry a previous hash.
    pub fn find_breaks(records: &[impl ChainLink], complete: bool) -> Vec<ChainError> {
        let mut breaks = Vec::new();

        for (index, record) in records.iter().enumerate() {
            if !ContentHasher::BATCH.verify(record.stored_bytes(), &record.batch_hash()) {
                breaks.push(ChainError::HashMismatch { index });
            }

            match (record.prev_batch_hash(), records.get(index + 1)) {
                (Some(prev), Some(older)) if prev == older.batch_hash() => {}
                (Some(_), Some(_)) => breaks.push(ChainError::BrokenLink { index }),
                (None, Some(_)) => breaks.push(ChainError::MissingPrevHash { index }),
                (Some(_), None) if complete => breaks.push(ChainError::GenesisHasPrevHash),
                (Some(_), None) | (None, None) => {}
            }
        }

        breaks
    }
}

/// Errors from chain verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChainError {
    #[error("oldest record has a previous hash (should be None)")]
    GenesisHasPrevHash,

    #[error("broken link at index {index}: prev_batch_hash does not match the older record")]
    BrokenLink { index: usize },

    #[error("missing prev_batch_hash at index {index} (should reference the older record)")]
    MissingPrevHash { index: usize },

    #[error("hash mismatch at index {index}: stored bytes do not hash to their key")]
    HashMismatch { index: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestRecord {
        hash: BatchHash,
        prev: Option<BatchHash>,
        bytes: Vec<u8>,
    }

    impl ChainLink for TestRecord {
        fn batch_hash(&self) -> BatchHash {
            self.hash
        }
        fn prev_batch_hash(&self) -> Option<BatchHash> {
            self.prev
        }
        fn stored_bytes(&self) -> &[u8] {
            &self.bytes
        }
    }

    /// Build `count` records and return them newest-first.
    fn build_chain(count: usize) -> Vec<TestRecord> {
        let mut chain = Vec::new();
        let mut prev = None;

        for i in 0..count {
            let bytes = format!("record-{i}").into_bytes();
            let hash = ContentHasher::BATCH.hash(&bytes);
            chain.push(TestRecord { hash, prev, bytes });
            prev = Some(hash);
        }

        chain.reverse();
        chain
    }

    #[test]
    fn empty_chain_is_valid() {
        let chain: Vec<TestRecord> = vec![];
        assert!(HashChainVerifier::verify_chain(&chain).is_ok());
    }

    #[test]
    fn single_record_chain() {
        assert!(HashChainVerifier::verify_chain(&build_chain(1)).is_ok());
    }

    #[test]
    fn multi_record_chain() {
        assert!(HashChainVerifier::verify_chain(&build_chain(10)).is_ok());
    }

    #[test]
    fn genesis_with_prev_hash_fails() {
        let mut chain = build_chain(2);
        chain[1].prev = Some(BatchHash::from_hash([1; 32]));
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::GenesisHasPrevHash);
    }

    #[test]
    fn broken_link_detected() {
        let mut chain = build_chain(3);
        chain[0].prev = Some(BatchHash::from_hash([99; 32]));
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::BrokenLink { index: 0 });
    }

    #[test]
    fn missing_prev_hash_detected() {
        let mut chain = build_chain(3);
        chain[1].prev = None;
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::MissingPrevHash { index: 1 });
    }

    #[test]
    fn truncated_prefix_is_accepted_when_incomplete() {
        let chain = build_chain(4);
        let prefix = &chain[..2];
        assert!(HashChainVerifier::find_breaks(prefix, false).is_empty());
        assert_eq!(
            HashChainVerifier::find_breaks(prefix, true),
            vec![ChainError::GenesisHasPrevHash]
        );
    }

    #[test]
    fn find_breaks_reports_every_tampered_record() {
        let mut chain = build_chain(4);
        chain[0].bytes = b"x".to_vec();
        chain[2].bytes = b"y".to_vec();
        assert_eq!(
            HashChainVerifier::find_breaks(&chain, true),
            vec![
                ChainError::HashMismatch { index: 0 },
                ChainError::HashMismatch { index: 2 },
            ]
        );
    }

    #[test]
    fn tampered_bytes_detected() {
        let mut chain = build_chain(3);
        chain[1].bytes = b"tampered".to_vec();
        let err = HashChainVerifier::verify_chain(&chain).unwrap_err();
        assert_eq!(err, ChainError::HashMismatch { index: 1 });
    }
}
