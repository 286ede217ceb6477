use ctc_types::{BatchHash, CommittedBatch};

/// Domain-separated BLAKE3 content hasher.
///
/// Each hasher carries a domain tag (e.g., `"ctc-batch-v1"`) that is
/// prepended to every hash computation, so bytes hashed under one domain can
/// never collide with the same bytes hashed under another.
pub struct ContentHasher {
    domain: &'static str,
}

impl ContentHasher {
    /// Hasher for committed batch records.
    pub const BATCH: Self = Self {
        domain: "ctc-batch-v1",
    };

    /// Create a hasher with a custom domain tag.
    pub const fn new(domain: &'static str) -> Self {
        Self { domain }
    }

    /// Hash raw bytes with domain separation.
    pub fn hash(&self, data: &[u8]) -> BatchHash {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.domain.as_bytes());
        hasher.update(b":");
        hasher.update(data);
        BatchHash::from_hash(*hasher.finalize().as_bytes())
    }

    /// Canonical bytes of a committed record together with their hash.
    pub fn seal(&self, record: &CommittedBatch) -> Result<(BatchHash, Vec<u8>), HasherError> {
        let bytes = record
            .canonical_bytes()
            .map_err(|e| HasherError::Serialization(e.to_string()))?;
        Ok((self.hash(&bytes), bytes))
    }

    /// Verify that data produces the expected hash.
    pub fn verify(&self, data: &[u8], expected: &BatchHash) -> bool {
        self.hash(data) == *expected
    }

    /// The domain tag used by this hasher.
    pub fn domain(&self) -> &str {
        self.domain
    }
}

/// Errors from hashing operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HasherError {
    #[error("serialization error: {0}")]
    Serialization(String),
}
