use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Content hash of a committed batch.
///
/// A `BatchHash` is the 32-byte digest of a record's canonical bytes. It is
/// rendered as 64 lowercase hex characters wherever it leaves memory: as the
/// record's store key, as the head pointer value, and as the `prevBatchHash`
/// link of the following record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BatchHash([u8; 32]);

impl BatchHash {
    /// Byte length of a batch hash.
    pub const LEN: usize = 32;

    /// Create a `BatchHash` from a pre-computed digest.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse from a hex string. Accepts either case.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Parse from a raw byte slice of exactly [`Self::LEN`] bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| TypeError::InvalidLength {
            expected: Self::LEN,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for BatchHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BatchHash({})", self.short_hex())
    }
}

impl fmt::Display for BatchHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for BatchHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.trim())
    }
}

impl From<[u8; 32]> for BatchHash {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<BatchHash> for [u8; 32] {
    fn from(hash: BatchHash) -> Self {
        hash.0
    }
}

impl Serialize for BatchHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BatchHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let hash = BatchHash::from_hash([0xab; 32]);
        let parsed = BatchHash::from_hex(&hash.to_hex()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn hex_is_lowercase_and_64_chars() {
        let hash = BatchHash::from_hash([0xcd; 32]);
        let hex = hash.to_hex();
        assert_eq!(hex.len(), 64);
        assert_eq!(hex, hex.to_lowercase());
        assert_eq!(format!("{hash}"), hex);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let hash = BatchHash::from_hash([0xef; 32]);
        let parsed = BatchHash::from_hex(&hash.to_hex().to_uppercase()).unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn wrong_length_is_rejected() {
        let err = BatchHash::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn non_hex_is_rejected() {
        let err = BatchHash::from_hex("not-hex").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn from_str_trims_whitespace() {
        let hash = BatchHash::from_hash([1; 32]);
        let parsed: BatchHash = format!("  {}\n", hash.to_hex()).parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = BatchHash::from_hash([2; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", hash.to_hex()));
        let parsed: BatchHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn debug_uses_short_hex() {
        let hash = BatchHash::from_hash([0x12; 32]);
        assert_eq!(format!("{hash:?}"), "BatchHash(12121212)");
    }
}
