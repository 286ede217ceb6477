use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::BatchHash;

/// One transaction carried inside a batch.
///
/// The chain treats this as opaque data: it is hashed and linked but never
/// interpreted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Name of the system the transaction originated from.
    pub chaincode_name: String,
    /// Name of the invoked operation.
    pub transaction_name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub args: Vec<String>,
}

impl TransactionRecord {
    pub fn new(
        chaincode_name: impl Into<String>,
        transaction_name: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            chaincode_name: chaincode_name.into(),
            transaction_name: transaction_name.into(),
            args,
        }
    }
}

/// A batch as submitted by a caller, before it is linked into the chain.
///
/// State fingerprints travel as hex strings. A missing or `null` fingerprint
/// decodes as empty, which is what a genesis batch usually carries as its
/// prior state. A `null` transaction list decodes as empty; an absent one is
/// an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    /// Unix seconds.
    pub timestamp: i64,
    #[serde(deserialize_with = "null_as_empty")]
    pub transactions: Vec<TransactionRecord>,
    #[serde(default, with = "hex_bytes")]
    pub prev_state_hash: Vec<u8>,
    #[serde(default, with = "hex_bytes")]
    pub new_state_hash: Vec<u8>,
}

impl Batch {
    /// Decode a submitted batch from its JSON wire form.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Encode to the JSON wire form.
    pub fn to_vec(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

/// The durable, chain-linked form of a [`Batch`].
///
/// Field order is part of the canonical encoding: the JSON produced by
/// [`CommittedBatch::canonical_bytes`] is both the stored value and the input
/// to the content hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedBatch {
    pub timestamp: i64,
    pub transactions: Vec<TransactionRecord>,
    #[serde(with = "hex_bytes")]
    pub prev_state_hash: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub new_state_hash: Vec<u8>,
    /// Hash of the preceding record; `None` for the genesis record.
    pub prev_batch_hash: Option<BatchHash>,
}

impl CommittedBatch {
    /// Link a submitted batch to its predecessor.
    pub fn link(batch: Batch, prev_batch_hash: Option<BatchHash>) -> Self {
        Self {
            timestamp: batch.timestamp,
            transactions: batch.transactions,
            prev_state_hash: batch.prev_state_hash,
            new_state_hash: batch.new_state_hash,
            prev_batch_hash,
        }
    }

    /// Returns `true` if this record starts the chain.
    pub fn is_genesis(&self) -> bool {
        self.prev_batch_hash.is_none()
    }

    /// Canonical byte encoding used for storage and hashing.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a record previously produced by [`Self::canonical_bytes`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Serde adapter carrying byte fields as hex strings. `null` reads as empty.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<T, S>(bytes: T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: AsRef<[u8]>,
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) => hex::decode(&s).map_err(serde::de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_batch() -> Batch {
        Batch {
            timestamp: 1_700_000_000,
            transactions: vec![TransactionRecord::new(
                "asset",
                "transfer",
                vec!["alice".into(), "bob".into(), "10".into()],
            )],
            prev_state_hash: vec![],
            new_state_hash: vec![0x51, 0x01],
        }
    }

    #[test]
    fn batch_decodes_from_wire_names() {
        let json = br#"{
            "timestamp": 42,
            "transactions": [
                {"chaincodeName": "cc", "transactionName": "put", "args": ["k", "v"]}
            ],
            "prevStateHash": "",
            "newStateHash": "0a0b"
        }"#;
        let batch = Batch::from_slice(json).unwrap();
        assert_eq!(batch.timestamp, 42);
        assert_eq!(batch.transactions[0].chaincode_name, "cc");
        assert_eq!(batch.transactions[0].args, vec!["k", "v"]);
        assert!(batch.prev_state_hash.is_empty());
        assert_eq!(batch.new_state_hash, vec![0x0a, 0x0b]);
    }

    #[test]
    fn missing_fingerprints_default_to_empty() {
        let batch = Batch::from_slice(br#"{"timestamp": 1, "transactions": []}"#).unwrap();
        assert!(batch.prev_state_hash.is_empty());
        assert!(batch.new_state_hash.is_empty());
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let json = br#"{
            "timestamp": 7,
            "transactions": null,
            "prevStateHash": null,
            "newStateHash": null
        }"#;
        let batch = Batch::from_slice(json).unwrap();
        assert!(batch.transactions.is_empty());
        assert!(batch.prev_state_hash.is_empty());
        assert!(batch.new_state_hash.is_empty());

        let json = br#"{
            "timestamp": 7,
            "transactions": [{"chaincodeName": "cc", "transactionName": "init", "args": null}]
        }"#;
        let batch = Batch::from_slice(json).unwrap();
        assert!(batch.transactions[0].args.is_empty());

        let record = CommittedBatch::link(batch, None);
        let json: serde_json::Value =
            serde_json::from_slice(&record.canonical_bytes().unwrap()).unwrap();
        assert_eq!(json["transactions"][0]["args"], serde_json::json!([]));
        assert_eq!(json["prevStateHash"], "");
    }

    #[test]
    fn malformed_batch_is_rejected() {
        assert!(Batch::from_slice(b"not json").is_err());
        assert!(Batch::from_slice(br#"{"timestamp": "soon", "transactions": []}"#).is_err());
        assert!(Batch::from_slice(br#"{"transactions": []}"#).is_err());
        assert!(Batch::from_slice(
            br#"{"timestamp": 1, "transactions": [], "newStateHash": "zz"}"#
        )
        .is_err());
    }

    #[test]
    fn genesis_link_serializes_as_null() {
        let record = CommittedBatch::link(sample_batch(), None);
        assert!(record.is_genesis());
        let json: serde_json::Value =
            serde_json::from_slice(&record.canonical_bytes().unwrap()).unwrap();
        assert!(json["prevBatchHash"].is_null());
        assert_eq!(json["newStateHash"], "5101");
    }

    #[test]
    fn link_copies_batch_fields() {
        let prev = BatchHash::from_hash([9; 32]);
        let batch = sample_batch();
        let record = CommittedBatch::link(batch.clone(), Some(prev));
        assert_eq!(record.timestamp, batch.timestamp);
        assert_eq!(record.transactions, batch.transactions);
        assert_eq!(record.prev_state_hash, batch.prev_state_hash);
        assert_eq!(record.new_state_hash, batch.new_state_hash);
        assert_eq!(record.prev_batch_hash, Some(prev));
        assert!(!record.is_genesis());
    }

    #[test]
    fn canonical_field_order_is_fixed() {
        let record = CommittedBatch::link(sample_batch(), None);
        let text = String::from_utf8(record.canonical_bytes().unwrap()).unwrap();
        let order = [
            "\"timestamp\"",
            "\"transactions\"",
            "\"prevStateHash\"",
            "\"newStateHash\"",
            "\"prevBatchHash\"",
        ];
        let positions: Vec<usize> = order.iter().map(|k| text.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    fn arb_record() -> impl Strategy<Value = CommittedBatch> {
        (
            any::<i64>(),
            prop::collection::vec(
                ("[a-z]{1,8}", "[a-zA-Z]{1,8}", prop::collection::vec(".{0,6}", 0..4)),
                0..4,
            ),
            prop::collection::vec(any::<u8>(), 0..33),
            prop::collection::vec(any::<u8>(), 0..33),
            prop::option::of(any::<[u8; 32]>()),
        )
            .prop_map(|(timestamp, txs, prev_state, new_state, prev)| CommittedBatch {
                timestamp,
                transactions: txs
                    .into_iter()
                    .map(|(cc, name, args)| TransactionRecord::new(cc, name, args))
                    .collect(),
                prev_state_hash: prev_state,
                new_state_hash: new_state,
                prev_batch_hash: prev.map(BatchHash::from_hash),
            })
    }

    proptest! {
        #[test]
        fn canonical_bytes_are_stable(record in arb_record()) {
            let first = record.canonical_bytes().unwrap();
            let second = record.clone().canonical_bytes().unwrap();
            prop_assert_eq!(&first, &second);

            let decoded = CommittedBatch::from_slice(&first).unwrap();
            prop_assert_eq!(&decoded, &record);
            prop_assert_eq!(decoded.canonical_bytes().unwrap(), first);
        }
    }
}
