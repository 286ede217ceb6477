//! Foundation types for the canonical transaction chain (CTC).
//!
//! Every other CTC crate depends on `ctc-types`.
//!
//! # Key Types
//!
//! - [`BatchHash`] -- content hash of a committed record, hex-rendered everywhere
//! - [`TransactionRecord`] -- one opaque transaction inside a batch
//! - [`Batch`] -- a caller-submitted batch and its state transition
//! - [`CommittedBatch`] -- the durable record linked to its predecessor

pub mod batch;
pub mod error;
pub mod hash;

pub use batch::{hex_bytes, Batch, CommittedBatch, TransactionRecord};
pub use error::TypeError;
pub use hash::BatchHash;
