//! Core chain logic for the canonical transaction chain (CTC).
//!
//! This crate is the heart of CTC. It provides:
//! - `BatchLedger`: decode, link, hash and store a batch, then advance the head
//! - `ChainWalker`: backward traversal from the head to genesis
//! - `ChainValidator`: integrity report over the reachable chain
//! - `ChainService`: one transaction per call over a `VersionedStore`
//! - `ChainWriter` / `ChainReader` trait boundaries
//!
//! Store layout is set by [`LedgerConfig`]; with the defaults the head lives
//! under `latestBatchHash` and each record under the hex of its hash.

pub mod config;
pub mod error;
pub mod ledger;
pub mod service;
pub mod traits;
pub mod validation;
pub mod walker;

pub use config::LedgerConfig;
pub use error::{ErrorKind, LedgerError, LedgerResult};
pub use ledger::BatchLedger;
pub use service::ChainService;
pub use traits::{ChainReader, ChainWriter};
pub use validation::{ChainValidator, ValidationReport, Violation, ViolationKind};
pub use walker::{ChainWalker, History, HistoryEntry};
