//! Key-value storage for the canonical transaction chain.
//!
//! The chain core only ever talks to a [`KvStore`]: get, put and delete by
//! opaque text key. Hosts that provide transactional world state plug in
//! through [`VersionedStore`], whose [`Transaction`] buffers a unit of work,
//! records the version of every key it read, and applies everything in one
//! step only if none of those keys moved.
//!
//! # Storage Backends
//!
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileKvStore`] -- single JSON file, atomically replaced per unit of work
//!
//! # Design Rules
//!
//! 1. A unit of work is all-or-nothing: no reader observes half of it.
//! 2. Every write bumps the key's version, deletes included.
//! 3. A unit of work whose reads went stale is rejected with
//!    [`StoreError::Conflict`]; retrying is the host's decision.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;
pub mod transaction;

// Re-export primary types at crate root for ergonomic imports.
pub use error::{StoreError, StoreResult};
pub use file::FileKvStore;
pub use memory::InMemoryKvStore;
pub use traits::{KvStore, Version, Versioned, VersionedStore};
pub use transaction::{ReadSet, Transaction, WriteOp, WriteSet};
