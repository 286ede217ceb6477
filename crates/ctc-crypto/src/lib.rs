//! Cryptographic primitives for the canonical transaction chain.
//!
//! Provides domain-separated BLAKE3 content hashing and verification of
//! backward-linked batch sequences.
//!
//! All crypto operations wrap established libraries; no custom cryptography.

pub mod chain;
pub mod hasher;

pub use chain::{ChainError, ChainLink, HashChainVerifier};
pub use hasher::{ContentHasher, HasherError};
