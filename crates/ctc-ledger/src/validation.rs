use ctc_crypto::{ChainError, HashChainVerifier};
use ctc_store::KvStore;
use ctc_types::{BatchHash, CommittedBatch};
use tracing::{debug, warn};

use crate::config::LedgerConfig;
use crate::error::LedgerResult;
use crate::ledger::parse_head;
use crate::walker::HistoryEntry;

/// Result of chain validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidationReport {
    pub head: Option<BatchHash>,
    /// Records that were reached and decoded.
    pub record_count: u64,
    /// The walk reached a genesis record.
    pub complete: bool,
    pub continuity_enforced: bool,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if no violation breaks the chain.
    ///
    /// State discontinuities only count when continuity is enforced.
    pub fn is_valid(&self) -> bool {
        self.violations.iter().all(|v| {
            v.kind == ViolationKind::StateDiscontinuity && !self.continuity_enforced
        })
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// The record the violation was found at; `None` for the head pointer.
    pub hash: Option<BatchHash>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    MalformedHead,
    DanglingLink,
    Undecodable,
    HashMismatch,
    BrokenLink,
    StateDiscontinuity,
    DepthExceeded,
}

/// Chain integrity validator.
///
/// Unlike [`crate::ChainWalker`], which stops at the first problem, this
/// collects every violation it can find. The walk itself still ends at the
/// first record it cannot follow past.
#[derive(Clone, Debug)]
pub struct ChainValidator {
    config: LedgerConfig,
}

impl ChainValidator {
    pub fn new(config: LedgerConfig) -> LedgerResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Validate the chain reachable from the head. Store errors abort.
    pub fn validate<S: KvStore + ?Sized>(&self, store: &S) -> LedgerResult<ValidationReport> {
        let mut report = ValidationReport {
            head: None,
            record_count: 0,
            complete: false,
            continuity_enforced: self.config.enforce_continuity,
            violations: Vec::new(),
        };

        let Some(head_bytes) = store.get(&self.config.head_key)? else {
            report.complete = true;
            return Ok(report);
        };
        let head = match parse_head(&head_bytes) {
            Ok(hash) => hash,
            Err(reason) => {
                report.violations.push(Violation {
                    hash: None,
                    kind: ViolationKind::MalformedHead,
                    description: reason,
                });
                return Ok(finish(report));
            }
        };
        report.head = Some(head);

        let mut entries: Vec<HistoryEntry> = Vec::new();
        let mut next = Some(head);
        while let Some(hash) = next {
            if entries.len() as u64 == self.config.max_history_depth {
                report.violations.push(Violation {
                    hash: Some(hash),
                    kind: ViolationKind::DepthExceeded,
                    description: format!(
                        "walk stopped after {} records",
                        self.config.max_history_depth
                    ),
                });
                break;
            }

            let key = self.config.record_key(&hash);
            let Some(raw) = store.get(&key)? else {
                report.violations.push(Violation {
                    hash: Some(hash),
                    kind: ViolationKind::DanglingLink,
                    description: format!("no record stored under {key}"),
                });
                break;
            };
            let batch = match CommittedBatch::from_slice(&raw) {
                Ok(batch) => batch,
                Err(e) => {
                    report.violations.push(Violation {
                        hash: Some(hash),
                        kind: ViolationKind::Undecodable,
                        description: e.to_string(),
                    });
                    break;
                }
            };
            debug!(step = entries.len(), hash = %hash.short_hex(), "validated record");
            next = batch.prev_batch_hash;
            entries.push(HistoryEntry { hash, batch, raw });
        }

        report.complete = next.is_none();
        report.record_count = entries.len() as u64;

        for brk in HashChainVerifier::find_breaks(&entries, report.complete) {
            report.violations.push(chain_violation(&entries, brk));
        }

        for pair in entries.windows(2) {
            let (newer, older) = (&pair[0], &pair[1]);
            if newer.batch.prev_state_hash != older.batch.new_state_hash {
                report.violations.push(Violation {
                    hash: Some(newer.hash),
                    kind: ViolationKind::StateDiscontinuity,
                    description: format!(
                        "prior state {} does not match predecessor's new state {}",
                        hex::encode(&newer.batch.prev_state_hash),
                        hex::encode(&older.batch.new_state_hash)
                    ),
                });
            }
        }

        Ok(finish(report))
    }
}

fn finish(report: ValidationReport) -> ValidationReport {
    if report.is_valid() {
        debug!(records = report.record_count, "chain is valid");
    } else {
        warn!(
            records = report.record_count,
            violations = report.violations.len(),
            "chain failed validation"
        );
    }
    report
}

fn chain_violation(entries: &[HistoryEntry], brk: ChainError) -> Violation {
    let (index, kind) = match brk {
        ChainError::HashMismatch { index } => (Some(index), ViolationKind::HashMismatch),
        ChainError::BrokenLink { index } | ChainError::MissingPrevHash { index } => {
            (Some(index), ViolationKind::BrokenLink)
        }
        ChainError::GenesisHasPrevHash => (entries.len().checked_sub(1), ViolationKind::BrokenLink),
    };
    Violation {
        hash: index.and_then(|i| entries.get(i)).map(|e| e.hash),
        kind,
        description: brk.to_string(),
    }
}
