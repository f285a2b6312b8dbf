//! # Integrity Verification
//!
//! [`IntegrityVerifier`] recomputes every integrity property of stored
//! events and reports where the stored chain diverges from what its own
//! contents imply.
//!
//! ## Checks, per event
//!
//! 1. The event belongs to the partition being verified.
//! 2. Its sequence is the next expected sequence (no gaps, duplicates or
//!    reordering).
//! 3. Its content hash equals the hash recomputed from its fields.
//! 4. Its previous-chain link equals the preceding record's chain hash.
//! 5. Its chain hash equals SHA-256(content_hash || previous_chain_hash).
//! 6. Its signature verifies under the key it names. An unknown key id is a
//!    failure, never a pass.
//!
//! Findings are reported, logged at `error`, and never repaired.

use std::sync::Arc;

use aigov_core::{ContentDigest, PartitionId, GENESIS_DIGEST};
use aigov_crypto::{verify_chain_signature, KeyProvider};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::event::AuditEvent;
use crate::export::LedgerExport;
use crate::store::PartitionSnapshot;

/// What went wrong at a divergent position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DivergenceKind {
    /// No record is stored at this position.
    MissingEvent,
    /// The record stored here carries a different sequence number.
    SequenceMismatch {
        /// Sequence number found on the record.
        found: u64,
    },
    /// The record belongs to another partition.
    PartitionMismatch {
        /// Partition named on the record.
        found: String,
    },
    /// Recomputed content hash differs from the stored one.
    ContentHashMismatch {
        /// Hash recomputed from the fields.
        recomputed: ContentDigest,
        /// Hash stored on the record.
        stored: ContentDigest,
    },
    /// The record's content cannot be canonicalized any more.
    ContentUnhashable {
        /// Canonicalization error message.
        reason: String,
    },
    /// The record does not link to its predecessor's chain hash.
    BrokenLink {
        /// Chain hash of the preceding record.
        expected: ContentDigest,
        /// Link stored on the record.
        stored: ContentDigest,
    },
    /// Stored chain hash is not SHA-256(content || previous).
    ChainHashMismatch {
        /// Recomputed chain hash.
        recomputed: ContentDigest,
        /// Stored chain hash.
        stored: ContentDigest,
    },
    /// The signature does not verify under the named key.
    SignatureInvalid,
    /// The named key is unknown to the key provider.
    UnknownKey {
        /// The key id on the record.
        key_id: String,
    },
    /// An exported tail does not match the last exported record.
    TailMismatch {
        /// Chain hash recorded as the tail.
        recorded: ContentDigest,
        /// Chain hash of the record at the tail sequence.
        found: ContentDigest,
    },
}

impl std::fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingEvent => f.write_str("event missing"),
            Self::SequenceMismatch { found } => write!(f, "record carries sequence {found}"),
            Self::PartitionMismatch { found } => write!(f, "record belongs to partition {found}"),
            Self::ContentHashMismatch { recomputed, stored } => {
                write!(f, "content hash mismatch: recomputed {recomputed}, stored {stored}")
            }
            Self::ContentUnhashable { reason } => write!(f, "content not canonicalizable: {reason}"),
            Self::BrokenLink { expected, stored } => {
                write!(f, "broken link: expected previous {expected}, stored {stored}")
            }
            Self::ChainHashMismatch { recomputed, stored } => {
                write!(f, "chain hash mismatch: recomputed {recomputed}, stored {stored}")
            }
            Self::SignatureInvalid => f.write_str("signature invalid"),
            Self::UnknownKey { key_id } => write!(f, "unknown signing key {key_id}"),
            Self::TailMismatch { recorded, found } => {
                write!(f, "tail mismatch: recorded {recorded}, record has {found}")
            }
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Divergence {
    /// Position at which the finding was made.
    pub sequence: u64,
    /// What was wrong.
    #[serde(flatten)]
    pub kind: DivergenceKind,
}

/// Result of verifying one event in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationResult {
    /// Content hash and chain hash recompute to the stored values.
    pub hash_ok: bool,
    /// The signature verifies under the recorded key.
    pub signature_ok: bool,
}

impl VerificationResult {
    /// Both checks passed.
    pub fn is_valid(&self) -> bool {
        self.hash_ok && self.signature_ok
    }
}

/// Result of verifying a sequence range of one partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityReport {
    /// Partition verified.
    pub partition: PartitionId,
    /// First sequence requested.
    pub from: u64,
    /// Last sequence requested.
    pub to: u64,
    /// Records actually examined.
    pub events_checked: u64,
    /// Chain hash of the last examined record.
    pub last_chain_hash: Option<ContentDigest>,
    /// Sequence of the earliest finding.
    pub first_divergence: Option<u64>,
    /// Every finding, in position order.
    pub findings: Vec<Divergence>,
}

impl IntegrityReport {
    /// No findings.
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    /// Convert a dirty report into [`LedgerError::IntegrityViolation`]
    /// carrying the first divergent sequence.
    pub fn into_result(self) -> Result<Self, LedgerError> {
        match self.findings.iter().min_by_key(|d| d.sequence) {
            None => Ok(self),
            Some(first) => Err(LedgerError::IntegrityViolation {
                partition: self.partition.to_string(),
                sequence: first.sequence,
                detail: first.kind.to_string(),
            }),
        }
    }
}

/// Recomputes hashes, links and signatures of stored events.
#[derive(Clone)]
pub struct IntegrityVerifier {
    keys: Arc<dyn KeyProvider>,
}

impl std::fmt::Debug for IntegrityVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegrityVerifier").finish_non_exhaustive()
    }
}

impl IntegrityVerifier {
    /// A verifier resolving keys through `keys`.
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Check one event on its own: content hash, chain hash against its own
    /// stored link, and signature. Does not look at neighbours.
    pub fn verify_event(&self, event: &AuditEvent) -> VerificationResult {
        let content_ok = matches!(event.compute_content_hash(), Ok(h) if h == event.content_hash);
        let chain_ok = event.compute_chain_hash() == event.chain_hash;
        VerificationResult {
            hash_ok: content_ok && chain_ok,
            signature_ok: self.signature_finding(event).is_none(),
        }
    }

    /// Verify the records of a snapshot against the range `from..=to`.
    pub fn verify_snapshot(&self, snapshot: &PartitionSnapshot, from: u64, to: u64) -> IntegrityReport {
        let mut findings = Vec::new();
        let anchor = if from <= 1 {
            Some(GENESIS_DIGEST)
        } else {
            match &snapshot.predecessor {
                Some(prev) => Some(prev.chain_hash),
                None => {
                    findings.push(Divergence {
                        sequence: from - 1,
                        kind: DivergenceKind::MissingEvent,
                    });
                    None
                }
            }
        };
        self.walk(&snapshot.partition, &snapshot.events, from, to, anchor, findings)
    }

    /// Verify a complete partition given as a slice starting at sequence 1.
    pub fn verify_chain(&self, partition: &PartitionId, events: &[AuditEvent]) -> IntegrityReport {
        let to = events.last().map_or(0, |e| e.sequence.max(events.len() as u64));
        self.walk(partition, events, 1, to, Some(GENESIS_DIGEST), Vec::new())
    }

    /// Verify an exported partition without access to the store. The export
    /// must hold the full chain from sequence 1 to its recorded tail.
    pub fn verify_export(&self, export: &LedgerExport) -> IntegrityReport {
        let mut findings = Vec::new();
        if let Some(last) = export.events.last() {
            if last.sequence == export.tail_sequence && last.chain_hash != export.tail_chain_hash {
                findings.push(Divergence {
                    sequence: export.tail_sequence,
                    kind: DivergenceKind::TailMismatch {
                        recorded: export.tail_chain_hash,
                        found: last.chain_hash,
                    },
                });
            }
        }
        self.walk(
            &export.partition,
            &export.events,
            1,
            export.tail_sequence,
            Some(GENESIS_DIGEST),
            findings,
        )
    }

    fn walk(
        &self,
        partition: &PartitionId,
        events: &[AuditEvent],
        from: u64,
        to: u64,
        anchor: Option<ContentDigest>,
        mut findings: Vec<Divergence>,
    ) -> IntegrityReport {
        let mut previous = anchor;
        let mut expected_sequence = from;
        let mut last_chain_hash = None;

        for event in events {
            let mut at = expected_sequence;
            if event.sequence > at && event.sequence <= to {
                // Records removed from the middle of the range: the stored
                // sequence tells us how many.
                findings.extend((at..event.sequence).map(|sequence| Divergence {
                    sequence,
                    kind: DivergenceKind::MissingEvent,
                }));
                at = event.sequence;
            }
            let mut record = |kind| findings.push(Divergence { sequence: at, kind });

            if event.partition != *partition {
                record(DivergenceKind::PartitionMismatch {
                    found: event.partition.to_string(),
                });
            }
            if event.sequence != at {
                record(DivergenceKind::SequenceMismatch {
                    found: event.sequence,
                });
            }
            match event.compute_content_hash() {
                Ok(recomputed) if recomputed != event.content_hash => {
                    record(DivergenceKind::ContentHashMismatch {
                        recomputed,
                        stored: event.content_hash,
                    })
                }
                Ok(_) => {}
                Err(e) => record(DivergenceKind::ContentUnhashable {
                    reason: e.to_string(),
                }),
            }
            if let Some(expected) = previous {
                if event.previous_chain_hash != expected {
                    record(DivergenceKind::BrokenLink {
                        expected,
                        stored: event.previous_chain_hash,
                    });
                }
            }
            let recomputed = event.compute_chain_hash();
            if recomputed != event.chain_hash {
                record(DivergenceKind::ChainHashMismatch {
                    recomputed,
                    stored: event.chain_hash,
                });
            }
            if let Some(kind) = self.signature_finding(event) {
                record(kind);
            }

            previous = Some(event.chain_hash);
            last_chain_hash = Some(event.chain_hash);
            expected_sequence = at + 1;
        }

        for missing in expected_sequence..=to {
            findings.push(Divergence {
                sequence: missing,
                kind: DivergenceKind::MissingEvent,
            });
        }

        findings.sort_by_key(|d| d.sequence);
        let first_divergence = findings.first().map(|d| d.sequence);
        if let Some(first) = findings.first() {
            tracing::error!(
                partition = %partition,
                sequence = first.sequence,
                findings = findings.len(),
                divergence = %first.kind,
                "audit chain integrity violation"
            );
        } else {
            tracing::debug!(partition = %partition, from, to, "audit chain verified");
        }

        IntegrityReport {
            partition: partition.clone(),
            from,
            to,
            events_checked: events.len() as u64,
            last_chain_hash,
            first_divergence,
            findings,
        }
    }

    fn signature_finding(&self, event: &AuditEvent) -> Option<DivergenceKind> {
        match self.keys.key_for(&event.key_id) {
            Ok(secret) => {
                if verify_chain_signature(&secret, &event.chain_hash, &event.signature) {
                    None
                } else {
                    Some(DivergenceKind::SignatureInvalid)
                }
            }
            Err(e) => {
                tracing::warn!(key = %event.key_id, event = %event.event_id, error = %e, "signature key unavailable");
                Some(DivergenceKind::UnknownKey {
                    key_id: event.key_id.to_string(),
                })
            }
        }
    }
}
