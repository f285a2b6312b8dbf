//! # Partition Export
//!
//! A [`LedgerExport`] is a self-contained JSON document holding one
//! partition's events, its tail, and a fingerprint for every signing key the
//! events name. Secrets never leave the key provider: a verifier holding the
//! same keys can check the export offline with
//! [`IntegrityVerifier::verify_export`](crate::verify::IntegrityVerifier::verify_export),
//! and compare fingerprints to confirm it is using the right ones.

use std::collections::BTreeMap;

use aigov_core::{ContentDigest, KeyId, PartitionId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::event::AuditEvent;
use crate::store::Tail;

/// Current export document version.
pub const EXPORT_FORMAT_VERSION: u32 = 1;

/// One partition, exported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerExport {
    /// Document format version.
    pub format_version: u32,
    /// The exported partition.
    pub partition: PartitionId,
    /// When the export was taken.
    pub exported_at: Timestamp,
    /// Tail at the time of export.
    pub tail_sequence: u64,
    /// Chain hash of the tail.
    pub tail_chain_hash: ContentDigest,
    /// Fingerprint per signing key named by the events. Keys the provider
    /// no longer holds are absent.
    pub key_fingerprints: BTreeMap<KeyId, String>,
    /// Events in sequence order.
    pub events: Vec<AuditEvent>,
}

impl LedgerExport {
    /// The tail recorded in the export.
    pub fn tail(&self) -> Tail {
        Tail {
            sequence: self.tail_sequence,
            chain_hash: self.tail_chain_hash,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an export document.
    pub fn from_json(json: &str) -> Result<Self, LedgerError> {
        Ok(serde_json::from_str(json)?)
    }
}
