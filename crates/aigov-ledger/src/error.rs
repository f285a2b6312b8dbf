//! # Ledger Errors
//!
//! `Conflict` and `Timeout` are retryable: the caller re-reads the tail and
//! tries again. Everything else is final for the request.

use aigov_core::{CanonicalizationError, CryptoError, EventId, ValidationError};
use thiserror::Error;

use crate::store::StoreError;

/// Errors raised by ledger operations.
#[derive(Error, Debug)]
pub enum LedgerError {
    /// The draft or request was malformed. Nothing was written.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Another append advanced the partition tail first.
    #[error("append conflict on partition {partition}: expected tail #{expected_sequence}, found #{actual_sequence}")]
    Conflict {
        /// The contended partition.
        partition: String,
        /// The tail sequence the caller linked against.
        expected_sequence: u64,
        /// The tail sequence actually found.
        actual_sequence: u64,
    },

    /// The operation did not complete before the caller's deadline.
    #[error("{operation} on partition {partition} timed out")]
    Timeout {
        /// Which store operation.
        operation: &'static str,
        /// The partition involved.
        partition: String,
    },

    /// Verification found tampering. `sequence` is the first divergent event.
    #[error("integrity violation on partition {partition} at sequence {sequence}: {detail}")]
    IntegrityViolation {
        /// The partition that failed verification.
        partition: String,
        /// The first sequence number at which the chain diverged.
        sequence: u64,
        /// Human-readable description of the divergence.
        detail: String,
    },

    /// No event with this id exists in any partition.
    #[error("event {0} not found")]
    EventNotFound(EventId),

    /// Signing key lookup or use failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Event content could not be canonicalized for hashing.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// Export serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store refused the operation for a non-retryable reason.
    #[error("store error: {0}")]
    Store(String),
}

impl LedgerError {
    /// Whether retrying with a refreshed tail may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict { .. } | Self::Timeout { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict {
                partition,
                expected,
                actual,
            } => Self::Conflict {
                partition,
                expected_sequence: expected,
                actual_sequence: actual,
            },
            StoreError::Timeout {
                operation,
                partition,
            } => Self::Timeout {
                operation,
                partition,
            },
            other => Self::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_timeout_are_retryable() {
        let conflict = LedgerError::Conflict {
            partition: "sys-1".into(),
            expected_sequence: 3,
            actual_sequence: 4,
        };
        let timeout = LedgerError::Timeout {
            operation: "append",
            partition: "sys-1".into(),
        };
        assert!(conflict.is_retryable());
        assert!(timeout.is_retryable());
        assert!(!LedgerError::Validation(ValidationError::MissingField("description")).is_retryable());
    }

    #[test]
    fn store_conflict_maps_to_ledger_conflict() {
        let err: LedgerError = StoreError::Conflict {
            partition: "sys-1".into(),
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(
            err,
            LedgerError::Conflict { expected_sequence: 1, actual_sequence: 2, .. }
        ));
    }

    #[test]
    fn integrity_violation_names_sequence() {
        let err = LedgerError::IntegrityViolation {
            partition: "sys-1".into(),
            sequence: 3,
            detail: "content hash mismatch".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sequence 3"));
        assert!(msg.contains("sys-1"));
    }
}
