//! # Error Types
//!
//! Leaf error types shared by every crate in the workspace. Higher layers
//! wrap these with `#[from]` in their own `thiserror` enums.
//!
//! - [`ValidationError`]: malformed input, raised before any state mutation.
//! - [`CanonicalizationError`]: the value cannot be canonicalized for hashing.
//! - [`CryptoError`]: key lookup or key material failures.

use thiserror::Error;

/// Malformed input rejected at a construction or ingestion boundary.
///
/// Variants carry the offending value and what was expected so operators
/// can fix the caller without reading source.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Identifier is empty, too long, or contains disallowed characters.
    #[error("invalid {kind} identifier: {value:?} ({reason})")]
    InvalidIdentifier {
        /// Which identifier namespace was being constructed.
        kind: &'static str,
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// String does not name a member of a closed vocabulary.
    #[error("unknown {vocabulary} value: {value:?}")]
    UnknownVariant {
        /// The vocabulary, e.g. "event kind" or "framework".
        vocabulary: &'static str,
        /// The rejected input.
        value: String,
    },

    /// A required field is missing or blank.
    #[error("required field {0} is missing or blank")]
    MissingField(&'static str),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: {value:?} ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Metadata cannot be represented canonically.
    #[error("metadata field {key:?} is not canonicalizable: {reason}")]
    InvalidMetadata {
        /// The offending metadata key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A correction references an event that does not exist.
    #[error("correction target {0} does not exist")]
    UnknownCorrectionTarget(String),

    /// A sequence range is empty or starts before the first sequence.
    #[error("invalid sequence range {from}..={to}: {reason}")]
    InvalidRange {
        /// First sequence requested.
        from: u64,
        /// Last sequence requested.
        to: u64,
        /// Why the range was rejected.
        reason: &'static str,
    },

    /// A numeric input lies outside its declared bounds.
    #[error("{field} = {value} is outside [{min}, {max}]")]
    OutOfRange {
        /// Which field.
        field: String,
        /// The rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
}

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// NaN and the infinities have no RFC 8785 number form.
    #[error("non-finite number has no canonical representation: {0}")]
    NonFiniteNumber(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Errors resolving or using signing keys.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// No key is registered under the requested id.
    #[error("unknown signing key: {0}")]
    UnknownKey(String),

    /// The key provider has no active key to sign with.
    #[error("no active signing key")]
    NoActiveKey,

    /// Key material was rejected (wrong length, empty, duplicate id).
    #[error("invalid key material: {0}")]
    InvalidKey(String),

    /// A hex-encoded digest or tag could not be decoded.
    #[error("invalid hex encoding: {0}")]
    InvalidHex(String),
}
