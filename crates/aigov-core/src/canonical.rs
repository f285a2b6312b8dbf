//! # Canonical Serialization
//!
//! `CanonicalBytes` is the sole construction path for bytes that feed a
//! content hash. Audit event content hashes, assessment fingerprints and
//! ledger exports all go through it.
//!
//! ## Security Invariant
//!
//! The inner field is private. The only constructor applies the coercion
//! pipeline (non-finite numbers rejected) and then serializes with
//! `serde_jcs` (RFC 8785): sorted keys, compact separators, and numbers in
//! their shortest round-trip form. Two events whose metadata maps were
//! built in different insertion orders therefore hash identically, and a
//! finite float such as a bias score always yields the same bytes.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization after type coercion.
///
/// # Invariants
///
/// - The only constructor is `CanonicalBytes::new()`.
/// - Timestamps are UTC ISO8601 with Z suffix (see [`crate::Timestamp`]).
/// - Numbers are finite. Floats use the ECMAScript shortest form.
/// - All dict keys are strings.
/// - Tuples/sequences are JSON arrays.
/// - Serialization uses sorted keys with compact separators (RFC 8785).
///
/// These invariants are enforced by the constructor and cannot be violated
/// by downstream code because the inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    ///
    /// This is the only way to construct `CanonicalBytes`.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::NonFiniteNumber` if the value contains
    /// a NaN or infinite number. Returns
    /// `CanonicalizationError::SerializationFailed` if JCS serialization fails.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let coerced = coerce_json_value(value)?;
        let bytes = serialize_canonical(&coerced)?;
        Ok(Self(bytes))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Recursively coerce JSON values: scalars and finite numbers pass through,
/// non-finite numbers are rejected, containers recurse.
fn coerce_json_value(value: Value) -> Result<Value, CanonicalizationError> {
    match value {
        Value::Null | Value::Bool(_) | Value::String(_) => Ok(value),
        Value::Number(ref n) => {
            match n.as_f64() {
                Some(f) if n.is_f64() && !f.is_finite() => {
                    Err(CanonicalizationError::NonFiniteNumber(f))
                }
                _ => Ok(value),
            }
        }
        Value::Object(map) => {
            let mut coerced = serde_json::Map::new();
            for (k, v) in map {
                coerced.insert(k, coerce_json_value(v)?);
            }
            Ok(Value::Object(coerced))
        }
        Value::Array(arr) => {
            let coerced: Result<Vec<_>, _> = arr.into_iter().map(coerce_json_value).collect();
            Ok(Value::Array(coerced?))
        }
    }
}

/// Serialize a JSON value in JCS-canonical form (RFC 8785).
fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
