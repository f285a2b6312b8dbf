//! # Content and Chain Digests
//!
//! `ContentDigest` is a SHA-256 value used in two roles: the content hash of
//! an audit event (computed from [`CanonicalBytes`]) and the chain hash that
//! links an event to its predecessor (computed from two digests).
//!
//! ## Security Invariant
//!
//! Neither constructor accepts raw bytes. [`sha256_digest()`] takes only
//! `&CanonicalBytes`, and [`chain_digest()`] takes only two existing
//! digests, so every link of a chain is rooted in canonicalized content.
//!
//! Digests serialize as 64-character lowercase hex strings.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::CryptoError;

/// Chain hash of the empty partition: 32 zero bytes.
///
/// The first event appended to any partition links to this value.
pub const GENESIS_DIGEST: ContentDigest = ContentDigest([0u8; 32]);

/// A 32-byte SHA-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentDigest([u8; 32]);

impl ContentDigest {
    /// Wrap raw digest bytes, e.g. a value read back from storage.
    ///
    /// Prefer [`sha256_digest()`] or [`chain_digest()`] for computing new
    /// digests.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw 32-byte digest value.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the genesis value.
    pub fn is_genesis(&self) -> bool {
        *self == GENESIS_DIGEST
    }

    /// Render the digest as a lowercase hex string.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a digest from a 64-character hex string.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        parse_hex32(hex).map(Self)
    }
}

impl std::fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

impl Serialize for ContentDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Compute a SHA-256 content digest from canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Compute a SHA-256 hex string from canonical bytes.
pub fn sha256_hex(data: &CanonicalBytes) -> String {
    sha256_digest(data).to_hex()
}

/// Link a content hash to its predecessor's chain hash:
/// `SHA-256(content_hash || previous_chain_hash)`.
pub fn chain_digest(content: &ContentDigest, previous: &ContentDigest) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(content.0);
    hasher.update(previous.0);
    let hash = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    ContentDigest(bytes)
}

/// Decode exactly 32 bytes from a 64-character hex string.
///
/// Accepts either case; surrounding whitespace is ignored.
pub fn parse_hex32(hex: &str) -> Result<[u8; 32], CryptoError> {
    let hex = hex.trim();
    if hex.len() != 64 {
        return Err(CryptoError::InvalidHex(format!(
            "expected 64 hex chars, got {}",
            hex.len()
        )));
    }
    let mut out = [0u8; 32];
    for (i, slot) in out.iter_mut().enumerate() {
        let pair = hex
            .get(i * 2..i * 2 + 2)
            .ok_or_else(|| CryptoError::InvalidHex(format!("non-ascii input near byte {i}")))?;
        *slot = u8::from_str_radix(pair, 16)
            .map_err(|e| CryptoError::InvalidHex(format!("invalid hex at position {}: {e}", i * 2)))?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(value: serde_json::Value) -> ContentDigest {
        sha256_digest(&CanonicalBytes::new(&value).unwrap())
    }

    #[test]
    fn known_vector_for_empty_object() {
        let digest = digest_of(serde_json::json!({}));
        assert_eq!(
            digest.to_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
    }

    #[test]
    fn genesis_is_all_zero_hex() {
        assert_eq!(GENESIS_DIGEST.to_hex(), "0".repeat(64));
        assert!(GENESIS_DIGEST.is_genesis());
        assert!(!digest_of(serde_json::json!({})).is_genesis());
    }

    #[test]
    fn chain_digest_depends_on_both_inputs() {
        let a = digest_of(serde_json::json!({"seq": 1}));
        let b = digest_of(serde_json::json!({"seq": 2}));
        let link = chain_digest(&a, &GENESIS_DIGEST);
        assert_ne!(link, chain_digest(&b, &GENESIS_DIGEST));
        assert_ne!(link, chain_digest(&a, &b));
        assert_eq!(link, chain_digest(&a, &GENESIS_DIGEST));
    }

    #[test]
    fn chain_digest_is_not_symmetric() {
        let a = digest_of(serde_json::json!({"x": 1}));
        let b = digest_of(serde_json::json!({"x": 2}));
        assert_ne!(chain_digest(&a, &b), chain_digest(&b, &a));
    }

    #[test]
    fn chain_digest_matches_manual_concatenation() {
        let a = digest_of(serde_json::json!({"x": 1}));
        let mut concat = Vec::with_capacity(64);
        concat.extend_from_slice(a.as_bytes());
        concat.extend_from_slice(GENESIS_DIGEST.as_bytes());
        let expected = Sha256::digest(&concat);
        assert_eq!(chain_digest(&a, &GENESIS_DIGEST).as_bytes()[..], expected[..]);
    }

    #[test]
    fn hex_roundtrip_and_serde_as_string() {
        let d = digest_of(serde_json::json!({"k": "v"}));
        assert_eq!(ContentDigest::from_hex(&d.to_hex()).unwrap(), d);
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, format!("\"{}\"", d.to_hex()));
        let back: ContentDigest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, d);
    }

    #[test]
    fn uppercase_hex_accepted() {
        let d = digest_of(serde_json::json!({"k": "v"}));
        let upper = d.to_hex().to_uppercase();
        assert_eq!(ContentDigest::from_hex(&upper).unwrap(), d);
    }

    #[test]
    fn malformed_hex_rejected() {
        assert!(ContentDigest::from_hex("abc").is_err());
        assert!(ContentDigest::from_hex(&"zz".repeat(32)).is_err());
        assert!(serde_json::from_str::<ContentDigest>("\"00\"").is_err());
    }

    #[test]
    fn display_is_prefixed() {
        let d = digest_of(serde_json::json!({"a": 1}));
        let s = d.to_string();
        assert!(s.starts_with("sha256:"));
        assert_eq!(s.len(), 7 + 64);
        assert_eq!(sha256_hex(&CanonicalBytes::new(&serde_json::json!({"a": 1})).unwrap()), d.to_hex());
    }
}
