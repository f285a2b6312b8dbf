//! # Chain Signatures: HMAC-SHA256
//!
//! `signature = HMAC-SHA256(secret, chain_hash_bytes)`.
//!
//! The signature covers the chain hash rather than the event body: the chain
//! hash already commits to the content hash and, through it, to every field.
//!
//! ## Security Invariant
//!
//! - [`SigningSecret`] is zeroized on drop and redacted in `Debug`.
//! - [`verify_chain_signature()`] recomputes the tag and compares with
//!   `subtle::ConstantTimeEq`; no early-exit byte comparison.

use aigov_core::digest::parse_hex32;
use aigov_core::{ContentDigest, CryptoError};
use hmac::{Hmac, Mac};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha256 = Hmac<Sha256>;

/// Length of a signing secret in bytes.
pub const SECRET_LEN: usize = 32;

/// Secret key material for HMAC signing.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SigningSecret([u8; SECRET_LEN]);

impl SigningSecret {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a secret from 64 hex characters (e.g. injected from a vault).
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        parse_hex32(hex)
            .map(Self)
            .map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }

    /// Generate a fresh secret from the operating system RNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// A short, non-reversible identifier for the secret, safe to log and
    /// export.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"aigov.signing-secret.fingerprint.v1:");
        hasher.update(self.0);
        hasher
            .finalize()
            .iter()
            .take(8)
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    fn mac(&self) -> Result<HmacSha256, CryptoError> {
        HmacSha256::new_from_slice(&self.0).map_err(|e| CryptoError::InvalidKey(e.to_string()))
    }
}

impl std::fmt::Debug for SigningSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SigningSecret(fingerprint={})", self.fingerprint())
    }
}

/// An HMAC-SHA256 tag over a chain hash. Serializes as 64 hex characters.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainSignature([u8; 32]);

impl ChainSignature {
    /// Wrap raw tag bytes read back from storage.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// The raw tag.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, CryptoError> {
        parse_hex32(hex).map(Self)
    }
}

impl std::fmt::Debug for ChainSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix: String = self.0.iter().take(4).map(|b| format!("{b:02x}")).collect();
        write!(f, "ChainSignature({prefix}...)")
    }
}

impl std::fmt::Display for ChainSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for ChainSignature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ChainSignature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

/// Sign a chain hash.
pub fn sign_chain_hash(
    secret: &SigningSecret,
    chain_hash: &ContentDigest,
) -> Result<ChainSignature, CryptoError> {
    let mut mac = secret.mac()?;
    mac.update(chain_hash.as_bytes());
    let tag = mac.finalize().into_bytes();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&tag);
    Ok(ChainSignature(bytes))
}

/// Check a chain signature under `secret`. Constant-time in the tag bytes.
pub fn verify_chain_signature(
    secret: &SigningSecret,
    chain_hash: &ContentDigest,
    signature: &ChainSignature,
) -> bool {
    match sign_chain_hash(secret, chain_hash) {
        Ok(expected) => bool::from(expected.0.ct_eq(&signature.0)),
        Err(_) => false,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use aigov_core::digest::GENESIS_DIGEST;
    use aigov_core::chain_digest;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sign_then_verify_holds_for_any_key(key in any::<[u8; 32]>(), content in any::<[u8; 32]>()) {
            let secret = SigningSecret::from_bytes(key);
            let link = chain_digest(&ContentDigest::from_bytes(content), &GENESIS_DIGEST);
            let sig = sign_chain_hash(&secret, &link).unwrap();
            prop_assert!(verify_chain_signature(&secret, &link, &sig));
        }
    }
}
