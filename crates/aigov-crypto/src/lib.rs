//! # aigov-crypto: Ledger Signing
//!
//! Keyed integrity for audit events:
//!
//! - **HMAC-SHA256 chain signatures.** Each event's chain hash is signed with
//!   the provider's current secret; verification compares tags in constant
//!   time.
//! - **Signing secrets** are zeroized on drop and never printed.
//! - **Key providers** hand out the active key for signing and resolve any
//!   historical key id for verification, so rotation never invalidates
//!   events signed under a retired key.
//!
//! ## Crate Policy
//!
//! - Depends only on `aigov-core` internally.
//! - Tests use real SHA-256 and real HMAC; nothing is mocked.

pub mod keys;
pub mod signing;

pub use keys::{KeyProvider, Keyring};
pub use signing::{sign_chain_hash, verify_chain_signature, ChainSignature, SigningSecret};
