//! # aigov-core: Foundational Types for AI Governance
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on: canonical bytes, digests, timestamps and clocks, identifiers,
//! and the closed vocabularies (event kinds, frameworks, tiers) that audit
//! events and assessments are expressed in.
//!
//! ## Key Design Principles
//!
//! 1. **`CanonicalBytes` newtype.** Every content hash is computed over bytes
//!    produced by `CanonicalBytes::new()`. Metadata maps with different
//!    insertion order hash identically; non-finite numbers are rejected.
//!
//! 2. **Chain links are digests of digests.** [`chain_digest()`] combines two
//!    [`ContentDigest`] values, never arbitrary bytes, so a chain can only be
//!    built from content that already went through canonicalization.
//!
//! 3. **Closed vocabularies.** [`EventKind`], [`FrameworkId`] and the tier
//!    enums are exhaustive. Unknown strings fail parsing with a
//!    [`ValidationError`] instead of flowing through as free text.
//!
//! 4. **Injected time.** Nothing in the workspace calls the wall clock
//!    directly; components take a [`ClockSource`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `aigov-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{chain_digest, sha256_digest, sha256_hex, ContentDigest, GENESIS_DIGEST};
pub use domain::{BusinessImpact, EventKind, FrameworkId, RiskTier, SeverityTier};
pub use error::{CanonicalizationError, CryptoError, ValidationError};
pub use identity::{ActorId, AssessorId, EventId, KeyId, PartitionId, SubjectId};
pub use temporal::{ClockSource, ManualClock, SystemClock, Timestamp};
