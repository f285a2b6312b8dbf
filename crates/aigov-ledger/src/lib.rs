//! # aigov-ledger: Tamper-Evident Audit Ledger
//!
//! Records governance events (training runs, deployments, bias checks,
//! access grants, compliance reviews) in append-only, per-partition hash
//! chains, and proves after the fact that nothing was edited, removed or
//! reordered.
//!
//! ## Architecture
//!
//! - [`event`]: drafts and sealed events, content and chain hashing.
//! - [`store`]: the [`PersistentStore`] seam with compare-and-swap on the
//!   partition tail, plus [`InMemoryStore`].
//! - [`ledger`]: [`EventLedger`], the only writer.
//! - [`verify`]: [`IntegrityVerifier`] and its reports.
//! - [`stats`], [`retention`], [`export`]: read-side views.
//!
//! ## Crate Policy
//!
//! - Events are never mutated or deleted once appended. Corrections are new
//!   events naming the original.
//! - Verification reports divergences; it never repairs them.
//! - The `fault-injection` feature exposes store hooks that corrupt records.
//!   It exists for tests and must not be enabled in production builds.

pub mod error;
pub mod event;
pub mod export;
pub mod ledger;
pub mod retention;
pub mod stats;
pub mod store;
pub mod verify;

pub use error::LedgerError;
pub use event::{AuditEvent, EventDraft, Metadata};
pub use export::LedgerExport;
pub use ledger::{EventLedger, RetryPolicy, SystemRegistration};
pub use retention::RetentionPolicy;
pub use stats::LedgerStatistics;
pub use store::{Deadline, InMemoryStore, PartitionSnapshot, PersistentStore, StoreError, Tail};
pub use verify::{Divergence, DivergenceKind, IntegrityReport, IntegrityVerifier, VerificationResult};
