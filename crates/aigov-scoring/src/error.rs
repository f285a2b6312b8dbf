//! Scoring and configuration errors.
//!
//! [`ConfigurationError`] is fatal at load: a policy that fails its
//! invariants never reaches an assessor. [`ScoringError`] is raised per
//! request and is never coerced into a numeric default.

use std::path::PathBuf;

use aigov_core::FrameworkId;
use thiserror::Error;

/// A governance policy violates a static invariant.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// The policy file could not be read.
    #[error("failed to read policy at {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// YAML parsing failed.
    #[error("failed to parse policy YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A weight lies outside [0, 1] or is not finite.
    #[error("weight of {context} is {value}, expected a finite value in [0, 1]")]
    WeightOutOfRange {
        /// Which weight.
        context: String,
        /// The rejected value.
        value: f64,
    },

    /// A score lies outside its scale or is not finite.
    #[error("score of {context} is {value}, expected a finite value in [{min}, {max}]")]
    ScoreOutOfRange {
        /// Which score.
        context: String,
        /// The rejected value.
        value: f64,
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },

    /// A threshold table violates its invariants.
    #[error("threshold table {table}: {reason}")]
    InvalidThresholds {
        /// Table name.
        table: String,
        /// What is wrong.
        reason: String,
    },

    /// A decision table violates its invariants.
    #[error("decision table of {context}: {reason}")]
    InvalidDecisionTable {
        /// Owning factor or criterion.
        context: String,
        /// What is wrong.
        reason: String,
    },

    /// An `unknown` tier is more lenient than the median tier.
    #[error("unknown tier of {context} is {tier}, must not be below medium")]
    LenientUnknownTier {
        /// Owning factor.
        context: String,
        /// The configured tier.
        tier: aigov_core::SeverityTier,
    },

    /// A reference names something that is not defined.
    #[error("{context} references undefined {kind} {name:?}")]
    UndefinedReference {
        /// Where the reference appears.
        context: String,
        /// What kind of thing is referenced.
        kind: &'static str,
        /// The dangling name.
        name: String,
    },

    /// An identifier is defined twice.
    #[error("{kind} {name:?} is defined more than once")]
    Duplicate {
        /// What kind of thing.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A required section or field is empty.
    #[error("{0} must not be empty")]
    Empty(String),
}

/// A scoring request could not produce a score.
#[derive(Debug, Error)]
pub enum ScoringError {
    /// The inputs carry zero total weight, so no score is defined.
    #[error("score for {context} is undetermined: total weight is zero")]
    Undetermined {
        /// What was being scored.
        context: String,
    },

    /// A framework was requested that the policy does not define.
    #[error("framework {0} is not defined by the governance policy")]
    UnknownFramework(FrameworkId),

    /// Reading ledger events failed.
    #[error("ledger error: {0}")]
    Ledger(#[from] aigov_ledger::LedgerError),
}

impl ScoringError {
    /// Whether this is an [`Undetermined`](Self::Undetermined) result.
    pub fn is_undetermined(&self) -> bool {
        matches!(self, Self::Undetermined { .. })
    }
}
