//! # aigov-scoring: Compliance and Risk Scoring
//!
//! Scores AI systems against regulatory frameworks and risk dimensions
//! using a validated governance policy, and measures how well their audit
//! trails support each framework.
//!
//! ## Architecture
//!
//! - [`engine`]: [`ScoringEngine`], the shared two-level weighted
//!   aggregation with confidence.
//! - [`status`]: [`ThresholdTable`] classification of scores into labels.
//! - [`gap`]: [`GapAnalyzer`], required versus observed sets.
//! - [`framework`], [`risk`], [`audit_coverage`]: assessors built on the
//!   three primitives above.
//! - [`remediation`]: priority actions and remediation plans.
//! - [`config`]: [`GovernanceConfig`], the immutable policy every assessor
//!   reads.
//!
//! ## Crate Policy
//!
//! - A score that cannot be determined is an error, never a default number.
//! - Missing inputs score pessimistically and lower confidence.
//! - Scoring is pure: the same policy, profile and clock reading give
//!   bit-identical results.

pub mod assessment;
pub mod audit_coverage;
pub mod config;
pub mod engine;
pub mod error;
pub mod framework;
pub mod gap;
pub mod profile;
pub mod remediation;
pub mod risk;
pub mod status;

pub use assessment::{Assessment, AssessmentScope};
pub use audit_coverage::{AuditCoverageAnalyzer, AuditCoverageReport, AuditPolicy, AuditRequirements};
pub use config::{CompliancePolicy, GovernanceConfig, Thresholds};
pub use engine::{Aggregate, EvaluationContext, ScoringEngine, WeightedScore};
pub use error::{ConfigurationError, ScoringError};
pub use framework::{
    ComplianceAssessor, ComplianceRequirement, Criterion, CriterionRule, CriticalGap,
    CriticalGapReason, FrameworkAssessment, FrameworkPolicy, RequirementAssessment,
    SystemComplianceReport,
};
pub use gap::{GapAnalysis, GapAnalyzer};
pub use profile::SystemProfile;
pub use remediation::{
    priority_actions, ActionPriority, PriorityAction, RemediationItem, RemediationPlan,
    RemediationTemplate,
};
pub use risk::{
    Direction, FactorRule, FactorScore, RiskAssessment, RiskAssessor, RiskDimension, RiskFactor,
    RiskPolicy, RiskReport,
};
pub use status::{ScoreScale, ThresholdTable};
