//! # Assessments
//!
//! The immutable record every assessor produces. An [`Assessment`] carries
//! its score together with the scale the score lives on, so a 3.2 severity
//! is never mistaken for a 3.2 percent.

use aigov_core::{AssessorId, FrameworkId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::risk::RiskDimension;
use crate::status::ScoreScale;

/// What an assessment scores.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssessmentScope {
    /// One regulatory framework as a whole.
    Framework {
        /// The framework.
        framework: FrameworkId,
    },
    /// One requirement of a framework.
    Requirement {
        /// Owning framework.
        framework: FrameworkId,
        /// Requirement id.
        requirement: String,
    },
    /// One risk dimension.
    RiskDimension {
        /// The dimension.
        dimension: RiskDimension,
    },
    /// Audit-trail coverage for one framework.
    AuditTrail {
        /// The framework.
        framework: FrameworkId,
    },
    /// Compliance across every assessed framework.
    OverallCompliance,
    /// Risk across every dimension.
    OverallRisk,
}

impl std::fmt::Display for AssessmentScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Framework { framework } => write!(f, "framework {framework}"),
            Self::Requirement {
                framework,
                requirement,
            } => write!(f, "requirement {framework}/{requirement}"),
            Self::RiskDimension { dimension } => write!(f, "risk dimension {dimension}"),
            Self::AuditTrail { framework } => write!(f, "audit trail for {framework}"),
            Self::OverallCompliance => f.write_str("overall compliance"),
            Self::OverallRisk => f.write_str("overall risk"),
        }
    }
}

/// A scored, classified judgement about one subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    /// The assessed system.
    pub subject: SubjectId,
    /// What was scored.
    pub scope: AssessmentScope,
    /// The score, within `scale`.
    pub score: f64,
    /// Scale of `score`.
    pub scale: ScoreScale,
    /// Status label from the applicable threshold table.
    pub status: String,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Missing or failed items.
    pub gaps: Vec<String>,
    /// Suggested remediation, one line per gap where known.
    pub remediation: Vec<String>,
    /// Who produced the assessment.
    pub assessor: AssessorId,
    /// When it was produced.
    pub assessed_at: Timestamp,
    /// When it should be repeated.
    pub next_review: Timestamp,
}
