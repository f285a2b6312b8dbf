//! # Governance Vocabularies
//!
//! Closed enumerations shared by the ledger and the scoring engine. Every
//! `match` on these is exhaustive; adding a framework or event kind forces
//! each consumer (audit rules, criteria tables, statistics) to handle it.
//!
//! All enums serialize as their snake_case identifier and parse from the
//! same string via `FromStr`. Unknown strings are a
//! [`ValidationError::UnknownVariant`].

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// Event kinds
// ---------------------------------------------------------------------------

/// What kind of governance-relevant action an audit event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A model was trained or retrained.
    ModelTraining,
    /// A model version was deployed.
    ModelDeployment,
    /// Personal or sensitive data was processed.
    DataProcessing,
    /// A prediction or automated decision was made.
    PredictionMade,
    /// A bias or fairness evaluation ran.
    BiasDetection,
    /// Production performance was measured.
    PerformanceMonitoring,
    /// An incident was recorded.
    IncidentLogged,
    /// Access to the system or its data was granted.
    AccessGranted,
    /// System configuration changed (including registration).
    ConfigurationChanged,
    /// A compliance review took place.
    ComplianceReview,
}

impl EventKind {
    /// All event kinds in canonical order.
    pub fn all() -> &'static [EventKind] {
        &[
            Self::ModelTraining,
            Self::ModelDeployment,
            Self::DataProcessing,
            Self::PredictionMade,
            Self::BiasDetection,
            Self::PerformanceMonitoring,
            Self::IncidentLogged,
            Self::AccessGranted,
            Self::ConfigurationChanged,
            Self::ComplianceReview,
        ]
    }

    /// The snake_case identifier, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ModelTraining => "model_training",
            Self::ModelDeployment => "model_deployment",
            Self::DataProcessing => "data_processing",
            Self::PredictionMade => "prediction_made",
            Self::BiasDetection => "bias_detection",
            Self::PerformanceMonitoring => "performance_monitoring",
            Self::IncidentLogged => "incident_logged",
            Self::AccessGranted => "access_granted",
            Self::ConfigurationChanged => "configuration_changed",
            Self::ComplianceReview => "compliance_review",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                vocabulary: "event kind",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Frameworks
// ---------------------------------------------------------------------------

/// Regulatory and standards frameworks an event or assessment can be
/// scoped to.
///
/// | Id | Framework |
/// |----|-----------|
/// | `eu_ai_act` | EU Artificial Intelligence Act |
/// | `gdpr` | EU General Data Protection Regulation |
/// | `iso_42001` | ISO/IEC 42001 AI management systems |
/// | `nist_ai_rmf` | NIST AI Risk Management Framework |
/// | `ieee_2859` | IEEE ethical AI design |
/// | `iso_23053` | ISO/IEC 23053 ML framework |
/// | `ccpa` | California Consumer Privacy Act |
/// | `sarbanes_oxley` | Sarbanes-Oxley Act |
/// | `hipaa` | HIPAA |
/// | `pci_dss` | PCI DSS |
/// | `basel_iii` | Basel III |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkId {
    /// EU Artificial Intelligence Act.
    EuAiAct,
    /// EU General Data Protection Regulation.
    Gdpr,
    /// ISO/IEC 42001.
    #[serde(rename = "iso_42001")]
    Iso42001,
    /// NIST AI Risk Management Framework.
    NistAiRmf,
    /// IEEE ethically aligned design.
    #[serde(rename = "ieee_2859")]
    Ieee2859,
    /// ISO/IEC 23053.
    #[serde(rename = "iso_23053")]
    Iso23053,
    /// California Consumer Privacy Act.
    Ccpa,
    /// Sarbanes-Oxley Act.
    SarbanesOxley,
    /// Health Insurance Portability and Accountability Act.
    Hipaa,
    /// Payment Card Industry Data Security Standard.
    PciDss,
    /// Basel III banking supervision.
    BaselIii,
}

impl FrameworkId {
    /// All frameworks in canonical order.
    pub fn all() -> &'static [FrameworkId] {
        &[
            Self::EuAiAct,
            Self::Gdpr,
            Self::Iso42001,
            Self::NistAiRmf,
            Self::Ieee2859,
            Self::Iso23053,
            Self::Ccpa,
            Self::SarbanesOxley,
            Self::Hipaa,
            Self::PciDss,
            Self::BaselIii,
        ]
    }

    /// The snake_case identifier, identical to the serde form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EuAiAct => "eu_ai_act",
            Self::Gdpr => "gdpr",
            Self::Iso42001 => "iso_42001",
            Self::NistAiRmf => "nist_ai_rmf",
            Self::Ieee2859 => "ieee_2859",
            Self::Iso23053 => "iso_23053",
            Self::Ccpa => "ccpa",
            Self::SarbanesOxley => "sarbanes_oxley",
            Self::Hipaa => "hipaa",
            Self::PciDss => "pci_dss",
            Self::BaselIii => "basel_iii",
        }
    }
}

impl std::fmt::Display for FrameworkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrameworkId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                vocabulary: "framework",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Declared tiers on events
// ---------------------------------------------------------------------------

/// Risk tier an actor declares for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    /// Routine.
    Low,
    /// Worth noting.
    Medium,
    /// Needs follow-up.
    High,
    /// Needs immediate attention.
    Critical,
}

impl RiskTier {
    /// All tiers, lowest first.
    pub fn all() -> &'static [RiskTier] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// High and critical events.
    pub fn is_elevated(&self) -> bool {
        matches!(self, Self::High | Self::Critical)
    }
}

impl std::fmt::Display for RiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                vocabulary: "risk tier",
                value: s.to_string(),
            })
    }
}

/// Business impact an actor declares for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusinessImpact {
    /// Negligible impact.
    Low,
    /// Contained impact.
    Medium,
    /// Material impact.
    High,
    /// Severe impact.
    Critical,
}

impl BusinessImpact {
    /// All tiers, lowest first.
    pub fn all() -> &'static [BusinessImpact] {
        &[Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for BusinessImpact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BusinessImpact {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                vocabulary: "business impact",
                value: s.to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// Severity scale for risk factors
// ---------------------------------------------------------------------------

/// Five-level ordinal severity used by risk factors, 1 (minimal) to
/// 5 (critical).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    /// 1
    Minimal,
    /// 2
    Low,
    /// 3
    Medium,
    /// 4
    High,
    /// 5
    Critical,
}

impl SeverityTier {
    /// The median tier. Missing or unrecognized inputs never evaluate below it.
    pub const MEDIAN: SeverityTier = SeverityTier::Medium;

    /// All tiers, lowest first.
    pub fn all() -> &'static [SeverityTier] {
        &[Self::Minimal, Self::Low, Self::Medium, Self::High, Self::Critical]
    }

    /// Numeric value on the 1..=5 scale.
    pub fn value(&self) -> u8 {
        match self {
            Self::Minimal => 1,
            Self::Low => 2,
            Self::Medium => 3,
            Self::High => 4,
            Self::Critical => 5,
        }
    }

    /// Tier for a numeric value on the 1..=5 scale.
    pub fn from_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Minimal),
            2 => Some(Self::Low),
            3 => Some(Self::Medium),
            4 => Some(Self::High),
            5 => Some(Self::Critical),
            _ => None,
        }
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeverityTier {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownVariant {
                vocabulary: "severity tier",
                value: s.to_string(),
            })
    }
}
