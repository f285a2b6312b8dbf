//! # Governance Policy
//!
//! [`GovernanceConfig`] is the single immutable object every assessor reads:
//! threshold tables, framework criteria and requirements, risk dimensions
//! and factors, audit-trail requirements and remediation templates. It is
//! parsed from YAML and validated once; a policy that fails validation
//! never reaches an assessor.
//!
//! ## Validation
//!
//! - Every weight is finite and in [0, 1]; every score lies on its scale.
//! - Threshold tables sit on the expected scale and the gap-risk table
//!   defines the `critical`, `high` and `medium` bands.
//! - Requirement ids are unique; requirements reference defined criteria
//!   and remediation categories.
//! - Decision-table cutoffs are finite and ordered; `unknown` fallbacks
//!   are never more lenient than the median.
//!
//! A reference policy with illustrative weights is embedded in the crate
//! and available through [`GovernanceConfig::reference`].

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use aigov_core::FrameworkId;
use serde::{Deserialize, Serialize};

use crate::audit_coverage::AuditPolicy;
use crate::error::ConfigurationError;
use crate::framework::FrameworkPolicy;
use crate::remediation::RemediationTemplate;
use crate::risk::RiskPolicy;
use crate::status::{labels, ScoreScale, ThresholdTable};

const REFERENCE_POLICY: &str = include_str!("../config/reference.yaml");

/// The three threshold tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Percent score to compliance status.
    pub compliance: ThresholdTable,
    /// Percent score to gap-risk level.
    pub gap_risk: ThresholdTable,
    /// Severity score to risk level.
    pub risk_level: ThresholdTable,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            compliance: ThresholdTable::compliance_status(),
            gap_risk: ThresholdTable::gap_risk(),
            risk_level: ThresholdTable::risk_level(),
        }
    }
}

/// Compliance cut points and review intervals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompliancePolicy {
    /// Criteria and requirements scoring below this are gaps.
    pub gap_threshold: f64,
    /// Requirements scoring below this enter the remediation plan.
    pub improvement_threshold: f64,
    /// Overall score needed for certification readiness.
    pub certification_minimum: f64,
    /// Score a remediation plan aims for.
    pub target_score: f64,
    /// Days until a requirement is reviewed again.
    pub requirement_review_days: u32,
    /// Days until the system is assessed again.
    pub assessment_interval_days: u32,
}

/// A validated governance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Policy format version.
    pub version: u32,
    /// Threshold tables.
    #[serde(default)]
    pub thresholds: Thresholds,
    /// Compliance cut points.
    pub compliance: CompliancePolicy,
    /// Frameworks by id.
    pub frameworks: BTreeMap<FrameworkId, FrameworkPolicy>,
    /// Risk dimensions and factors.
    pub risk: RiskPolicy,
    /// Audit-trail requirements.
    pub audit: AuditPolicy,
    /// Remediation templates by category.
    #[serde(default)]
    pub remediation: BTreeMap<String, RemediationTemplate>,
}

impl GovernanceConfig {
    /// Parse and validate a YAML policy.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigurationError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate the policy at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            version = config.version,
            frameworks = config.frameworks.len(),
            dimensions = config.risk.dimensions.len(),
            "governance policy loaded"
        );
        Ok(config)
    }

    /// The embedded reference policy.
    pub fn reference() -> Result<Self, ConfigurationError> {
        Self::from_yaml_str(REFERENCE_POLICY)
    }

    /// Check every invariant listed in the module documentation.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.validate_thresholds()?;

        let c = &self.compliance;
        for (context, value) in [
            ("compliance gap threshold", c.gap_threshold),
            ("compliance improvement threshold", c.improvement_threshold),
            ("compliance certification minimum", c.certification_minimum),
            ("compliance target score", c.target_score),
        ] {
            check_score(context, value, ScoreScale::Percent)?;
        }

        if self.frameworks.is_empty() {
            return Err(ConfigurationError::Empty("frameworks".into()));
        }
        let categories: BTreeSet<&str> = self.remediation.keys().map(String::as_str).collect();
        let mut requirement_ids = BTreeSet::new();
        for (framework, policy) in &self.frameworks {
            policy.validate(*framework, &categories, &mut requirement_ids)?;
        }

        self.risk.validate()?;
        self.audit.validate()?;
        Ok(())
    }

    fn validate_thresholds(&self) -> Result<(), ConfigurationError> {
        let t = &self.thresholds;
        for (name, table, scale) in [
            ("compliance", &t.compliance, ScoreScale::Percent),
            ("gap_risk", &t.gap_risk, ScoreScale::Percent),
            ("risk_level", &t.risk_level, ScoreScale::Severity),
        ] {
            if table.scale() != scale {
                return Err(ConfigurationError::InvalidThresholds {
                    table: name.to_string(),
                    reason: format!("expected the {scale:?} scale"),
                });
            }
        }
        for label in [labels::CRITICAL, labels::HIGH, labels::MEDIUM] {
            if !t.gap_risk.has_label(label) {
                return Err(ConfigurationError::InvalidThresholds {
                    table: "gap_risk".into(),
                    reason: format!("missing the {label:?} band"),
                });
            }
        }
        Ok(())
    }
}

/// Reject a weight that is not finite or lies outside [0, 1].
pub(crate) fn check_weight(context: &str, value: f64) -> Result<(), ConfigurationError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::WeightOutOfRange {
            context: context.to_string(),
            value,
        })
    }
}

/// Reject a score that is not finite or lies outside `scale`.
pub(crate) fn check_score(
    context: &str,
    value: f64,
    scale: ScoreScale,
) -> Result<(), ConfigurationError> {
    if value.is_finite() && (scale.min()..=scale.max()).contains(&value) {
        Ok(())
    } else {
        Err(ConfigurationError::ScoreOutOfRange {
            context: context.to_string(),
            value,
            min: scale.min(),
            max: scale.max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mutate(from: &str, to: &str) -> Result<GovernanceConfig, ConfigurationError> {
        assert!(REFERENCE_POLICY.contains(from), "fixture text {from:?} not found");
        GovernanceConfig::from_yaml_str(&REFERENCE_POLICY.replacen(from, to, 1))
    }

    #[test]
    fn reference_policy_is_valid() {
        let config = GovernanceConfig::reference().unwrap();
        assert_eq!(config.frameworks.len(), 5);
        assert_eq!(config.risk.dimensions.len(), 6);
        assert_eq!(config.compliance.certification_minimum, 85.0);
        assert_eq!(config.thresholds.compliance.classify(89.999), "substantially_compliant");
    }

    #[test]
    fn rejects_weight_above_one() {
        let err = mutate("    weight: 0.25\n", "    weight: 1.25\n").unwrap_err();
        assert!(matches!(err, ConfigurationError::WeightOutOfRange { value, .. } if value == 1.25));
    }

    #[test]
    fn rejects_lenient_unknown_tier() {
        let err = mutate("unknown: high", "unknown: low").unwrap_err();
        assert!(matches!(err, ConfigurationError::LenientUnknownTier { .. }));
    }

    #[test]
    fn rejects_undefined_criterion() {
        let err = mutate(
            "criteria: [legal_basis_documented]",
            "criteria: [legal_basis_undocumented]",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UndefinedReference { kind: "criterion", .. }
        ));
    }

    #[test]
    fn rejects_undefined_category() {
        let err = mutate("category: explainability", "category: astrology").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UndefinedReference { kind: "remediation category", .. }
        ));
    }

    #[test]
    fn rejects_duplicate_requirement() {
        let err = mutate("id: gdpr_privacy_by_design", "id: gdpr_legal_basis").unwrap_err();
        assert!(matches!(err, ConfigurationError::Duplicate { kind: "requirement", .. }));
    }

    #[test]
    fn rejects_threshold_gap() {
        let err = mutate(
            "      - { min: 0, label: non_compliant }",
            "      - { min: 10, label: non_compliant }",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigurationError::Yaml(_)));
        assert!(err.to_string().contains("unlabelled"));
    }

    #[test]
    fn rejects_misordered_cutoffs() {
        let err = mutate("{ bound: 0.85, tier: medium }", "{ bound: 0.65, tier: medium }")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidDecisionTable { .. }));
    }

    #[test]
    fn rejects_score_off_scale() {
        let err = mutate("satisfied: 90, unsatisfied: 15", "satisfied: 190, unsatisfied: 15")
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::ScoreOutOfRange { .. }));
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(REFERENCE_POLICY.as_bytes()).unwrap();
        let config = GovernanceConfig::load(file.path()).unwrap();
        assert_eq!(config, GovernanceConfig::reference().unwrap());
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = GovernanceConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigurationError::Io { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn parse_errors_surface_as_yaml() {
        let err = GovernanceConfig::from_yaml_str("version: [").unwrap_err();
        assert!(matches!(err, ConfigurationError::Yaml(_)));
    }
}
