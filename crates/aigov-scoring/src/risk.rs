//! # Risk Assessment
//!
//! Scores an AI system on the 1 (minimal) to 5 (critical) severity scale
//! across six dimensions. Each dimension is the weighted mean of its
//! factors' tiers; the overall score aggregates the dimensions with the
//! configured dimension weights.
//!
//! ## Factor Evaluation
//!
//! Every factor carries a tagged decision table ([`FactorRule`]) that is
//! exhaustive over its input domain. A missing signal, a value of the wrong
//! type, or a label the table does not list all map to the table's
//! `unknown` tier, which configuration validation keeps at or above
//! [`SeverityTier::MEDIAN`]. Missing information is never scored as safe.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aigov_core::{AssessorId, ClockSource, SeverityTier, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::assessment::{Assessment, AssessmentScope};
use crate::config::{check_weight, GovernanceConfig};
use crate::engine::{EvaluationContext, ScoringEngine, WeightedScore};
use crate::error::{ConfigurationError, ScoringError};
use crate::profile::SystemProfile;

// ---------------------------------------------------------------------------
// Dimensions
// ---------------------------------------------------------------------------

/// A risk dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskDimension {
    /// Model accuracy, data quality, complexity, integration.
    Technical,
    /// Oversight, change management, incident response.
    Operational,
    /// Regulatory coverage and documentation.
    Regulatory,
    /// Bias, fairness, transparency.
    Ethical,
    /// Reputation and financial exposure.
    Business,
    /// Adversarial and privacy threats.
    Security,
}

impl RiskDimension {
    /// All dimensions.
    pub fn all() -> &'static [RiskDimension] {
        &[
            Self::Technical,
            Self::Operational,
            Self::Regulatory,
            Self::Ethical,
            Self::Business,
            Self::Security,
        ]
    }

    /// The snake_case identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Technical => "technical",
            Self::Operational => "operational",
            Self::Regulatory => "regulatory",
            Self::Ethical => "ethical",
            Self::Business => "business",
            Self::Security => "security",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Self::Technical => "Technical",
            Self::Operational => "Operational",
            Self::Regulatory => "Regulatory",
            Self::Ethical => "Ethical",
            Self::Business => "Business",
            Self::Security => "Security",
        }
    }
}

impl std::fmt::Display for RiskDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decision tables
// ---------------------------------------------------------------------------

/// Which side of a cutoff triggers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// A cutoff applies when the value is strictly above its bound.
    Above,
    /// A cutoff applies when the value is strictly below its bound.
    Below,
}

impl Direction {
    /// Whether `value` lies on the triggering side of `bound`.
    pub fn crosses(self, value: f64, bound: f64) -> bool {
        match self {
            Self::Above => value > bound,
            Self::Below => value < bound,
        }
    }

    /// Cutoffs are checked in order, so each must be strictly less
    /// extreme than the one before it.
    pub(crate) fn check_bounds(self, context: &str, bounds: &[f64]) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidDecisionTable {
            context: context.to_string(),
            reason,
        };
        if bounds.is_empty() {
            return Err(invalid("no cutoffs".into()));
        }
        if let Some(b) = bounds.iter().find(|b| !b.is_finite()) {
            return Err(invalid(format!("cutoff {b} is not finite")));
        }
        for pair in bounds.windows(2) {
            let ordered = match self {
                Self::Below => pair[0] < pair[1],
                Self::Above => pair[0] > pair[1],
            };
            if !ordered {
                let expected = match self {
                    Self::Below => "increasing",
                    Self::Above => "decreasing",
                };
                return Err(invalid(format!(
                    "cutoffs {} and {} must be strictly {expected}",
                    pair[0], pair[1]
                )));
            }
        }
        Ok(())
    }
}

/// One numeric cutoff and the tier it yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierCutoff {
    /// Bound compared against the signal.
    pub bound: f64,
    /// Tier when the bound is crossed.
    pub tier: SeverityTier,
}

/// How a factor's tier is derived from a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FactorRule {
    /// Always the factor's default severity. Reads no signal.
    Fixed,
    /// A string signal looked up in a table.
    Categorical {
        /// Signal name.
        signal: String,
        /// Label to tier.
        table: BTreeMap<String, SeverityTier>,
        /// Tier for a missing or unlisted label.
        unknown: SeverityTier,
    },
    /// A numeric signal compared against ordered cutoffs. The first cutoff
    /// crossed wins; `otherwise` applies when none is.
    NumericBands {
        /// Signal name.
        signal: String,
        /// Which side of a bound triggers it.
        direction: Direction,
        /// Cutoffs, most extreme first.
        cutoffs: Vec<TierCutoff>,
        /// Tier when no cutoff is crossed.
        otherwise: SeverityTier,
        /// Tier for a missing or non-numeric signal.
        unknown: SeverityTier,
    },
}

/// A factor's tier and whether real input produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorReading {
    /// Evaluated tier.
    pub tier: SeverityTier,
    /// False when the `unknown` tier was used.
    pub supplied: bool,
}

impl FactorRule {
    /// The signal this rule reads, if any.
    pub fn signal(&self) -> Option<&str> {
        match self {
            Self::Fixed => None,
            Self::Categorical { signal, .. } | Self::NumericBands { signal, .. } => Some(signal),
        }
    }

    /// Evaluate against `profile`. `default` is the factor's default severity.
    pub fn evaluate(&self, default: SeverityTier, profile: &SystemProfile) -> FactorReading {
        match self {
            Self::Fixed => FactorReading {
                tier: default,
                supplied: true,
            },
            Self::Categorical {
                signal,
                table,
                unknown,
            } => match profile.text(signal).and_then(|label| table.get(label)) {
                Some(tier) => FactorReading {
                    tier: *tier,
                    supplied: true,
                },
                None => FactorReading {
                    tier: *unknown,
                    supplied: false,
                },
            },
            Self::NumericBands {
                signal,
                direction,
                cutoffs,
                otherwise,
                unknown,
            } => match profile.number(signal) {
                Some(value) => FactorReading {
                    tier: cutoffs
                        .iter()
                        .find(|c| direction.crosses(value, c.bound))
                        .map_or(*otherwise, |c| c.tier),
                    supplied: true,
                },
                None => FactorReading {
                    tier: *unknown,
                    supplied: false,
                },
            },
        }
    }

    fn validate(&self, context: &str) -> Result<(), ConfigurationError> {
        let unknown = match self {
            Self::Fixed => return Ok(()),
            Self::Categorical { table, unknown, .. } => {
                if table.is_empty() {
                    return Err(ConfigurationError::InvalidDecisionTable {
                        context: context.to_string(),
                        reason: "categorical table has no entries".into(),
                    });
                }
                *unknown
            }
            Self::NumericBands {
                direction,
                cutoffs,
                unknown,
                ..
            } => {
                let bounds: Vec<f64> = cutoffs.iter().map(|c| c.bound).collect();
                direction.check_bounds(context, &bounds)?;
                *unknown
            }
        };
        if unknown < SeverityTier::MEDIAN {
            return Err(ConfigurationError::LenientUnknownTier {
                context: context.to_string(),
                tier: unknown,
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// One risk factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    /// Identifier, unique across dimensions.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Weight within its dimension.
    pub weight: f64,
    /// Tier used by [`FactorRule::Fixed`].
    pub default_severity: SeverityTier,
    /// What the factor measures.
    #[serde(default)]
    pub description: String,
    /// Mitigation notes.
    #[serde(default)]
    pub mitigation: Vec<String>,
    /// Decision table.
    pub rule: FactorRule,
}

/// A dimension's weight and factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionPolicy {
    /// Weight in the overall score.
    pub weight: f64,
    /// Factors.
    pub factors: Vec<RiskFactor>,
}

/// The risk section of a governance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// Days until a risk assessment should be repeated.
    pub review_days: u32,
    /// Dimensions.
    pub dimensions: BTreeMap<RiskDimension, DimensionPolicy>,
}

impl RiskPolicy {
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        if self.dimensions.is_empty() {
            return Err(ConfigurationError::Empty("risk.dimensions".into()));
        }
        let mut seen = BTreeSet::new();
        for (dimension, policy) in &self.dimensions {
            check_weight(&format!("risk dimension {dimension}"), policy.weight)?;
            if policy.factors.is_empty() {
                return Err(ConfigurationError::Empty(format!(
                    "risk.dimensions.{dimension}.factors"
                )));
            }
            for factor in &policy.factors {
                if !seen.insert(factor.id.as_str()) {
                    return Err(ConfigurationError::Duplicate {
                        kind: "risk factor",
                        name: factor.id.clone(),
                    });
                }
                let context = format!("risk factor {}", factor.id);
                check_weight(&context, factor.weight)?;
                factor.rule.validate(&context)?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// One evaluated factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorScore {
    /// Factor id.
    pub factor: String,
    /// Display name.
    pub name: String,
    /// Owning dimension.
    pub dimension: RiskDimension,
    /// Evaluated tier.
    pub tier: SeverityTier,
    /// False when the factor fell back to its `unknown` tier.
    pub supplied: bool,
}

/// Complete risk assessment of one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Overall score on the severity scale, labelled with the risk level.
    pub overall: Assessment,
    /// Per-dimension assessments. Dimensions whose factors carry no weight
    /// are absent.
    pub dimensions: BTreeMap<RiskDimension, Assessment>,
    /// Every evaluated factor.
    pub factors: Vec<FactorScore>,
    /// Names of factors at high or critical severity.
    pub critical_factors: Vec<String>,
}

/// Summary of a [`RiskAssessment`] for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    /// The system.
    pub subject: SubjectId,
    /// Display name.
    pub system_name: String,
    /// Risk level label.
    pub risk_level: String,
    /// Overall severity score.
    pub overall_score: f64,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// When the assessment was made.
    pub assessed_at: Timestamp,
    /// Dimension scores.
    pub dimension_scores: BTreeMap<RiskDimension, f64>,
    /// Dimension with the highest score.
    pub highest_dimension: Option<RiskDimension>,
    /// Dimension with the lowest score.
    pub lowest_dimension: Option<RiskDimension>,
    /// Names of factors at high or critical severity.
    pub critical_factors: Vec<String>,
    /// Actions warranted right away.
    pub immediate_actions: Vec<String>,
    /// Up to three dimensions scoring at least 3, highest first.
    pub mitigation_priorities: Vec<String>,
}

impl RiskAssessment {
    /// Summarize for `profile`.
    pub fn report(&self, profile: &SystemProfile) -> RiskReport {
        let mut ranked: Vec<(RiskDimension, f64)> =
            self.dimensions.iter().map(|(d, a)| (*d, a.score)).collect();
        // Highest score first; ties keep dimension order.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        let score_of = |d: RiskDimension| self.dimensions.get(&d).map_or(0.0, |a| a.score);
        let mut immediate_actions = Vec::new();
        if self.overall.score >= 4.0 {
            immediate_actions.push("Immediately review system for critical vulnerabilities".into());
            immediate_actions.push("Implement emergency monitoring protocols".into());
        }
        if !self.critical_factors.is_empty() {
            immediate_actions.push("Address critical risk factors identified in assessment".into());
        }
        if score_of(RiskDimension::Regulatory) >= 4.0 {
            immediate_actions.push("Conduct urgent regulatory compliance review".into());
        }
        if score_of(RiskDimension::Ethical) >= 4.0 {
            immediate_actions.push("Implement bias monitoring and fairness controls".into());
        }

        let mitigation_priorities = ranked
            .iter()
            .take(3)
            .filter(|(_, score)| *score >= 3.0)
            .map(|(d, score)| format!("Address {} risk (score {score:.1})", d.title()))
            .collect();

        RiskReport {
            subject: self.overall.subject.clone(),
            system_name: profile.name.clone(),
            risk_level: self.overall.status.clone(),
            overall_score: self.overall.score,
            confidence: self.overall.confidence,
            assessed_at: self.overall.assessed_at,
            dimension_scores: ranked.iter().copied().collect(),
            highest_dimension: ranked.first().map(|(d, _)| *d),
            lowest_dimension: ranked.last().map(|(d, _)| *d),
            critical_factors: self.critical_factors.clone(),
            immediate_actions,
            mitigation_priorities,
        }
    }
}

// ---------------------------------------------------------------------------
// Assessor
// ---------------------------------------------------------------------------

/// Produces [`RiskAssessment`]s from a governance policy.
pub struct RiskAssessor {
    config: Arc<GovernanceConfig>,
    clock: Arc<dyn ClockSource>,
    assessor: AssessorId,
    engine: ScoringEngine,
}

impl RiskAssessor {
    /// Create an assessor.
    pub fn new(
        config: Arc<GovernanceConfig>,
        clock: Arc<dyn ClockSource>,
        assessor: AssessorId,
    ) -> Self {
        Self {
            config,
            clock,
            assessor,
            engine: ScoringEngine,
        }
    }

    /// Assess `profile` across every configured dimension.
    pub fn assess(&self, profile: &SystemProfile) -> Result<RiskAssessment, ScoringError> {
        let policy = &self.config.risk;
        let table = &self.config.thresholds.risk_level;
        let now = self.clock.now();
        let next_review = now.plus_days(policy.review_days);

        let mut factors = Vec::new();
        let mut dimensions = BTreeMap::new();
        let mut dimension_inputs = Vec::new();
        let (mut total_expected, mut total_supplied) = (0usize, 0usize);

        for (dimension, dimension_policy) in &policy.dimensions {
            let mut inputs = Vec::with_capacity(dimension_policy.factors.len());
            let mut gaps = Vec::new();
            let mut remediation = Vec::new();
            let mut expected = 0usize;
            let mut supplied = 0usize;

            for factor in &dimension_policy.factors {
                let reading = factor.rule.evaluate(factor.default_severity, profile);
                if factor.rule.signal().is_some() {
                    expected += 1;
                    supplied += usize::from(reading.supplied);
                }
                if reading.tier >= SeverityTier::High {
                    gaps.push(format!("{} ({})", factor.name, reading.tier));
                    remediation.extend(factor.mitigation.iter().cloned());
                }
                inputs.push(WeightedScore::new(
                    factor.id.as_str(),
                    factor.weight,
                    f64::from(reading.tier.value()),
                ));
                factors.push(FactorScore {
                    factor: factor.id.clone(),
                    name: factor.name.clone(),
                    dimension: *dimension,
                    tier: reading.tier,
                    supplied: reading.supplied,
                });
            }

            total_expected += expected;
            total_supplied += supplied;

            let ctx = EvaluationContext {
                subject: &profile.subject,
                scope: AssessmentScope::RiskDimension {
                    dimension: *dimension,
                },
                classifier: table,
                completeness: completeness(supplied, expected),
                gaps,
                remediation,
                assessor: &self.assessor,
                assessed_at: now,
                next_review,
            };
            match self.engine.evaluate(ctx, &inputs) {
                Ok(assessment) => {
                    dimension_inputs.push(WeightedScore::new(
                        dimension.as_str(),
                        dimension_policy.weight,
                        assessment.score,
                    ));
                    dimensions.insert(*dimension, assessment);
                }
                Err(err) if err.is_undetermined() => {
                    tracing::warn!(
                        subject = %profile.subject,
                        dimension = %dimension,
                        "risk dimension undetermined, excluded from overall score"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        let critical_factors: Vec<String> = factors
            .iter()
            .filter(|f| f.tier >= SeverityTier::High)
            .map(|f| f.name.clone())
            .collect();

        let ctx = EvaluationContext {
            subject: &profile.subject,
            scope: AssessmentScope::OverallRisk,
            classifier: table,
            completeness: completeness(total_supplied, total_expected),
            gaps: critical_factors.clone(),
            remediation: Vec::new(),
            assessor: &self.assessor,
            assessed_at: now,
            next_review,
        };
        let overall = self.engine.evaluate(ctx, &dimension_inputs)?;

        tracing::info!(
            subject = %profile.subject,
            score = overall.score,
            level = %overall.status,
            critical = critical_factors.len(),
            "risk assessment complete"
        );

        Ok(RiskAssessment {
            overall,
            dimensions,
            factors,
            critical_factors,
        })
    }
}

fn completeness(supplied: usize, expected: usize) -> f64 {
    if expected == 0 {
        1.0
    } else {
        supplied as f64 / expected as f64
    }
}
