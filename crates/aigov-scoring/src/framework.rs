//! # Framework Compliance
//!
//! Every framework is assessed by the same function over its own criteria
//! table. A criterion turns one profile signal (or the audit trail) into a
//! percent score; a requirement is the weighted mean of its criteria; a
//! framework is the weighted mean of its requirements; the system score
//! aggregates frameworks with the configured framework weights.
//!
//! ## Missing Evidence
//!
//! A criterion with no real input scores its penalizing fallback: the
//! unsatisfied score for evidence criteria, the `unknown` score for graded
//! criteria, and zero for audit-trail coverage. Missing input lowers both
//! the score and the reported confidence.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aigov_core::{AssessorId, ClockSource, EventKind, FrameworkId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::assessment::{Assessment, AssessmentScope};
use crate::config::{check_score, check_weight, GovernanceConfig};
use crate::engine::{EvaluationContext, ScoringEngine, WeightedScore};
use crate::error::{ConfigurationError, ScoringError};
use crate::gap::GapAnalyzer;
use crate::profile::SystemProfile;
use crate::remediation::{priority_actions, PriorityAction, RemediationPlan};
use crate::risk::Direction;
use crate::status::{labels, ScoreScale};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// One numeric cutoff and the score it yields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCutoff {
    /// Bound compared against the signal.
    pub bound: f64,
    /// Percent score when the bound is crossed.
    pub score: f64,
}

/// How a criterion is scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CriterionRule {
    /// A boolean signal: present and true, or not.
    Evidence {
        /// Signal name.
        signal: String,
        /// Score when the signal is true.
        satisfied: f64,
        /// Score when it is false or missing.
        unsatisfied: f64,
    },
    /// Share of the listed event kinds present in the audit trail.
    EventCoverage {
        /// Required event kinds.
        events: BTreeSet<EventKind>,
    },
    /// A numeric signal compared against ordered cutoffs.
    Graded {
        /// Signal name.
        signal: String,
        /// Which side of a bound triggers it.
        direction: Direction,
        /// Cutoffs, most extreme first.
        cutoffs: Vec<ScoreCutoff>,
        /// Score when no cutoff is crossed.
        otherwise: f64,
        /// Score for a missing or non-numeric signal.
        unknown: f64,
    },
}

/// A weighted, scored check shared by one or more requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Weight within a requirement.
    pub weight: f64,
    /// Scoring rule.
    pub rule: CriterionRule,
    /// Gap reported when the criterion fails.
    pub gap: String,
    /// Remediation reported with the gap.
    pub remediation: String,
}

/// A compliance requirement of one framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRequirement {
    /// Identifier, unique across frameworks.
    pub id: String,
    /// Title.
    pub title: String,
    /// Whether failing it blocks certification.
    #[serde(default)]
    pub mandatory: bool,
    /// Weight within the framework.
    pub weight: f64,
    /// Remediation category (a key of the remediation templates).
    pub category: String,
    /// Criterion ids.
    pub criteria: Vec<String>,
    /// Evidence an auditor expects to see.
    #[serde(default)]
    pub evidence: Vec<String>,
}

/// One framework's criteria and requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkPolicy {
    /// Display name.
    pub name: String,
    /// Weight in the system score.
    pub weight: f64,
    /// Criteria by id.
    pub criteria: BTreeMap<String, Criterion>,
    /// Requirements.
    pub requirements: Vec<ComplianceRequirement>,
}

impl FrameworkPolicy {
    pub(crate) fn validate(
        &self,
        framework: FrameworkId,
        categories: &BTreeSet<&str>,
        requirement_ids: &mut BTreeSet<String>,
    ) -> Result<(), ConfigurationError> {
        check_weight(&format!("framework {framework}"), self.weight)?;
        if self.criteria.is_empty() {
            return Err(ConfigurationError::Empty(format!("frameworks.{framework}.criteria")));
        }
        if self.requirements.is_empty() {
            return Err(ConfigurationError::Empty(format!(
                "frameworks.{framework}.requirements"
            )));
        }
        for (id, criterion) in &self.criteria {
            let context = format!("criterion {framework}/{id}");
            check_weight(&context, criterion.weight)?;
            criterion.rule.validate(&context)?;
        }
        for req in &self.requirements {
            if !requirement_ids.insert(req.id.clone()) {
                return Err(ConfigurationError::Duplicate {
                    kind: "requirement",
                    name: req.id.clone(),
                });
            }
            let context = format!("requirement {}", req.id);
            check_weight(&context, req.weight)?;
            if req.criteria.is_empty() {
                return Err(ConfigurationError::Empty(format!("{context} criteria")));
            }
            if let Some(missing) = req.criteria.iter().find(|c| !self.criteria.contains_key(*c)) {
                return Err(ConfigurationError::UndefinedReference {
                    context,
                    kind: "criterion",
                    name: missing.clone(),
                });
            }
            if !categories.contains(req.category.as_str()) {
                return Err(ConfigurationError::UndefinedReference {
                    context,
                    kind: "remediation category",
                    name: req.category.clone(),
                });
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Criterion evaluation
// ---------------------------------------------------------------------------

struct CriterionReading {
    score: f64,
    supplied: bool,
    missing_events: BTreeSet<EventKind>,
}

impl CriterionRule {
    fn evaluate(&self, profile: &SystemProfile, analyzer: &GapAnalyzer) -> CriterionReading {
        match self {
            Self::Evidence {
                signal,
                satisfied,
                unsatisfied,
            } => {
                let flag = profile.flag(signal);
                CriterionReading {
                    score: if flag == Some(true) { *satisfied } else { *unsatisfied },
                    supplied: flag.is_some(),
                    missing_events: BTreeSet::new(),
                }
            }
            Self::EventCoverage { events } => match &profile.observed_events {
                Some(observed) => {
                    let gap = analyzer.analyze(events, observed);
                    CriterionReading {
                        score: gap.coverage_percent(),
                        supplied: true,
                        missing_events: gap.missing,
                    }
                }
                None => CriterionReading {
                    score: 0.0,
                    supplied: false,
                    missing_events: events.clone(),
                },
            },
            Self::Graded {
                signal,
                direction,
                cutoffs,
                otherwise,
                unknown,
            } => match profile.number(signal) {
                Some(value) => CriterionReading {
                    score: cutoffs
                        .iter()
                        .find(|c| direction.crosses(value, c.bound))
                        .map_or(*otherwise, |c| c.score),
                    supplied: true,
                    missing_events: BTreeSet::new(),
                },
                None => CriterionReading {
                    score: *unknown,
                    supplied: false,
                    missing_events: BTreeSet::new(),
                },
            },
        }
    }

    fn validate(&self, context: &str) -> Result<(), ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidDecisionTable {
            context: context.to_string(),
            reason,
        };
        match self {
            Self::Evidence {
                satisfied,
                unsatisfied,
                ..
            } => {
                check_score(&format!("{context} satisfied"), *satisfied, ScoreScale::Percent)?;
                check_score(&format!("{context} unsatisfied"), *unsatisfied, ScoreScale::Percent)?;
                if unsatisfied > satisfied {
                    return Err(invalid(format!(
                        "unsatisfied score {unsatisfied} exceeds satisfied score {satisfied}"
                    )));
                }
            }
            Self::EventCoverage { events } => {
                if events.is_empty() {
                    return Err(invalid("no required event kinds".into()));
                }
            }
            Self::Graded {
                direction,
                cutoffs,
                otherwise,
                unknown,
                ..
            } => {
                let bounds: Vec<f64> = cutoffs.iter().map(|c| c.bound).collect();
                direction.check_bounds(context, &bounds)?;
                for cutoff in cutoffs {
                    check_score(context, cutoff.score, ScoreScale::Percent)?;
                }
                check_score(&format!("{context} otherwise"), *otherwise, ScoreScale::Percent)?;
                check_score(&format!("{context} unknown"), *unknown, ScoreScale::Percent)?;
                if *unknown > UNKNOWN_SCORE_CEILING {
                    return Err(invalid(format!(
                        "unknown score {unknown} is above {UNKNOWN_SCORE_CEILING}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A graded criterion with no input never scores above the scale midpoint.
const UNKNOWN_SCORE_CEILING: f64 = 50.0;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Assessment of one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementAssessment {
    /// Owning framework.
    pub framework: FrameworkId,
    /// Requirement id.
    pub requirement: String,
    /// Title.
    pub title: String,
    /// Remediation category.
    pub category: String,
    /// Whether failing it blocks certification.
    pub mandatory: bool,
    /// Weight within the framework.
    pub weight: f64,
    /// Gap-risk label for the score.
    pub risk_level: String,
    /// Whether the score clears the gap threshold.
    pub evidence_provided: bool,
    /// Evidence an auditor expects.
    pub expected_evidence: Vec<String>,
    /// Criteria evaluated from real input.
    pub criteria_supplied: usize,
    /// Criteria evaluated.
    pub criteria_total: usize,
    /// The scored assessment.
    pub assessment: Assessment,
}

/// Assessment of one framework.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkAssessment {
    /// The framework.
    pub framework: FrameworkId,
    /// Display name.
    pub name: String,
    /// Weight in the system score.
    pub weight: f64,
    /// The scored assessment.
    pub assessment: Assessment,
    /// Requirement assessments, in policy order.
    pub requirements: Vec<RequirementAssessment>,
    /// Requirements whose criteria carry no weight.
    pub undetermined: Vec<String>,
}

/// Why a requirement is a critical gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticalGapReason {
    /// The score falls in the critical gap-risk band.
    CriticalRisk,
    /// A mandatory requirement scores below the gap threshold.
    MandatoryFailed,
}

/// A requirement that blocks certification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriticalGap {
    /// Owning framework.
    pub framework: FrameworkId,
    /// Requirement id.
    pub requirement: String,
    /// Title.
    pub title: String,
    /// Score.
    pub score: f64,
    /// Why it is critical.
    pub reason: CriticalGapReason,
}

/// Compliance of one system across several frameworks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemComplianceReport {
    /// The system.
    pub subject: SubjectId,
    /// Display name.
    pub system_name: String,
    /// When the report was produced.
    pub assessed_at: Timestamp,
    /// Overall score, labelled with the compliance status.
    pub overall: Assessment,
    /// Determined framework assessments.
    pub frameworks: BTreeMap<FrameworkId, FrameworkAssessment>,
    /// Requested frameworks that could not be scored.
    pub undetermined_frameworks: Vec<FrameworkId>,
    /// Requirements blocking certification.
    pub critical_gaps: Vec<CriticalGap>,
    /// Dated actions, most urgent first.
    pub priority_actions: Vec<PriorityAction>,
    /// Whether the overall score meets the certification minimum with no
    /// critical gaps.
    pub certification_ready: bool,
    /// When to assess again.
    pub next_assessment: Timestamp,
}

impl SystemComplianceReport {
    /// Every requirement assessment, framework by framework.
    pub fn requirements(&self) -> impl Iterator<Item = &RequirementAssessment> {
        self.frameworks.values().flat_map(|f| f.requirements.iter())
    }

    /// Overall compliance score.
    pub fn score(&self) -> f64 {
        self.overall.score
    }
}

// ---------------------------------------------------------------------------
// Assessor
// ---------------------------------------------------------------------------

/// Produces compliance assessments from a governance policy.
pub struct ComplianceAssessor {
    config: Arc<GovernanceConfig>,
    clock: Arc<dyn ClockSource>,
    assessor: AssessorId,
    engine: ScoringEngine,
    analyzer: GapAnalyzer,
}

impl ComplianceAssessor {
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
            analyzer: GapAnalyzer,
        }
    }

    /// Assess one framework.
    pub fn assess_framework(
        &self,
        profile: &SystemProfile,
        framework: FrameworkId,
    ) -> Result<FrameworkAssessment, ScoringError> {
        self.framework_at(profile, framework, self.clock.now())
    }

    /// Assess `frameworks`, or every configured framework when `None`.
    pub fn assess_system(
        &self,
        profile: &SystemProfile,
        frameworks: Option<&[FrameworkId]>,
    ) -> Result<SystemComplianceReport, ScoringError> {
        let now = self.clock.now();
        let requested: Vec<FrameworkId> = match frameworks {
            Some(list) => list.to_vec(),
            None => self.config.frameworks.keys().copied().collect(),
        };
        let policy = &self.config.compliance;

        let mut assessed = BTreeMap::new();
        let mut undetermined_frameworks = Vec::new();
        for framework in requested {
            match self.framework_at(profile, framework, now) {
                Ok(assessment) => {
                    assessed.insert(framework, assessment);
                }
                Err(err) if err.is_undetermined() => {
                    tracing::warn!(
                        subject = %profile.subject,
                        framework = %framework,
                        "framework undetermined, excluded from overall score"
                    );
                    undetermined_frameworks.push(framework);
                }
                Err(err) => return Err(err),
            }
        }

        let critical_gaps: Vec<CriticalGap> = assessed
            .values()
            .flat_map(|f| f.requirements.iter())
            .filter_map(|req| {
                let reason = if req.risk_level == labels::CRITICAL {
                    CriticalGapReason::CriticalRisk
                } else if req.mandatory && req.assessment.score < policy.gap_threshold {
                    CriticalGapReason::MandatoryFailed
                } else {
                    return None;
                };
                Some(CriticalGap {
                    framework: req.framework,
                    requirement: req.requirement.clone(),
                    title: req.title.clone(),
                    score: req.assessment.score,
                    reason,
                })
            })
            .collect();

        let actions = priority_actions(assessed.values().flat_map(|f| f.requirements.iter()), now);

        let (supplied, total) = assessed
            .values()
            .flat_map(|f| f.requirements.iter())
            .fold((0, 0), |(s, t), r| (s + r.criteria_supplied, t + r.criteria_total));
        let inputs: Vec<WeightedScore> = assessed
            .values()
            .map(|f| WeightedScore::new(f.framework.as_str(), f.weight, f.assessment.score))
            .collect();
        let next_assessment = now.plus_days(policy.assessment_interval_days);
        let ctx = EvaluationContext {
            subject: &profile.subject,
            scope: AssessmentScope::OverallCompliance,
            classifier: &self.config.thresholds.compliance,
            completeness: ratio(supplied, total),
            gaps: critical_gaps
                .iter()
                .map(|g| format!("{}: {}", g.requirement, g.title))
                .collect(),
            remediation: actions.iter().map(|a| a.action.clone()).collect(),
            assessor: &self.assessor,
            assessed_at: now,
            next_review: next_assessment,
        };
        let overall = self.engine.evaluate(ctx, &inputs)?;
        let certification_ready =
            overall.score >= policy.certification_minimum && critical_gaps.is_empty();

        tracing::info!(
            subject = %profile.subject,
            score = overall.score,
            status = %overall.status,
            critical_gaps = critical_gaps.len(),
            certification_ready,
            "compliance assessment complete"
        );

        Ok(SystemComplianceReport {
            subject: profile.subject.clone(),
            system_name: profile.name.clone(),
            assessed_at: now,
            overall,
            frameworks: assessed,
            undetermined_frameworks,
            critical_gaps,
            priority_actions: actions,
            certification_ready,
            next_assessment,
        })
    }

    /// Remediation plan for `report` under this assessor's policy.
    pub fn remediation_plan(&self, report: &SystemComplianceReport) -> RemediationPlan {
        let policy = &self.config.compliance;
        RemediationPlan::for_report(
            report,
            &self.config.remediation,
            policy.improvement_threshold,
            policy.target_score,
        )
    }

    fn framework_at(
        &self,
        profile: &SystemProfile,
        framework: FrameworkId,
        now: Timestamp,
    ) -> Result<FrameworkAssessment, ScoringError> {
        let policy = self
            .config
            .frameworks
            .get(&framework)
            .ok_or(ScoringError::UnknownFramework(framework))?;
        let gap_threshold = self.config.compliance.gap_threshold;

        let mut requirements = Vec::with_capacity(policy.requirements.len());
        let mut undetermined = Vec::new();
        for req in &policy.requirements {
            match self.requirement_at(profile, framework, policy, req, now) {
                Ok(assessment) => requirements.push(assessment),
                Err(err) if err.is_undetermined() => {
                    tracing::warn!(
                        subject = %profile.subject,
                        framework = %framework,
                        requirement = %req.id,
                        "requirement undetermined, excluded from framework score"
                    );
                    undetermined.push(req.id.clone());
                }
                Err(err) => return Err(err),
            }
        }

        let inputs: Vec<WeightedScore> = requirements
            .iter()
            .map(|r| WeightedScore::new(r.requirement.as_str(), r.weight, r.assessment.score))
            .collect();
        let (supplied, total) = requirements
            .iter()
            .fold((0, 0), |(s, t), r| (s + r.criteria_supplied, t + r.criteria_total));
        let weak: Vec<&RequirementAssessment> = requirements
            .iter()
            .filter(|r| r.assessment.score < gap_threshold)
            .collect();
        let mut remediation: Vec<String> = Vec::new();
        for line in weak.iter().flat_map(|r| r.assessment.remediation.iter()) {
            if !remediation.contains(line) {
                remediation.push(line.clone());
            }
        }
        let ctx = EvaluationContext {
            subject: &profile.subject,
            scope: AssessmentScope::Framework { framework },
            classifier: &self.config.thresholds.compliance,
            completeness: ratio(supplied, total),
            gaps: weak.iter().map(|r| format!("{}: {}", r.requirement, r.title)).collect(),
            remediation,
            assessor: &self.assessor,
            assessed_at: now,
            next_review: now.plus_days(self.config.compliance.assessment_interval_days),
        };
        let assessment = self.engine.evaluate(ctx, &inputs)?;

        Ok(FrameworkAssessment {
            framework,
            name: policy.name.clone(),
            weight: policy.weight,
            assessment,
            requirements,
            undetermined,
        })
    }

    fn requirement_at(
        &self,
        profile: &SystemProfile,
        framework: FrameworkId,
        policy: &FrameworkPolicy,
        req: &ComplianceRequirement,
        now: Timestamp,
    ) -> Result<RequirementAssessment, ScoringError> {
        let compliance = &self.config.compliance;
        let mut inputs = Vec::with_capacity(req.criteria.len());
        let mut gaps = Vec::new();
        let mut remediation = Vec::new();
        let mut supplied = 0usize;

        for id in &req.criteria {
            // Validated at load: every referenced criterion exists.
            let Some(criterion) = policy.criteria.get(id) else {
                continue;
            };
            let reading = criterion.rule.evaluate(profile, &self.analyzer);
            supplied += usize::from(reading.supplied);
            if reading.score < compliance.gap_threshold {
                if reading.missing_events.is_empty() {
                    gaps.push(criterion.gap.clone());
                } else {
                    let missing: Vec<&str> =
                        reading.missing_events.iter().map(EventKind::as_str).collect();
                    gaps.push(format!("{} (missing: {})", criterion.gap, missing.join(", ")));
                }
                remediation.push(criterion.remediation.clone());
            }
            inputs.push(WeightedScore::new(id.as_str(), criterion.weight, reading.score));
        }

        let ctx = EvaluationContext {
            subject: &profile.subject,
            scope: AssessmentScope::Requirement {
                framework,
                requirement: req.id.clone(),
            },
            classifier: &self.config.thresholds.compliance,
            completeness: ratio(supplied, inputs.len()),
            gaps,
            remediation,
            assessor: &self.assessor,
            assessed_at: now,
            next_review: now.plus_days(compliance.requirement_review_days),
        };
        let assessment = self.engine.evaluate(ctx, &inputs)?;
        let risk_level = self
            .config
            .thresholds
            .gap_risk
            .classify(assessment.score)
            .to_string();

        Ok(RequirementAssessment {
            framework,
            requirement: req.id.clone(),
            title: req.title.clone(),
            category: req.category.clone(),
            mandatory: req.mandatory,
            weight: req.weight,
            risk_level,
            evidence_provided: assessment.score > compliance.gap_threshold,
            expected_evidence: req.evidence.clone(),
            criteria_supplied: supplied,
            criteria_total: inputs.len(),
            assessment,
        })
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        1.0
    } else {
        part as f64 / whole as f64
    }
}
