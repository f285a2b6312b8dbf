//! # Audit-Trail Coverage
//!
//! How well a system's audit trail supports one framework. Events recorded
//! in a time window and declaring the framework are gap-analyzed against
//! the event kinds the framework requires. The score is the weighted mean
//! of kind coverage and logging volume (relative to an expected volume),
//! both on the percent scale, computed by the [`ScoringEngine`].
//!
//! A framework that requires no event kinds scores 100: there is nothing
//! the trail could be missing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use aigov_core::{AssessorId, ClockSource, EventKind, FrameworkId, SubjectId, Timestamp};
use aigov_ledger::{AuditEvent, EventLedger, LedgerStatistics, RetentionPolicy};
use serde::{Deserialize, Serialize};

use crate::assessment::{Assessment, AssessmentScope};
use crate::config::{check_weight, GovernanceConfig};
use crate::engine::{EvaluationContext, ScoringEngine, WeightedScore};
use crate::error::{ConfigurationError, ScoringError};
use crate::gap::{GapAnalysis, GapAnalyzer};

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What the audit trail must show for one framework.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditRequirements {
    /// Retention period in days; the policy default when absent.
    #[serde(default)]
    pub retention_days: Option<u32>,
    /// Event kinds that must appear in the window.
    #[serde(default)]
    pub required_events: BTreeSet<EventKind>,
    /// Standing recommendations for this framework.
    #[serde(default)]
    pub notes: Vec<String>,
}

/// The audit section of a governance policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditPolicy {
    /// Default window length, ending now.
    pub window_days: u32,
    /// Event count at which the volume score saturates.
    pub expected_volume: u32,
    /// Weight of kind coverage.
    pub coverage_weight: f64,
    /// Weight of volume.
    pub volume_weight: f64,
    /// Share of high or critical risk events above which enhanced
    /// monitoring is recommended.
    pub elevated_share_limit: f64,
    /// Retention for frameworks without their own period.
    pub default_retention_days: u32,
    /// Per-framework requirements.
    #[serde(default)]
    pub frameworks: BTreeMap<FrameworkId, AuditRequirements>,
}

impl AuditPolicy {
    pub(crate) fn validate(&self) -> Result<(), ConfigurationError> {
        check_weight("audit coverage", self.coverage_weight)?;
        check_weight("audit volume", self.volume_weight)?;
        check_weight("audit elevated share limit", self.elevated_share_limit)?;
        if self.coverage_weight + self.volume_weight <= 0.0 {
            return Err(ConfigurationError::WeightOutOfRange {
                context: "audit coverage plus volume".into(),
                value: 0.0,
            });
        }
        if self.expected_volume == 0 {
            return Err(ConfigurationError::ScoreOutOfRange {
                context: "audit expected volume".into(),
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        if self.window_days == 0 {
            return Err(ConfigurationError::ScoreOutOfRange {
                context: "audit window days".into(),
                value: 0.0,
                min: 1.0,
                max: f64::from(u32::MAX),
            });
        }
        Ok(())
    }

    /// Retention periods as the ledger understands them.
    pub fn retention_policy(&self) -> RetentionPolicy {
        RetentionPolicy {
            days: self
                .frameworks
                .iter()
                .filter_map(|(f, r)| r.retention_days.map(|d| (*f, d)))
                .collect(),
            default_days: self.default_retention_days,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Coverage of one framework by one system's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditCoverageReport {
    /// The framework.
    pub framework: FrameworkId,
    /// Window start, inclusive.
    pub window_start: Timestamp,
    /// Window end, inclusive.
    pub window_end: Timestamp,
    /// Scored assessment, labelled with the compliance status.
    pub assessment: Assessment,
    /// Required kinds found and missing.
    pub gap: GapAnalysis<EventKind>,
    /// Distribution of the events considered.
    pub statistics: LedgerStatistics,
    /// Recommended follow-ups.
    pub recommendations: Vec<String>,
}

/// Scores audit trails against a governance policy.
pub struct AuditCoverageAnalyzer {
    config: Arc<GovernanceConfig>,
    clock: Arc<dyn ClockSource>,
    assessor: AssessorId,
    engine: ScoringEngine,
    analyzer: GapAnalyzer,
}

impl AuditCoverageAnalyzer {
    /// Create an analyzer.
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

    /// Read `subject`'s events from `ledger` and score them. `window`
    /// defaults to the policy window ending now.
    pub fn analyze_ledger(
        &self,
        ledger: &EventLedger,
        subject: &SubjectId,
        framework: FrameworkId,
        window: Option<(Timestamp, Timestamp)>,
    ) -> Result<AuditCoverageReport, ScoringError> {
        let (start, end) = self.window(window);
        let events = ledger.events_between(start, end)?;
        self.analyze_events(&events, subject, framework, Some((start, end)))
    }

    /// Score `events`. Events of other subjects, outside the window, or not
    /// declaring `framework` are ignored.
    pub fn analyze_events(
        &self,
        events: &[AuditEvent],
        subject: &SubjectId,
        framework: FrameworkId,
        window: Option<(Timestamp, Timestamp)>,
    ) -> Result<AuditCoverageReport, ScoringError> {
        let policy = &self.config.audit;
        let now = self.clock.now();
        let (start, end) = self.window(window);

        let selected: Vec<&AuditEvent> = events
            .iter()
            .filter(|e| &e.subject == subject)
            .filter(|e| e.recorded_at >= start && e.recorded_at <= end)
            .filter(|e| e.declares(framework))
            .collect();
        let statistics = LedgerStatistics::from_events(selected.iter().copied());

        let requirements = policy.frameworks.get(&framework).cloned().unwrap_or_default();
        let observed: BTreeSet<EventKind> = statistics.by_kind.keys().copied().collect();
        let gap = self.analyzer.analyze(&requirements.required_events, &observed);

        let inputs = if requirements.required_events.is_empty() {
            vec![WeightedScore::new("coverage", 1.0, 100.0)]
        } else {
            let volume = (statistics.total_events as f64 / f64::from(policy.expected_volume)).min(1.0);
            vec![
                WeightedScore::new("coverage", policy.coverage_weight, gap.coverage_percent()),
                WeightedScore::new("volume", policy.volume_weight, volume * 100.0),
            ]
        };

        let mut recommendations = Vec::new();
        let mut gaps = Vec::new();
        if !gap.missing.is_empty() {
            let missing: Vec<&str> = gap.missing.iter().map(EventKind::as_str).collect();
            gaps.extend(missing.iter().map(|k| format!("no {k} events logged")));
            recommendations.push(format!(
                "Implement logging for missing event types: {}",
                missing.join(", ")
            ));
        }
        if statistics.elevated_risk_share() > policy.elevated_share_limit {
            recommendations
                .push("High proportion of high-risk events requires enhanced monitoring".into());
        }
        recommendations.extend(requirements.notes.iter().cloned());

        let ctx = EvaluationContext {
            subject,
            scope: AssessmentScope::AuditTrail { framework },
            classifier: &self.config.thresholds.compliance,
            completeness: 1.0,
            gaps,
            remediation: recommendations.clone(),
            assessor: &self.assessor,
            assessed_at: now,
            next_review: now.plus_days(policy.window_days),
        };
        let assessment = self.engine.evaluate(ctx, &inputs)?;

        tracing::debug!(
            subject = %subject,
            framework = %framework,
            events = statistics.total_events,
            coverage = gap.coverage,
            score = assessment.score,
            "audit coverage scored"
        );

        Ok(AuditCoverageReport {
            framework,
            window_start: start,
            window_end: end,
            assessment,
            gap,
            statistics,
            recommendations,
        })
    }

    fn window(&self, window: Option<(Timestamp, Timestamp)>) -> (Timestamp, Timestamp) {
        window.unwrap_or_else(|| {
            let now = self.clock.now();
            (now.minus_days(self.config.audit.window_days), now)
        })
    }
}
