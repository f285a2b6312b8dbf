//! # Remediation
//!
//! Turns compliance findings into work: dated priority actions for the
//! riskiest requirements, and a plan that groups weak requirements by
//! remediation category and attaches the policy's template for each.

use std::collections::BTreeMap;

use aigov_core::{FrameworkId, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::framework::{RequirementAssessment, SystemComplianceReport};
use crate::status::labels;

/// Number of medium-risk requirements turned into actions.
const MEDIUM_ACTION_LIMIT: usize = 3;

/// A reusable remediation package for one category of gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationTemplate {
    /// Short title.
    pub title: String,
    /// What the package achieves.
    pub description: String,
    /// Concrete steps.
    pub actions: Vec<String>,
    /// Expected duration, free text.
    pub timeline: String,
}

/// Urgency of a [`PriorityAction`]. Orders most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    /// Critical gap risk.
    Critical,
    /// High gap risk.
    High,
    /// Medium gap risk.
    Medium,
}

impl ActionPriority {
    /// Days allowed to act.
    pub fn due_in_days(self) -> u32 {
        match self {
            Self::Critical => 14,
            Self::High => 30,
            Self::Medium => 60,
        }
    }

    fn from_gap_risk(label: &str) -> Option<Self> {
        match label {
            labels::CRITICAL => Some(Self::Critical),
            labels::HIGH => Some(Self::High),
            labels::MEDIUM => Some(Self::Medium),
            _ => None,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Self::Critical => "Address critical compliance gap",
            Self::High => "Improve compliance",
            Self::Medium => "Enhance compliance",
        }
    }
}

/// One dated action against one requirement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityAction {
    /// Urgency.
    pub priority: ActionPriority,
    /// Owning framework.
    pub framework: FrameworkId,
    /// Requirement id.
    pub requirement: String,
    /// What to do.
    pub action: String,
    /// Days allowed.
    pub due_in_days: u32,
    /// Deadline.
    pub due_by: Timestamp,
}

/// Actions for every critical and high gap-risk requirement and the first
/// three medium ones, most urgent first. Order within a priority follows
/// the input order.
pub fn priority_actions<'a>(
    requirements: impl IntoIterator<Item = &'a RequirementAssessment>,
    now: Timestamp,
) -> Vec<PriorityAction> {
    let mut actions = Vec::new();
    let mut medium = 0usize;
    for req in requirements {
        let Some(priority) = ActionPriority::from_gap_risk(&req.risk_level) else {
            continue;
        };
        if priority == ActionPriority::Medium {
            if medium == MEDIUM_ACTION_LIMIT {
                continue;
            }
            medium += 1;
        }
        actions.push(PriorityAction {
            priority,
            framework: req.framework,
            requirement: req.requirement.clone(),
            action: format!("{}: {}", priority.verb(), req.requirement),
            due_in_days: priority.due_in_days(),
            due_by: now.plus_days(priority.due_in_days()),
        });
    }
    // Stable, so input order survives within a priority.
    actions.sort_by_key(|a| a.priority);
    actions
}

/// One category of work in a [`RemediationPlan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationItem {
    /// Category key.
    pub category: String,
    /// Template title.
    pub title: String,
    /// Template description.
    pub description: String,
    /// Template actions.
    pub actions: Vec<String>,
    /// Template timeline.
    pub timeline: String,
    /// Gaps this item addresses.
    pub gaps_addressed: Vec<String>,
}

/// Work needed to lift a system to the target score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationPlan {
    /// The system.
    pub subject: SubjectId,
    /// Display name.
    pub system_name: String,
    /// When the underlying report was produced.
    pub planned_at: Timestamp,
    /// Current overall compliance score.
    pub current_score: f64,
    /// Score the plan aims for.
    pub target_score: f64,
    /// Number of critical gaps outstanding.
    pub critical_gaps: usize,
    /// Work items by category.
    pub items: Vec<RemediationItem>,
}

impl RemediationPlan {
    /// Group the gaps of every requirement scoring below
    /// `improvement_threshold` by category, one item per category.
    pub fn for_report(
        report: &SystemComplianceReport,
        templates: &BTreeMap<String, RemediationTemplate>,
        improvement_threshold: f64,
        target_score: f64,
    ) -> Self {
        let mut grouped: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for req in report.requirements() {
            if req.assessment.score < improvement_threshold {
                grouped
                    .entry(req.category.as_str())
                    .or_default()
                    .extend(req.assessment.gaps.iter().cloned());
            }
        }

        let items = grouped
            .into_iter()
            .filter_map(|(category, gaps)| {
                let Some(template) = templates.get(category) else {
                    tracing::warn!(category, "no remediation template for category");
                    return None;
                };
                Some(RemediationItem {
                    category: category.to_string(),
                    title: template.title.clone(),
                    description: template.description.clone(),
                    actions: template.actions.clone(),
                    timeline: template.timeline.clone(),
                    gaps_addressed: gaps,
                })
            })
            .collect();

        Self {
            subject: report.subject.clone(),
            system_name: report.system_name.clone(),
            planned_at: report.assessed_at,
            current_score: report.overall.score,
            target_score,
            critical_gaps: report.critical_gaps.len(),
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assessment::{Assessment, AssessmentScope};
    use crate::status::ScoreScale;
    use aigov_core::AssessorId;

    fn requirement(id: &str, risk_level: &str) -> RequirementAssessment {
        let at = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        RequirementAssessment {
            framework: FrameworkId::Gdpr,
            requirement: id.into(),
            title: id.into(),
            category: "documentation".into(),
            mandatory: false,
            weight: 1.0,
            risk_level: risk_level.into(),
            evidence_provided: false,
            expected_evidence: vec![],
            criteria_supplied: 1,
            criteria_total: 1,
            assessment: Assessment {
                subject: aigov_core::SubjectId::new("sys-1").unwrap(),
                scope: AssessmentScope::Requirement {
                    framework: FrameworkId::Gdpr,
                    requirement: id.into(),
                },
                score: 40.0,
                scale: ScoreScale::Percent,
                status: "non_compliant".into(),
                confidence: 1.0,
                gaps: vec![],
                remediation: vec![],
                assessor: AssessorId::new("a").unwrap(),
                assessed_at: at,
                next_review: at,
            },
        }
    }

    #[test]
    fn actions_sorted_by_urgency_with_medium_capped() {
        let reqs = vec![
            requirement("m1", "medium"),
            requirement("h1", "high"),
            requirement("m2", "medium"),
            requirement("c1", "critical"),
            requirement("m3", "medium"),
            requirement("m4", "medium"),
            requirement("ok", "negligible"),
        ];
        let now = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
        let actions = priority_actions(&reqs, now);
        let ids: Vec<&str> = actions.iter().map(|a| a.requirement.as_str()).collect();
        assert_eq!(ids, ["c1", "h1", "m1", "m2", "m3"]);
        assert_eq!(actions[0].due_in_days, 14);
        assert_eq!(actions[0].due_by.to_iso8601(), "2026-01-15T00:00:00Z");
        assert_eq!(actions[1].due_in_days, 30);
        assert_eq!(actions[4].due_in_days, 60);
        assert!(actions[0].action.starts_with("Address critical compliance gap"));
    }

    #[test]
    fn priorities_order_most_urgent_first() {
        assert!(ActionPriority::Critical < ActionPriority::High);
        assert!(ActionPriority::High < ActionPriority::Medium);
    }
}
