//! # Scoring Engine
//!
//! Two-level weighted aggregation shared by every assessor:
//!
//! - Level (a), [`ScoringEngine::weighted_mean`]: criterion or factor scores
//!   into one requirement or dimension score.
//! - Level (b), [`ScoringEngine::aggregate`]: dimension or framework scores
//!   into one overall score, with a consistency measure.
//!
//! ## Determinism
//!
//! Inputs are clamped to their declared bounds and then accumulated in
//! canonical order (key, weight, score). The same multiset of inputs
//! therefore yields the same bits regardless of the order it was supplied
//! in. NaN scores clamp to the scale's most pessimistic value and NaN
//! weights to zero.
//!
//! ## Undetermined Scores
//!
//! A zero total weight has no meaningful mean. It is reported as
//! [`ScoringError::Undetermined`] and never coerced to a number.

use serde::{Deserialize, Serialize};

use aigov_core::{AssessorId, SubjectId, Timestamp};

use crate::assessment::{Assessment, AssessmentScope};
use crate::error::ScoringError;
use crate::status::{ScoreScale, ThresholdTable};

/// One keyed, weighted input to an aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedScore {
    /// Stable identifier of the input (criterion, factor, dimension).
    pub key: String,
    /// Weight, clamped to [0, 1] before use.
    pub weight: f64,
    /// Score, clamped to the aggregation's scale before use.
    pub score: f64,
}

impl WeightedScore {
    /// Create an input.
    pub fn new(key: impl Into<String>, weight: f64, score: f64) -> Self {
        Self {
            key: key.into(),
            weight,
            score,
        }
    }
}

/// Result of a level (b) aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    /// Weighted mean of the contributing scores.
    pub score: f64,
    /// `1 − 2·var` of the unit-normalized contributing scores, in [0.5, 1].
    pub consistency: f64,
    /// Number of inputs with non-zero weight.
    pub contributing: usize,
}

/// Everything [`ScoringEngine::evaluate`] needs besides the inputs.
#[derive(Debug, Clone)]
pub struct EvaluationContext<'a> {
    /// The assessed system.
    pub subject: &'a SubjectId,
    /// What is being scored.
    pub scope: AssessmentScope,
    /// Table that labels the score. Its scale is the score's scale.
    pub classifier: &'a ThresholdTable,
    /// Fraction of expected input signals actually supplied.
    pub completeness: f64,
    /// Gaps found while producing the inputs.
    pub gaps: Vec<String>,
    /// Remediation for those gaps.
    pub remediation: Vec<String>,
    /// Who is assessing.
    pub assessor: &'a AssessorId,
    /// Assessment time.
    pub assessed_at: Timestamp,
    /// When to review again.
    pub next_review: Timestamp,
}

/// Stateless aggregation. Holds no configuration; weights arrive with the
/// inputs.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringEngine;

impl ScoringEngine {
    /// `Σ(w·s) / Σ(w)` over `inputs` on `scale`.
    pub fn weighted_mean(
        &self,
        context: &str,
        inputs: &[WeightedScore],
        scale: ScoreScale,
    ) -> Result<f64, ScoringError> {
        let canonical = canonicalize(inputs, scale);
        mean_of(context, &canonical, scale)
    }

    /// Weighted mean plus consistency over the inputs that carry weight.
    pub fn aggregate(
        &self,
        context: &str,
        dimensions: &[WeightedScore],
        scale: ScoreScale,
    ) -> Result<Aggregate, ScoringError> {
        let canonical = canonicalize(dimensions, scale);
        let score = mean_of(context, &canonical, scale)?;
        let contributing: Vec<f64> = canonical
            .iter()
            .filter(|(_, w, _)| *w > 0.0)
            .map(|(_, _, s)| *s)
            .collect();
        Ok(Aggregate {
            score,
            consistency: consistency(&contributing, scale),
            contributing: contributing.len(),
        })
    }

    /// `completeness × consistency`, in [0, 1].
    pub fn confidence(&self, completeness: f64, scores: &[f64], scale: ScoreScale) -> f64 {
        let clamped: Vec<f64> = scores.iter().map(|s| scale.clamp(*s)).collect();
        unit(completeness) * consistency(&clamped, scale)
    }

    /// Aggregate `inputs` and classify the result into an [`Assessment`].
    pub fn evaluate(
        &self,
        ctx: EvaluationContext<'_>,
        inputs: &[WeightedScore],
    ) -> Result<Assessment, ScoringError> {
        let scale = ctx.classifier.scale();
        let aggregate = self.aggregate(&ctx.scope.to_string(), inputs, scale)?;
        let confidence = unit(ctx.completeness) * aggregate.consistency;
        let status = ctx.classifier.classify(aggregate.score).to_string();

        tracing::debug!(
            subject = %ctx.subject,
            scope = %ctx.scope,
            score = aggregate.score,
            status = %status,
            confidence,
            "assessment evaluated"
        );

        Ok(Assessment {
            subject: ctx.subject.clone(),
            scope: ctx.scope,
            score: aggregate.score,
            scale,
            status,
            confidence,
            gaps: ctx.gaps,
            remediation: ctx.remediation,
            assessor: ctx.assessor.clone(),
            assessed_at: ctx.assessed_at,
            next_review: ctx.next_review,
        })
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

fn canonicalize(inputs: &[WeightedScore], scale: ScoreScale) -> Vec<(&str, f64, f64)> {
    let mut canonical: Vec<(&str, f64, f64)> = inputs
        .iter()
        .map(|i| (i.key.as_str(), unit(i.weight), scale.clamp(i.score)))
        .collect();
    canonical.sort_by(|a, b| {
        a.0.cmp(b.0)
            .then_with(|| a.1.total_cmp(&b.1))
            .then_with(|| a.2.total_cmp(&b.2))
    });
    canonical
}

fn mean_of(
    context: &str,
    canonical: &[(&str, f64, f64)],
    scale: ScoreScale,
) -> Result<f64, ScoringError> {
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (_, weight, score) in canonical {
        weighted += weight * score;
        total += weight;
    }
    if total <= 0.0 {
        return Err(ScoringError::Undetermined {
            context: context.to_string(),
        });
    }
    Ok(scale.clamp(weighted / total))
}

fn consistency(scores: &[f64], scale: ScoreScale) -> f64 {
    if scores.len() < 2 {
        return 1.0;
    }
    let normalized: Vec<f64> = scores.iter().map(|s| scale.normalize(*s)).collect();
    let n = normalized.len() as f64;
    let mean = normalized.iter().sum::<f64>() / n;
    let variance = normalized.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    (1.0 - 2.0 * variance).clamp(0.5, 1.0)
}

fn unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigov_core::FrameworkId;

    fn ws(key: &str, weight: f64, score: f64) -> WeightedScore {
        WeightedScore::new(key, weight, score)
    }

    #[test]
    fn weighted_mean_of_percent_scores() {
        let mean = ScoringEngine
            .weighted_mean(
                "t",
                &[ws("a", 1.0, 80.0), ws("b", 0.5, 20.0)],
                ScoreScale::Percent,
            )
            .unwrap();
        assert!((mean - 60.0).abs() < 1e-9);
    }

    #[test]
    fn zero_weights_are_undetermined() {
        let err = ScoringEngine
            .weighted_mean("gdpr", &[ws("a", 0.0, 80.0)], ScoreScale::Percent)
            .unwrap_err();
        assert!(err.is_undetermined());
        assert!(ScoringEngine
            .weighted_mean("empty", &[], ScoreScale::Percent)
            .unwrap_err()
            .is_undetermined());
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        let mean = ScoringEngine
            .weighted_mean(
                "t",
                &[ws("a", 7.0, 250.0), ws("b", -1.0, 0.0)],
                ScoreScale::Percent,
            )
            .unwrap();
        assert_eq!(mean, 100.0);
    }

    #[test]
    fn nan_is_pessimistic() {
        let mean = ScoringEngine
            .weighted_mean(
                "t",
                &[ws("a", 1.0, f64::NAN), ws("b", 1.0, 3.0)],
                ScoreScale::Severity,
            )
            .unwrap();
        assert_eq!(mean, 4.0);
        let err = ScoringEngine
            .weighted_mean("t", &[ws("a", f64::NAN, 50.0)], ScoreScale::Percent)
            .unwrap_err();
        assert!(err.is_undetermined());
    }

    #[test]
    fn consistency_drops_with_spread() {
        let agg = ScoringEngine
            .aggregate(
                "t",
                &[ws("a", 1.0, 1.0), ws("b", 1.0, 5.0)],
                ScoreScale::Severity,
            )
            .unwrap();
        assert_eq!(agg.consistency, 0.5);
        assert_eq!(agg.contributing, 2);
        let single = ScoringEngine
            .aggregate("t", &[ws("a", 1.0, 2.0)], ScoreScale::Severity)
            .unwrap();
        assert_eq!(single.consistency, 1.0);
    }

    #[test]
    fn zero_weight_dimension_does_not_affect_consistency() {
        let agg = ScoringEngine
            .aggregate(
                "t",
                &[ws("a", 1.0, 50.0), ws("b", 0.0, 0.0)],
                ScoreScale::Percent,
            )
            .unwrap();
        assert_eq!(agg.consistency, 1.0);
        assert_eq!(agg.contributing, 1);
    }

    #[test]
    fn evaluate_classifies_and_reports_confidence() {
        let subject = SubjectId::new("sys-1").unwrap();
        let assessor = AssessorId::new("policy-engine").unwrap();
        let table = ThresholdTable::compliance_status();
        let at = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
        let ctx = EvaluationContext {
            subject: &subject,
            scope: AssessmentScope::Framework {
                framework: FrameworkId::Gdpr,
            },
            classifier: &table,
            completeness: 0.5,
            gaps: vec!["Legal basis not documented".into()],
            remediation: vec![],
            assessor: &assessor,
            assessed_at: at,
            next_review: at.plus_days(90),
        };
        let a = ScoringEngine
            .evaluate(ctx, &[ws("a", 1.0, 90.0), ws("b", 1.0, 90.0)])
            .unwrap();
        assert_eq!(a.status, "fully_compliant");
        assert_eq!(a.scale, ScoreScale::Percent);
        assert_eq!(a.confidence, 0.5);
        assert_eq!(a.gaps.len(), 1);
    }
}
