//! # Gap Analysis
//!
//! Compares what is required against what was observed. Works over any
//! ordered item type: event kinds logged against a framework's required
//! kinds, requirement ids evidenced against a framework's requirement set.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Outcome of comparing a required set with an observed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GapAnalysis<T: Ord> {
    /// Required items not observed.
    pub missing: BTreeSet<T>,
    /// Required items observed.
    pub satisfied: BTreeSet<T>,
    /// `|satisfied| / |required|`, 1.0 when nothing is required.
    pub coverage: f64,
}

impl<T: Ord> GapAnalysis<T> {
    /// Whether every required item was observed.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    /// Coverage on the percent scale.
    pub fn coverage_percent(&self) -> f64 {
        self.coverage * 100.0
    }
}

/// Stateless required-versus-observed comparison.
#[derive(Debug, Clone, Copy, Default)]
pub struct GapAnalyzer;

impl GapAnalyzer {
    /// Compare `required` with `observed`. Observed items that are not
    /// required are ignored.
    pub fn analyze<T: Ord + Clone>(
        &self,
        required: &BTreeSet<T>,
        observed: &BTreeSet<T>,
    ) -> GapAnalysis<T> {
        let satisfied: BTreeSet<T> = required.intersection(observed).cloned().collect();
        let missing: BTreeSet<T> = required.difference(observed).cloned().collect();
        let coverage = if required.is_empty() {
            1.0
        } else {
            satisfied.len() as f64 / required.len() as f64
        };
        GapAnalysis {
            missing,
            satisfied,
            coverage,
        }
    }
}
