//! # Status Classification
//!
//! A [`ThresholdTable`] partitions a score scale into labelled bands. Each
//! band starts at its `min` and runs up to the next band's `min`; the top
//! band runs to the end of the scale. `classify` is total: every score,
//! including NaN and out-of-range values, maps to exactly one label.
//!
//! ## Invariants (checked at construction)
//!
//! - Boundaries are finite and strictly increasing.
//! - The lowest boundary equals the scale's lower bound, so the axis has no
//!   uncovered prefix.
//! - The highest boundary lies within the scale.
//! - Labels are distinct and non-empty.

use serde::{Deserialize, Serialize};

use crate::error::ConfigurationError;

/// Labels the assessors rely on in the gap-risk table.
pub mod labels {
    /// Highest gap risk.
    pub const CRITICAL: &str = "critical";
    /// Second-highest gap risk.
    pub const HIGH: &str = "high";
    /// Middle gap risk.
    pub const MEDIUM: &str = "medium";
}

/// The bounded range a score lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreScale {
    /// Compliance percentage, 0 to 100. Higher is better.
    Percent,
    /// Risk severity, 1 to 5. Higher is worse.
    Severity,
}

impl ScoreScale {
    /// Lower bound.
    pub fn min(self) -> f64 {
        match self {
            Self::Percent => 0.0,
            Self::Severity => 1.0,
        }
    }

    /// Upper bound.
    pub fn max(self) -> f64 {
        match self {
            Self::Percent => 100.0,
            Self::Severity => 5.0,
        }
    }

    /// The most pessimistic value on the scale.
    pub fn worst(self) -> f64 {
        match self {
            Self::Percent => self.min(),
            Self::Severity => self.max(),
        }
    }

    /// Clamp into bounds. NaN becomes the most pessimistic value.
    pub fn clamp(self, score: f64) -> f64 {
        if score.is_nan() {
            return self.worst();
        }
        score.clamp(self.min(), self.max())
    }

    /// Map a clamped score onto [0, 1].
    pub fn normalize(self, score: f64) -> f64 {
        (self.clamp(score) - self.min()) / (self.max() - self.min())
    }
}

/// One band: scores at or above `min` (and below the next band) get `label`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Inclusive lower boundary.
    pub min: f64,
    /// Status label.
    pub label: String,
}

#[derive(Deserialize)]
struct RawThresholdTable {
    scale: ScoreScale,
    bands: Vec<Band>,
}

/// Validated threshold table. Bands are stored highest boundary first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdTable {
    scale: ScoreScale,
    bands: Vec<Band>,
}

impl ThresholdTable {
    /// Build and validate a table named `name` (used in error messages).
    /// Bands may be given in any order.
    pub fn new(
        name: &str,
        scale: ScoreScale,
        mut bands: Vec<Band>,
    ) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidThresholds {
            table: name.to_string(),
            reason,
        };

        if bands.is_empty() {
            return Err(invalid("no bands".into()));
        }
        if let Some(b) = bands.iter().find(|b| !b.min.is_finite()) {
            return Err(invalid(format!("boundary {} is not finite", b.min)));
        }
        if let Some(b) = bands.iter().find(|b| b.label.trim().is_empty()) {
            return Err(invalid(format!("band at {} has an empty label", b.min)));
        }

        bands.sort_by(|a, b| b.min.total_cmp(&a.min));
        for pair in bands.windows(2) {
            if pair[0].min == pair[1].min {
                return Err(invalid(format!(
                    "boundary {} appears more than once",
                    pair[0].min
                )));
            }
        }
        for (i, band) in bands.iter().enumerate() {
            if bands[..i].iter().any(|other| other.label == band.label) {
                return Err(invalid(format!("label {:?} appears more than once", band.label)));
            }
        }

        let lowest = bands[bands.len() - 1].min;
        if lowest != scale.min() {
            return Err(invalid(format!(
                "lowest boundary {lowest} leaves [{}, {lowest}) unlabelled",
                scale.min()
            )));
        }
        let highest = bands[0].min;
        if highest > scale.max() {
            return Err(invalid(format!(
                "boundary {highest} exceeds the scale maximum {}",
                scale.max()
            )));
        }

        Ok(Self { scale, bands })
    }

    /// The scale this table partitions.
    pub fn scale(&self) -> ScoreScale {
        self.scale
    }

    /// Bands, highest boundary first.
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Whether some band carries `label`.
    pub fn has_label(&self, label: &str) -> bool {
        self.bands.iter().any(|b| b.label == label)
    }

    /// Label of the highest band whose boundary is at or below `score`.
    /// NaN and scores below the scale map to the lowest band.
    pub fn classify(&self, score: f64) -> &str {
        let lowest = &self.bands[self.bands.len() - 1];
        if score.is_nan() {
            return &lowest.label;
        }
        self.bands
            .iter()
            .find(|b| b.min <= score)
            .unwrap_or(lowest)
            .label
            .as_str()
    }

    /// The standard compliance-status table.
    pub fn compliance_status() -> Self {
        Self::standard(
            ScoreScale::Percent,
            &[
                (90.0, "fully_compliant"),
                (75.0, "substantially_compliant"),
                (50.0, "partially_compliant"),
                (0.0, "non_compliant"),
            ],
        )
    }

    /// The standard gap-risk table on the percent scale.
    pub fn gap_risk() -> Self {
        Self::standard(
            ScoreScale::Percent,
            &[
                (90.0, "negligible"),
                (75.0, "low"),
                (50.0, labels::MEDIUM),
                (25.0, labels::HIGH),
                (0.0, labels::CRITICAL),
            ],
        )
    }

    /// The standard risk-level table on the severity scale.
    pub fn risk_level() -> Self {
        Self::standard(
            ScoreScale::Severity,
            &[
                (4.0, "critical"),
                (3.0, "high"),
                (2.0, "medium"),
                (1.0, "low"),
            ],
        )
    }

    // Built-in tables are valid by construction; skip validation.
    fn standard(scale: ScoreScale, bands: &[(f64, &str)]) -> Self {
        Self {
            scale,
            bands: bands
                .iter()
                .map(|(min, label)| Band {
                    min: *min,
                    label: (*label).to_string(),
                })
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for ThresholdTable {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawThresholdTable::deserialize(deserializer)?;
        Self::new("thresholds", raw.scale, raw.bands).map_err(serde::de::Error::custom)
    }
}
