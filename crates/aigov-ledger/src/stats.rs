//! # Ledger Statistics
//!
//! Distribution of stored events by kind, declared risk tier and declared
//! framework, with the observed time span and the distinct subjects seen.

use std::collections::{BTreeMap, BTreeSet};

use aigov_core::{EventKind, FrameworkId, PartitionId, RiskTier, SubjectId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::event::AuditEvent;

/// Aggregate counts over a set of events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStatistics {
    /// Number of events counted.
    pub total_events: u64,
    /// Events per kind.
    pub by_kind: BTreeMap<EventKind, u64>,
    /// Events per declared risk tier.
    pub by_risk_tier: BTreeMap<RiskTier, u64>,
    /// Events per declared framework. An event declaring several frameworks
    /// counts once under each.
    pub by_framework: BTreeMap<FrameworkId, u64>,
    /// Distinct subjects.
    pub subjects: BTreeSet<SubjectId>,
    /// Distinct partitions.
    pub partitions: BTreeSet<PartitionId>,
    /// Earliest `recorded_at`.
    pub earliest: Option<Timestamp>,
    /// Latest `recorded_at`.
    pub latest: Option<Timestamp>,
}

impl LedgerStatistics {
    /// Count `events`.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AuditEvent>) -> Self {
        let mut stats = Self::default();
        for event in events {
            stats.record(event);
        }
        stats
    }

    fn record(&mut self, event: &AuditEvent) {
        self.total_events += 1;
        *self.by_kind.entry(event.kind).or_default() += 1;
        *self.by_risk_tier.entry(event.risk_tier).or_default() += 1;
        for framework in &event.frameworks {
            *self.by_framework.entry(*framework).or_default() += 1;
        }
        self.subjects.insert(event.subject.clone());
        self.partitions.insert(event.partition.clone());
        self.earliest = Some(match self.earliest {
            Some(t) => t.min(event.recorded_at),
            None => event.recorded_at,
        });
        self.latest = Some(match self.latest {
            Some(t) => t.max(event.recorded_at),
            None => event.recorded_at,
        });
    }

    /// Events of `kind`.
    pub fn count_of(&self, kind: EventKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Share of events declared high or critical risk, in [0, 1]. Zero when
    /// nothing was counted.
    pub fn elevated_risk_share(&self) -> f64 {
        if self.total_events == 0 {
            return 0.0;
        }
        let elevated: u64 = self
            .by_risk_tier
            .iter()
            .filter(|(tier, _)| tier.is_elevated())
            .map(|(_, n)| n)
            .sum();
        elevated as f64 / self.total_events as f64
    }
}
