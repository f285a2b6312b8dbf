//! # Retention
//!
//! How long an event must be kept: the longest retention period among the
//! frameworks it declares, or the default period when it declares none.
//! Retention is advisory. The ledger never deletes events; callers use the
//! deadline to decide what may be archived.

use std::collections::BTreeMap;

use aigov_core::{FrameworkId, Timestamp};
use serde::{Deserialize, Serialize};

use crate::event::AuditEvent;

/// Retention periods in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Days per framework.
    #[serde(default)]
    pub days: BTreeMap<FrameworkId, u32>,
    /// Days for frameworks not listed and for events declaring none.
    pub default_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            days: BTreeMap::from([
                (FrameworkId::Gdpr, 2190),
                (FrameworkId::EuAiAct, 2555),
                (FrameworkId::Iso42001, 2190),
            ]),
            default_days: 2555,
        }
    }
}

impl RetentionPolicy {
    /// Days an event declaring `frameworks` must be retained.
    pub fn retention_days<'a>(&self, frameworks: impl IntoIterator<Item = &'a FrameworkId>) -> u32 {
        frameworks
            .into_iter()
            .map(|f| self.days.get(f).copied().unwrap_or(self.default_days))
            .max()
            .unwrap_or(self.default_days)
    }

    /// The earliest time `event` may be archived.
    pub fn retention_deadline(&self, event: &AuditEvent) -> Timestamp {
        event
            .recorded_at
            .plus_days(self.retention_days(&event.frameworks))
    }

    /// Whether `event` is past its retention deadline at `now`.
    pub fn is_expired(&self, event: &AuditEvent, now: Timestamp) -> bool {
        now >= self.retention_deadline(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_declared_period_wins() {
        let policy = RetentionPolicy::default();
        assert_eq!(policy.retention_days(&[FrameworkId::Gdpr]), 2190);
        assert_eq!(
            policy.retention_days(&[FrameworkId::Gdpr, FrameworkId::EuAiAct]),
            2555
        );
    }

    #[test]
    fn undeclared_and_unlisted_use_default() {
        let policy = RetentionPolicy {
            days: BTreeMap::from([(FrameworkId::Gdpr, 30)]),
            default_days: 365,
        };
        assert_eq!(policy.retention_days(&[]), 365);
        assert_eq!(policy.retention_days(&[FrameworkId::Hipaa]), 365);
        assert_eq!(policy.retention_days(&[FrameworkId::Gdpr]), 30);
    }

    #[test]
    fn policy_loads_from_json() {
        let policy: RetentionPolicy =
            serde_json::from_str(r#"{"days": {"hipaa": 2190}, "default_days": 100}"#).unwrap();
        assert_eq!(policy.retention_days(&[FrameworkId::Hipaa]), 2190);
    }
}
