//! # System Profiles
//!
//! What an assessor knows about an AI system: named input signals (flags,
//! measurements, categorical labels) and, optionally, the event kinds its
//! audit trail shows. A signal that is absent or of the wrong type counts as
//! missing; assessors never guess a value for it.

use std::collections::{BTreeMap, BTreeSet};

use aigov_core::{EventKind, FrameworkId, SubjectId};
use aigov_ledger::AuditEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Assessment input for one system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemProfile {
    /// The system.
    pub subject: SubjectId,
    /// Display name.
    pub name: String,
    /// Named input signals.
    #[serde(default)]
    pub signals: BTreeMap<String, Value>,
    /// Event kinds observed in the audit trail, when the trail was consulted.
    #[serde(default)]
    pub observed_events: Option<BTreeSet<EventKind>>,
}

impl SystemProfile {
    /// A profile with no signals.
    pub fn new(subject: SubjectId, name: impl Into<String>) -> Self {
        Self {
            subject,
            name: name.into(),
            signals: BTreeMap::new(),
            observed_events: None,
        }
    }

    /// Set one signal.
    pub fn with_signal(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.signals.insert(name.into(), value.into());
        self
    }

    /// Record the event kinds `events` show for this subject under
    /// `framework`, or under any framework when `framework` is `None`.
    pub fn with_audit_trail<'a>(
        mut self,
        events: impl IntoIterator<Item = &'a AuditEvent>,
        framework: Option<FrameworkId>,
    ) -> Self {
        let kinds: Vec<EventKind> = events
            .into_iter()
            .filter(|e| e.subject == self.subject)
            .filter(|e| framework.map_or(true, |f| e.declares(f)))
            .map(|e| e.kind)
            .collect();
        self.observed_events
            .get_or_insert_with(BTreeSet::new)
            .extend(kinds);
        self
    }

    /// Whether `name` is present at all.
    pub fn has_signal(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// A boolean signal.
    pub fn flag(&self, name: &str) -> Option<bool> {
        self.signals.get(name).and_then(Value::as_bool)
    }

    /// A finite numeric signal.
    pub fn number(&self, name: &str) -> Option<f64> {
        self.signals
            .get(name)
            .and_then(Value::as_f64)
            .filter(|n| n.is_finite())
    }

    /// A string signal.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.signals.get(name).and_then(Value::as_str)
    }
}
