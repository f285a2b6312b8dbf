//! # Event Ledger
//!
//! [`EventLedger`] is the only writer of audit events. It validates drafts,
//! stamps them with an id and the injected clock's time, links them to the
//! partition tail, signs the chain hash with the key provider's active key,
//! and persists through the store's compare-and-swap on the tail.
//!
//! ## Concurrency
//!
//! Appends are optimistic. Two writers that read the same tail both compute
//! an event at the same sequence; the store accepts the first and rejects
//! the second with `Conflict`. [`EventLedger::append_with_retry`] re-reads the
//! tail and relinks the *same* pending event (same id, same timestamp), so a
//! retried append never produces a second identity for one action.
//!
//! ## Security Invariant
//!
//! Validation runs before the store is touched. A rejected draft leaves no
//! trace in any partition.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use aigov_core::{
    ActorId, BusinessImpact, ClockSource, EventId, EventKind, FrameworkId, PartitionId, RiskTier,
    SubjectId, Timestamp, ValidationError,
};
use aigov_crypto::{sign_chain_hash, KeyProvider};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::event::{AuditEvent, EventDraft, Metadata, PendingEvent};
use crate::export::{LedgerExport, EXPORT_FORMAT_VERSION};
use crate::stats::LedgerStatistics;
use crate::store::{Deadline, InMemoryStore, PersistentStore, Tail};
use crate::verify::{IntegrityReport, IntegrityVerifier, VerificationResult};

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Backoff schedule for [`EventLedger::append_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero behaves as one.
    pub max_attempts: u32,
    /// Sleep after the first retryable failure.
    pub initial_backoff: Duration,
    /// Upper bound on any single sleep.
    pub max_backoff: Duration,
    /// Deadline applied to each attempt's store calls.
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(200),
            attempt_timeout: Some(Duration::from_secs(1)),
        }
    }
}

impl RetryPolicy {
    /// Sleep before attempt `attempt + 1`, doubling from the initial backoff.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    fn deadline(&self) -> Deadline {
        self.attempt_timeout.map_or_else(Deadline::none, Deadline::within)
    }
}

// ---------------------------------------------------------------------------
// System registration
// ---------------------------------------------------------------------------

/// Registration of an AI system with the governance ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemRegistration {
    /// Id of the system being registered.
    pub system: SubjectId,
    /// Who registers it.
    pub registered_by: ActorId,
    /// Human-readable name.
    pub name: String,
    /// Kind of system, e.g. `credit_scoring` or `recommendation`.
    pub system_type: String,
    /// Declared risk tier.
    pub risk_tier: RiskTier,
    /// Declared business impact.
    pub business_impact: BusinessImpact,
    /// Frameworks the system falls under.
    #[serde(default)]
    pub frameworks: Vec<FrameworkId>,
    /// Additional registration attributes.
    #[serde(default)]
    pub attributes: Metadata,
}

// ---------------------------------------------------------------------------
// EventLedger
// ---------------------------------------------------------------------------

/// Append-only, tamper-evident audit ledger.
pub struct EventLedger {
    store: Arc<dyn PersistentStore>,
    keys: Arc<dyn KeyProvider>,
    clock: Arc<dyn ClockSource>,
    verifier: IntegrityVerifier,
}

impl std::fmt::Debug for EventLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLedger")
            .field("partitions", &self.store.partitions().len())
            .finish_non_exhaustive()
    }
}

impl EventLedger {
    /// A ledger over `store`, signing with `keys` and stamping with `clock`.
    pub fn new(
        store: Arc<dyn PersistentStore>,
        keys: Arc<dyn KeyProvider>,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        let verifier = IntegrityVerifier::new(Arc::clone(&keys));
        Self {
            store,
            keys,
            clock,
            verifier,
        }
    }

    /// A ledger over a fresh [`InMemoryStore`].
    pub fn in_memory(keys: Arc<dyn KeyProvider>, clock: Arc<dyn ClockSource>) -> Self {
        Self::new(Arc::new(InMemoryStore::new()), keys, clock)
    }

    /// The verifier this ledger uses, sharing its key provider.
    pub fn verifier(&self) -> &IntegrityVerifier {
        &self.verifier
    }

    // -- Append -------------------------------------------------------------

    /// Append `draft` at the current tail of its partition.
    pub fn append(&self, draft: EventDraft) -> Result<AuditEvent, LedgerError> {
        self.append_within(draft, Deadline::none())
    }

    /// [`append`](Self::append) with a deadline on every store call.
    pub fn append_within(
        &self,
        draft: EventDraft,
        deadline: Deadline,
    ) -> Result<AuditEvent, LedgerError> {
        let pending = self.prepare(draft, deadline)?;
        self.append_pending(&pending, deadline)
    }

    /// Append `draft` linked to `expected`. Fails with `Conflict` if the
    /// partition tail is no longer `expected`.
    pub fn append_expecting(
        &self,
        draft: EventDraft,
        expected: &Tail,
    ) -> Result<AuditEvent, LedgerError> {
        self.append_expecting_within(draft, expected, Deadline::none())
    }

    /// [`append_expecting`](Self::append_expecting) with a deadline.
    pub fn append_expecting_within(
        &self,
        draft: EventDraft,
        expected: &Tail,
        deadline: Deadline,
    ) -> Result<AuditEvent, LedgerError> {
        let pending = self.prepare(draft, deadline)?;
        self.commit(&pending, expected, deadline)
    }

    /// Append `draft`, retrying `Conflict` and `Timeout` with exponential
    /// backoff. Validation failures are returned at once.
    pub fn append_with_retry(
        &self,
        draft: EventDraft,
        policy: &RetryPolicy,
    ) -> Result<AuditEvent, LedgerError> {
        let pending = self.prepare(draft, policy.deadline())?;
        let max_attempts = policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.append_pending(&pending, policy.deadline()) {
                Ok(event) => return Ok(event),
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    let pause = policy.backoff(attempt);
                    tracing::warn!(
                        event = %pending.event_id,
                        partition = %pending.draft.partition,
                        attempt,
                        backoff_ms = pause.as_millis() as u64,
                        error = %err,
                        "retrying audit append"
                    );
                    std::thread::sleep(pause);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Register an AI system: appends a `configuration_changed` event to
    /// the system's partition carrying the registration attributes.
    pub fn register_system(
        &self,
        registration: SystemRegistration,
    ) -> Result<AuditEvent, LedgerError> {
        if registration.name.trim().is_empty() {
            return Err(ValidationError::MissingField("name").into());
        }
        let mut draft = EventDraft::new(
            EventKind::ConfigurationChanged,
            registration.system,
            registration.registered_by,
            format!("AI system registered: {}", registration.name),
        )
        .with_frameworks(registration.frameworks)
        .with_risk_tier(registration.risk_tier)
        .with_business_impact(registration.business_impact);
        draft.metadata = registration.attributes;
        draft = draft
            .with_metadata("action", "system_registration")
            .with_metadata("system_name", registration.name)
            .with_metadata("system_type", registration.system_type);
        let event = self.append_with_retry(draft, &RetryPolicy::default())?;
        tracing::info!(system = %event.subject, event = %event.event_id, "AI system registered");
        Ok(event)
    }

    fn prepare(&self, draft: EventDraft, deadline: Deadline) -> Result<PendingEvent, LedgerError> {
        draft.validate()?;
        if let Some(target) = draft.corrects {
            if self.store.find(&target, deadline)?.is_none() {
                return Err(ValidationError::UnknownCorrectionTarget(target.to_string()).into());
            }
        }
        Ok(PendingEvent::new(draft, self.clock.now()))
    }

    fn append_pending(
        &self,
        pending: &PendingEvent,
        deadline: Deadline,
    ) -> Result<AuditEvent, LedgerError> {
        let tail = self.store.tail(&pending.draft.partition, deadline)?;
        self.commit(pending, &tail, deadline)
    }

    fn commit(
        &self,
        pending: &PendingEvent,
        expected: &Tail,
        deadline: Deadline,
    ) -> Result<AuditEvent, LedgerError> {
        let (key_id, secret) = self.keys.current_key()?;
        let mut event = pending.place(expected.next_sequence(), expected.chain_hash, key_id);
        event.content_hash = event.compute_content_hash()?;
        event.chain_hash = event.compute_chain_hash();
        event.signature = sign_chain_hash(&secret, &event.chain_hash)?;

        match self.store.append(event.clone(), expected, deadline) {
            Ok(_) => {
                tracing::debug!(
                    partition = %event.partition,
                    sequence = event.sequence,
                    event = %event.event_id,
                    kind = %event.kind,
                    "audit event appended"
                );
                Ok(event)
            }
            Err(store_err) => {
                let err = LedgerError::from(store_err);
                if err.is_retryable() {
                    tracing::warn!(partition = %event.partition, sequence = event.sequence, error = %err, "audit append lost race");
                }
                Err(err)
            }
        }
    }

    // -- Read ---------------------------------------------------------------

    /// Current tail of `partition`.
    pub fn tail(&self, partition: &PartitionId) -> Result<Tail, LedgerError> {
        Ok(self.store.tail(partition, Deadline::none())?)
    }

    /// Look an event up by id.
    pub fn find(&self, event_id: &EventId) -> Result<AuditEvent, LedgerError> {
        self.store
            .find(event_id, Deadline::none())?
            .ok_or(LedgerError::EventNotFound(*event_id))
    }

    /// Stored events of `partition` at positions `from..=to`.
    pub fn read(
        &self,
        partition: &PartitionId,
        from: u64,
        to: u64,
    ) -> Result<Vec<AuditEvent>, LedgerError> {
        check_range(from, to)?;
        Ok(self
            .store
            .read_range(partition, from, to, Deadline::none())?
            .events)
    }

    /// Every stored event of `partition`.
    pub fn events(&self, partition: &PartitionId) -> Result<Vec<AuditEvent>, LedgerError> {
        let tail = self.tail(partition)?;
        if tail.sequence == 0 {
            return Ok(Vec::new());
        }
        self.read(partition, 1, tail.sequence)
    }

    /// Events of every partition recorded in `[start, end]`, ordered by
    /// partition then sequence.
    pub fn events_between(
        &self,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<AuditEvent>, LedgerError> {
        let mut selected = Vec::new();
        for partition in self.store.partitions() {
            selected.extend(
                self.events(&partition)?
                    .into_iter()
                    .filter(|e| e.recorded_at >= start && e.recorded_at <= end),
            );
        }
        Ok(selected)
    }

    /// Partitions holding at least one event.
    pub fn partitions(&self) -> Vec<PartitionId> {
        self.store.partitions()
    }

    /// Event distribution over one partition, or the whole ledger.
    pub fn statistics(
        &self,
        partition: Option<&PartitionId>,
    ) -> Result<LedgerStatistics, LedgerError> {
        let events = match partition {
            Some(p) => self.events(p)?,
            None => {
                let mut all = Vec::new();
                for p in self.store.partitions() {
                    all.extend(self.events(&p)?);
                }
                all
            }
        };
        Ok(LedgerStatistics::from_events(&events))
    }

    // -- Verify -------------------------------------------------------------

    /// Verify one event's hashes and signature without scanning its chain.
    pub fn verify_one(&self, event_id: &EventId) -> Result<VerificationResult, LedgerError> {
        let event = self.find(event_id)?;
        let result = self.verifier.verify_event(&event);
        if !result.is_valid() {
            tracing::error!(
                event = %event_id,
                partition = %event.partition,
                sequence = event.sequence,
                hash_ok = result.hash_ok,
                signature_ok = result.signature_ok,
                "audit event failed verification"
            );
        }
        Ok(result)
    }

    /// Verify positions `from..=to` of `partition` over one snapshot.
    pub fn verify_range(
        &self,
        partition: &PartitionId,
        from: u64,
        to: u64,
    ) -> Result<IntegrityReport, LedgerError> {
        self.verify_range_within(partition, from, to, Deadline::none())
    }

    /// [`verify_range`](Self::verify_range) with a deadline on the snapshot
    /// read.
    pub fn verify_range_within(
        &self,
        partition: &PartitionId,
        from: u64,
        to: u64,
        deadline: Deadline,
    ) -> Result<IntegrityReport, LedgerError> {
        check_range(from, to)?;
        let snapshot = self.store.read_range(partition, from, to, deadline)?;
        if to > snapshot.tail.sequence {
            return Err(ValidationError::InvalidRange {
                from,
                to,
                reason: "range extends past the partition tail",
            }
            .into());
        }
        Ok(self.verifier.verify_snapshot(&snapshot, from, to))
    }

    /// Verify a whole partition. An empty partition is clean.
    pub fn verify_partition(&self, partition: &PartitionId) -> Result<IntegrityReport, LedgerError> {
        let tail = self.tail(partition)?;
        if tail.sequence == 0 {
            return Ok(self.verifier.verify_chain(partition, &[]));
        }
        self.verify_range(partition, 1, tail.sequence)
    }

    // -- Export -------------------------------------------------------------

    /// Export `partition` with fingerprints of the keys its events name.
    pub fn export_partition(&self, partition: &PartitionId) -> Result<LedgerExport, LedgerError> {
        let snapshot = {
            let tail = self.tail(partition)?;
            self.store
                .read_range(partition, 1, tail.sequence, Deadline::none())?
        };
        let mut key_fingerprints = BTreeMap::new();
        for event in &snapshot.events {
            if key_fingerprints.contains_key(&event.key_id) {
                continue;
            }
            match self.keys.key_for(&event.key_id) {
                Ok(secret) => {
                    key_fingerprints.insert(event.key_id.clone(), secret.fingerprint());
                }
                Err(e) => {
                    tracing::warn!(key = %event.key_id, error = %e, "export omits fingerprint of unavailable key");
                }
            }
        }
        Ok(LedgerExport {
            format_version: EXPORT_FORMAT_VERSION,
            partition: partition.clone(),
            exported_at: self.clock.now(),
            tail_sequence: snapshot.tail.sequence,
            tail_chain_hash: snapshot.tail.chain_hash,
            key_fingerprints,
            events: snapshot.events,
        })
    }
}

fn check_range(from: u64, to: u64) -> Result<(), ValidationError> {
    if from == 0 {
        return Err(ValidationError::InvalidRange {
            from,
            to,
            reason: "sequences start at 1",
        });
    }
    if from > to {
        return Err(ValidationError::InvalidRange {
            from,
            to,
            reason: "from is after to",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aigov_core::{KeyId, ManualClock};
    use aigov_crypto::{Keyring, SigningSecret};

    struct Fixture {
        ledger: EventLedger,
        store: Arc<InMemoryStore>,
        keys: Arc<Keyring>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let keys = Arc::new(Keyring::new(
            KeyId::new("k1").unwrap(),
            SigningSecret::from_bytes([5; 32]),
        ));
        let clock = Arc::new(ManualClock::stepping(
            Timestamp::parse("2026-03-01T09:00:00Z").unwrap(),
            60,
        ));
        let ledger = EventLedger::new(store.clone(), keys.clone(), clock);
        Fixture { ledger, store, keys }
    }

    fn draft(subject: &str, description: &str) -> EventDraft {
        EventDraft::new(
            EventKind::PredictionMade,
            SubjectId::new(subject).unwrap(),
            ActorId::new("model-server").unwrap(),
            description,
        )
    }

    fn pid(s: &str) -> PartitionId {
        PartitionId::new(s).unwrap()
    }

    #[test]
    fn first_append_links_to_genesis() {
        let f = fixture();
        let e = f.ledger.append(draft("sys-1", "first")).unwrap();
        assert_eq!(e.sequence, 1);
        assert!(e.previous_chain_hash.is_genesis());
        assert_eq!(e.recorded_at, Timestamp::parse("2026-03-01T09:00:00Z").unwrap());
        let tail = f.ledger.tail(&pid("sys-1")).unwrap();
        assert_eq!(tail.sequence, 1);
        assert_eq!(tail.chain_hash, e.chain_hash);
    }

    #[test]
    fn appends_chain_and_verify() {
        let f = fixture();
        let a = f.ledger.append(draft("sys-1", "a")).unwrap();
        let b = f.ledger.append(draft("sys-1", "b")).unwrap();
        assert_eq!(b.sequence, 2);
        assert_eq!(b.previous_chain_hash, a.chain_hash);
        let v = f.ledger.verify_one(&b.event_id).unwrap();
        assert!(v.hash_ok && v.signature_ok);
        assert!(f.ledger.verify_range(&pid("sys-1"), 1, 2).unwrap().is_clean());
    }

    #[test]
    fn partitions_chain_independently() {
        let f = fixture();
        f.ledger.append(draft("sys-1", "a")).unwrap();
        let other = f.ledger.append(draft("sys-2", "b")).unwrap();
        assert_eq!(other.sequence, 1);
        assert_eq!(f.ledger.partitions(), vec![pid("sys-1"), pid("sys-2")]);
    }

    #[test]
    fn invalid_draft_writes_nothing() {
        let f = fixture();
        let err = f.ledger.append(draft("sys-1", "  ")).unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(!err.is_retryable());
        assert_eq!(f.ledger.tail(&pid("sys-1")).unwrap(), Tail::genesis());
    }

    #[test]
    fn correction_must_name_existing_event() {
        let f = fixture();
        let err = f
            .ledger
            .append(draft("sys-1", "fix").correcting(EventId::new()))
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::UnknownCorrectionTarget(_))
        ));
        let original = f.ledger.append(draft("sys-1", "oops")).unwrap();
        let fix = f
            .ledger
            .append(draft("sys-1", "fix").correcting(original.event_id))
            .unwrap();
        assert_eq!(fix.corrects, Some(original.event_id));
    }

    #[test]
    fn stale_expected_tail_conflicts() {
        let f = fixture();
        let stale = f.ledger.tail(&pid("sys-1")).unwrap();
        let winner = f.ledger.append_expecting(draft("sys-1", "w"), &stale).unwrap();
        let err = f
            .ledger
            .append_expecting(draft("sys-1", "l"), &stale)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Conflict { expected_sequence: 0, actual_sequence: 1, .. }));
        assert!(err.is_retryable());
        let retried = f.ledger.append_with_retry(draft("sys-1", "l"), &RetryPolicy::default()).unwrap();
        assert_eq!(retried.previous_chain_hash, winner.chain_hash);
    }

    #[test]
    fn held_partition_times_out_then_retry_gives_up() {
        let f = fixture();
        let hold = f.store.hold_partition(&pid("sys-1"));
        let policy = RetryPolicy {
            max_attempts: 2,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(1),
            attempt_timeout: Some(Duration::from_millis(5)),
        };
        let err = hold.while_held(|| f.ledger.append_with_retry(draft("sys-1", "x"), &policy).unwrap_err());
        assert!(matches!(err, LedgerError::Timeout { .. }));
    }

    #[test]
    fn verification_under_a_held_partition_times_out_then_succeeds() {
        let f = fixture();
        for i in 0..3 {
            f.ledger.append(draft("sys-1", &format!("e{i}"))).unwrap();
        }
        let hold = f.store.hold_partition(&pid("sys-1"));
        let err = hold.while_held(|| {
            f.ledger
                .verify_range_within(&pid("sys-1"), 1, 3, Deadline::within(Duration::from_millis(5)))
                .unwrap_err()
        });
        assert!(matches!(err, LedgerError::Timeout { .. }));
        assert!(err.is_retryable());
        let report = f
            .ledger
            .verify_range_within(&pid("sys-1"), 1, 3, Deadline::within(Duration::from_secs(1)))
            .unwrap();
        assert!(report.is_clean());
        assert_eq!(report.events_checked, 3);
    }

    #[test]
    fn float_metadata_survives_append_and_verification() {
        let f = fixture();
        let check = EventDraft::new(
            EventKind::BiasDetection,
            SubjectId::new("sys-1").unwrap(),
            ActorId::new("fairness-bot").unwrap(),
            "demographic parity check",
        )
        .with_metadata("bias_score", 0.02)
        .with_metadata("accuracy_improvement", 0.03);
        let event = f.ledger.append(check).unwrap();
        let v = f.ledger.verify_one(&event.event_id).unwrap();
        assert!(v.hash_ok && v.signature_ok);
        assert_eq!(event.metadata["bias_score"], 0.02);
        let export = f.ledger.export_partition(&pid("sys-1")).unwrap();
        let parsed = LedgerExport::from_json(&export.to_json().unwrap()).unwrap();
        assert!(IntegrityVerifier::new(f.keys.clone()).verify_export(&parsed).is_clean());
    }

    #[test]
    fn range_checks() {
        let f = fixture();
        f.ledger.append(draft("sys-1", "a")).unwrap();
        assert!(f.ledger.verify_range(&pid("sys-1"), 0, 1).is_err());
        assert!(f.ledger.verify_range(&pid("sys-1"), 2, 1).is_err());
        assert!(matches!(
            f.ledger.verify_range(&pid("sys-1"), 1, 5),
            Err(LedgerError::Validation(ValidationError::InvalidRange { .. }))
        ));
        assert!(f.ledger.verify_partition(&pid("empty")).unwrap().is_clean());
    }

    #[test]
    fn tampered_description_is_located() {
        let f = fixture();
        for i in 0..4 {
            f.ledger.append(draft("sys-1", &format!("e{i}"))).unwrap();
        }
        assert!(f.store.tamper(&pid("sys-1"), 2, |e| e.description.push('!')));
        let report = f.ledger.verify_partition(&pid("sys-1")).unwrap();
        assert_eq!(report.first_divergence, Some(2));
        let stored = f.ledger.read(&pid("sys-1"), 2, 2).unwrap();
        assert!(!f.ledger.verify_one(&stored[0].event_id).unwrap().hash_ok);
    }

    #[test]
    fn rotated_keys_keep_old_events_verifiable() {
        let f = fixture();
        let old = f.ledger.append(draft("sys-1", "before")).unwrap();
        f.keys
            .rotate(KeyId::new("k2").unwrap(), SigningSecret::from_bytes([6; 32]))
            .unwrap();
        let new = f.ledger.append(draft("sys-1", "after")).unwrap();
        assert_eq!(old.key_id.as_str(), "k1");
        assert_eq!(new.key_id.as_str(), "k2");
        assert!(f.ledger.verify_partition(&pid("sys-1")).unwrap().is_clean());
    }

    #[test]
    fn registration_appends_configuration_event() {
        let f = fixture();
        let event = f
            .ledger
            .register_system(SystemRegistration {
                system: SubjectId::new("credit-model").unwrap(),
                registered_by: ActorId::new("governance-office").unwrap(),
                name: "Credit Scoring".into(),
                system_type: "credit_scoring".into(),
                risk_tier: RiskTier::High,
                business_impact: BusinessImpact::Critical,
                frameworks: vec![FrameworkId::EuAiAct, FrameworkId::Gdpr],
                attributes: Metadata::from([("owner".to_string(), "risk-team".into())]),
            })
            .unwrap();
        assert_eq!(event.kind, EventKind::ConfigurationChanged);
        assert_eq!(event.metadata["system_name"], "Credit Scoring");
        assert_eq!(event.metadata["owner"], "risk-team");
        assert!(event.declares(FrameworkId::Gdpr));
    }

    #[test]
    fn statistics_and_window() {
        let f = fixture();
        f.ledger.append(draft("sys-1", "a")).unwrap();
        f.ledger.append(draft("sys-2", "b")).unwrap();
        f.ledger.append(draft("sys-1", "c")).unwrap();
        let all = f.ledger.statistics(None).unwrap();
        assert_eq!(all.total_events, 3);
        let one = f.ledger.statistics(Some(&pid("sys-2"))).unwrap();
        assert_eq!(one.total_events, 1);
        let window = f
            .ledger
            .events_between(
                Timestamp::parse("2026-03-01T09:01:00Z").unwrap(),
                Timestamp::parse("2026-03-01T09:02:00Z").unwrap(),
            )
            .unwrap();
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn export_verifies_offline() {
        let f = fixture();
        for i in 0..3 {
            f.ledger.append(draft("sys-1", &format!("e{i}"))).unwrap();
        }
        let export = f.ledger.export_partition(&pid("sys-1")).unwrap();
        assert_eq!(export.tail_sequence, 3);
        assert_eq!(export.key_fingerprints.len(), 1);
        let json = export.to_json().unwrap();
        assert!(!json.contains(&"05".repeat(32)));
        let parsed = LedgerExport::from_json(&json).unwrap();
        let offline = IntegrityVerifier::new(f.keys.clone());
        assert!(offline.verify_export(&parsed).is_clean());

        let mut truncated = parsed.clone();
        truncated.events.pop();
        assert_eq!(offline.verify_export(&truncated).first_divergence, Some(3));
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::default();
        assert_eq!(p.backoff(1), Duration::from_millis(5));
        assert_eq!(p.backoff(2), Duration::from_millis(10));
        assert_eq!(p.backoff(3), Duration::from_millis(20));
        assert_eq!(p.backoff(40), Duration::from_millis(200));
    }

    mod appends {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn any_sequence_of_appends_verifies_clean(
                writes in prop::collection::vec((0usize..3, "[a-z]{1,12}"), 1..24)
            ) {
                let f = fixture();
                let subjects = ["sys-a", "sys-b", "sys-c"];
                let mut counts = [0u64; 3];
                for (who, description) in &writes {
                    let event = f.ledger.append(draft(subjects[*who], description)).unwrap();
                    counts[*who] += 1;
                    prop_assert_eq!(event.sequence, counts[*who]);
                }
                for (subject, count) in subjects.iter().zip(counts) {
                    let report = f.ledger.verify_partition(&pid(subject)).unwrap();
                    prop_assert!(report.is_clean());
                    prop_assert_eq!(f.ledger.tail(&pid(subject)).unwrap().sequence, count);
                }
                let listed = f.ledger.partitions().len();
                prop_assert_eq!(listed, counts.iter().filter(|c| **c > 0).count());
            }
        }
    }
}
