//! # Ledger Integrity Across the Store Boundary
//!
//! Corrupts records behind the ledger's back through the in-memory store's
//! fault hooks and checks that the verifier finds every edit, removal and
//! reordering at the right position, both live and from an export.

use std::sync::Arc;

use aigov_core::{ActorId, ContentDigest, EventKind, KeyId, ManualClock, PartitionId, SubjectId, Timestamp};
use aigov_crypto::{Keyring, SigningSecret};
use aigov_ledger::{
    DivergenceKind, EventDraft, EventLedger, InMemoryStore, IntegrityVerifier, LedgerError,
    LedgerExport,
};
use proptest::prelude::*;

struct Harness {
    ledger: EventLedger,
    store: Arc<InMemoryStore>,
    keys: Arc<Keyring>,
}

fn harness() -> Harness {
    let store = Arc::new(InMemoryStore::new());
    let keys = Arc::new(Keyring::new(
        KeyId::new("ledger-k1").unwrap(),
        SigningSecret::from_bytes([11; 32]),
    ));
    let clock = Arc::new(ManualClock::stepping(
        Timestamp::parse("2026-02-01T08:00:00Z").unwrap(),
        30,
    ));
    let ledger = EventLedger::new(store.clone(), keys.clone(), clock);
    Harness { ledger, store, keys }
}

fn sys1() -> PartitionId {
    PartitionId::new("sys-1").unwrap()
}

fn fill(h: &Harness, count: usize) {
    for i in 1..=count {
        let draft = EventDraft::new(
            EventKind::PredictionMade,
            SubjectId::new("sys-1").unwrap(),
            ActorId::new("scoring-service").unwrap(),
            format!("decision {i}"),
        )
        .with_metadata("decision_index", i as u64);
        h.ledger.append(draft).unwrap();
    }
}

// =========================================================================
// Live verification
// =========================================================================

#[test]
fn corrupted_content_hash_reported_at_its_position() {
    let h = harness();
    fill(&h, 5);
    assert!(h.ledger.verify_range(&sys1(), 1, 5).unwrap().is_clean());

    assert!(h.store.tamper(&sys1(), 3, |e| {
        e.content_hash = ContentDigest::from_bytes([0xAB; 32]);
    }));

    let report = h.ledger.verify_range(&sys1(), 1, 5).unwrap();
    assert_eq!(report.first_divergence, Some(3));
    assert!(report.findings.iter().all(|d| d.sequence == 3));
    assert!(report
        .findings
        .iter()
        .any(|d| matches!(d.kind, DivergenceKind::ContentHashMismatch { .. })));

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, LedgerError::IntegrityViolation { sequence: 3, .. }));
}

#[test]
fn verifying_a_clean_prefix_ignores_later_tampering() {
    let h = harness();
    fill(&h, 5);
    h.store.tamper(&sys1(), 5, |e| e.description = "rewritten".into());
    assert!(h.ledger.verify_range(&sys1(), 1, 4).unwrap().is_clean());
    assert_eq!(h.ledger.verify_range(&sys1(), 2, 5).unwrap().first_divergence, Some(5));
}

#[test]
fn removed_record_is_reported_missing() {
    let h = harness();
    fill(&h, 4);
    assert!(h.store.remove(&sys1(), 2).is_some());

    let report = h.ledger.verify_partition(&sys1()).unwrap();
    assert_eq!(report.first_divergence, Some(2));
    assert!(report
        .findings
        .iter()
        .any(|d| d.sequence == 2 && d.kind == DivergenceKind::MissingEvent));
    // The survivor after the hole no longer links to its stored predecessor.
    assert!(report
        .findings
        .iter()
        .any(|d| d.sequence == 3 && matches!(d.kind, DivergenceKind::BrokenLink { .. })));
}

#[test]
fn reordered_records_are_detected() {
    let h = harness();
    fill(&h, 4);
    assert!(h.store.swap(&sys1(), 2, 3));

    let report = h.ledger.verify_partition(&sys1()).unwrap();
    assert_eq!(report.first_divergence, Some(2));
    assert!(report
        .findings
        .iter()
        .any(|d| matches!(d.kind, DivergenceKind::SequenceMismatch { found: 2 })));
}

#[test]
fn other_partitions_unaffected_by_tampering() {
    let h = harness();
    fill(&h, 3);
    let other = EventDraft::new(
        EventKind::ModelTraining,
        SubjectId::new("sys-2").unwrap(),
        ActorId::new("trainer").unwrap(),
        "weekly retrain",
    );
    h.ledger.append(other).unwrap();
    h.store.tamper(&sys1(), 1, |e| e.description.push('?'));

    assert!(!h.ledger.verify_partition(&sys1()).unwrap().is_clean());
    assert!(h
        .ledger
        .verify_partition(&PartitionId::new("sys-2").unwrap())
        .unwrap()
        .is_clean());
}

// =========================================================================
// Keys
// =========================================================================

#[test]
fn rotation_keeps_whole_chain_verifiable_offline() {
    let h = harness();
    fill(&h, 2);
    h.keys
        .rotate(KeyId::new("ledger-k2").unwrap(), SigningSecret::from_bytes([12; 32]))
        .unwrap();
    fill(&h, 2);

    let export = h.ledger.export_partition(&sys1()).unwrap();
    let keys_used: Vec<&str> = export.events.iter().map(|e| e.key_id.as_str()).collect();
    assert_eq!(keys_used, ["ledger-k1", "ledger-k1", "ledger-k2", "ledger-k2"]);
    assert_eq!(export.key_fingerprints.len(), 2);

    let restored = LedgerExport::from_json(&export.to_json().unwrap()).unwrap();
    assert!(h.ledger.verifier().verify_export(&restored).is_clean());
}

#[test]
fn verifier_without_the_signing_key_rejects_every_event() {
    let h = harness();
    fill(&h, 3);
    let export = h.ledger.export_partition(&sys1()).unwrap();

    let stranger = Keyring::new(
        KeyId::new("someone-else").unwrap(),
        SigningSecret::from_bytes([99; 32]),
    );
    let report = IntegrityVerifier::new(Arc::new(stranger)).verify_export(&export);
    let unknown: Vec<u64> = report
        .findings
        .iter()
        .filter(|d| matches!(d.kind, DivergenceKind::UnknownKey { .. }))
        .map(|d| d.sequence)
        .collect();
    assert_eq!(unknown, [1, 2, 3]);
}

#[test]
fn same_key_id_with_another_secret_fails_signatures() {
    let h = harness();
    fill(&h, 2);
    let export = h.ledger.export_partition(&sys1()).unwrap();

    let impostor = Keyring::new(
        KeyId::new("ledger-k1").unwrap(),
        SigningSecret::from_bytes([12; 32]),
    );
    let report = IntegrityVerifier::new(Arc::new(impostor)).verify_export(&export);
    assert_eq!(report.first_divergence, Some(1));
    assert!(report
        .findings
        .iter()
        .all(|d| d.kind == DivergenceKind::SignatureInvalid));
}

// =========================================================================
// Exports
// =========================================================================

#[test]
fn edited_export_json_fails_offline_verification() {
    let h = harness();
    fill(&h, 3);
    let export = h.ledger.export_partition(&sys1()).unwrap();

    let mut doc: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
    doc["events"][1]["description"] = serde_json::Value::from("nothing to see here");
    let edited = LedgerExport::from_json(&doc.to_string()).unwrap();

    let report = h.ledger.verifier().verify_export(&edited);
    assert_eq!(report.first_divergence, Some(2));
}

#[test]
fn truncated_export_fails_tail_check() {
    let h = harness();
    fill(&h, 3);
    let mut export = h.ledger.export_partition(&sys1()).unwrap();
    export.events.pop();

    let report = h.ledger.verifier().verify_export(&export);
    assert!(report
        .findings
        .iter()
        .any(|d| d.sequence == 3 && d.kind == DivergenceKind::MissingEvent));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn any_single_edit_is_located(len in 2usize..8, pick in 0usize..8, suffix in "[a-z]{1,6}") {
        let h = harness();
        fill(&h, len);
        let target = (pick % len) as u64 + 1;
        prop_assert!(h.store.tamper(&sys1(), target, |e| e.description.push_str(&suffix)));

        let report = h.ledger.verify_partition(&sys1()).unwrap();
        prop_assert_eq!(report.first_divergence, Some(target));
        prop_assert!(report.findings.iter().all(|d| d.sequence == target));
    }
}
