//! # Concurrent Appends
//!
//! Several writers share one ledger. Compare-and-swap on the partition tail
//! must let exactly one writer claim each position, losers must see a
//! retryable conflict, and the resulting chain must verify with contiguous
//! sequence numbers. Readers verifying mid-append must only ever see a
//! clean prefix.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use aigov_core::{ActorId, EventKind, KeyId, ManualClock, PartitionId, SubjectId, Timestamp};
use aigov_crypto::Keyring;
use aigov_ledger::{Deadline, EventDraft, EventLedger, InMemoryStore, LedgerError, RetryPolicy};

fn ledger_over(store: Arc<InMemoryStore>) -> EventLedger {
    let keys = Arc::new(Keyring::generate(KeyId::new("race-k1").unwrap()));
    let clock = Arc::new(ManualClock::stepping(
        Timestamp::parse("2026-05-10T00:00:00Z").unwrap(),
        1,
    ));
    EventLedger::new(store, keys, clock)
}

fn draft(writer: usize, n: usize) -> EventDraft {
    EventDraft::new(
        EventKind::AccessGranted,
        SubjectId::new("shared-system").unwrap(),
        ActorId::new(format!("writer-{writer}")).unwrap(),
        format!("grant {n} from writer {writer}"),
    )
}

fn shared() -> PartitionId {
    PartitionId::new("shared-system").unwrap()
}

fn patient() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 200,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(8),
        attempt_timeout: Some(Duration::from_secs(2)),
    }
}

#[test]
fn racing_writers_on_one_tail_produce_one_winner() {
    let ledger = ledger_over(Arc::new(InMemoryStore::new()));
    let genesis = ledger.tail(&shared()).unwrap();
    let barrier = Barrier::new(2);

    let outcomes: Vec<Result<_, LedgerError>> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..2)
            .map(|w| {
                let (ledger, barrier, genesis) = (&ledger, &barrier, &genesis);
                s.spawn(move || {
                    barrier.wait();
                    ledger.append_expecting(draft(w, 0), genesis)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    let winner = winners[0];
    assert_eq!(winner.sequence, 1);

    let loser = outcomes.iter().find_map(|o| o.as_ref().err()).unwrap();
    assert!(matches!(
        loser,
        LedgerError::Conflict { expected_sequence: 0, actual_sequence: 1, .. }
    ));
    assert!(loser.is_retryable());

    let retried = ledger.append_with_retry(draft(9, 0), &patient()).unwrap();
    assert_eq!(retried.sequence, 2);
    assert_eq!(retried.previous_chain_hash, winner.chain_hash);
    assert!(ledger.verify_partition(&shared()).unwrap().is_clean());
}

#[test]
fn many_writers_with_retry_build_one_contiguous_chain() {
    const WRITERS: usize = 8;
    const PER_WRITER: usize = 12;

    let ledger = ledger_over(Arc::new(InMemoryStore::new()));
    let policy = patient();

    std::thread::scope(|s| {
        for w in 0..WRITERS {
            let (ledger, policy) = (&ledger, &policy);
            s.spawn(move || {
                for n in 0..PER_WRITER {
                    ledger.append_with_retry(draft(w, n), policy).unwrap();
                }
            });
        }
    });

    let events = ledger.events(&shared()).unwrap();
    let total = (WRITERS * PER_WRITER) as u64;
    assert_eq!(events.len() as u64, total);
    let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, (1..=total).collect::<Vec<_>>());
    let ids: BTreeSet<_> = events.iter().map(|e| e.event_id).collect();
    assert_eq!(ids.len(), events.len());

    let report = ledger.verify_partition(&shared()).unwrap();
    assert!(report.is_clean());
    assert_eq!(report.events_checked, total);
    assert_eq!(ledger.tail(&shared()).unwrap().sequence, total);
}

#[test]
fn verifying_while_another_thread_appends_sees_only_clean_prefixes() {
    const APPENDS: usize = 60;

    let ledger = ledger_over(Arc::new(InMemoryStore::new()));
    let done = AtomicBool::new(false);

    let (rounds, checked) = std::thread::scope(|s| {
        let (writer_ledger, writer_done) = (&ledger, &done);
        s.spawn(move || {
            for n in 0..APPENDS {
                writer_ledger.append(draft(0, n)).unwrap();
            }
            writer_done.store(true, Ordering::Release);
        });
        let (reader_ledger, reader_done) = (&ledger, &done);
        let reader = s.spawn(move || {
            let mut rounds = 0u64;
            let mut last_seen = 0u64;
            loop {
                let finished = reader_done.load(Ordering::Acquire);
                let report = reader_ledger.verify_partition(&shared()).unwrap();
                assert!(report.is_clean(), "divergence at {:?}", report.first_divergence);
                assert!(report.events_checked >= last_seen);
                last_seen = report.events_checked;
                rounds += 1;
                if finished {
                    return (rounds, last_seen);
                }
            }
        });
        reader.join().unwrap()
    });

    assert!(rounds >= 1);
    assert_eq!(checked, APPENDS as u64);
}

#[test]
fn held_partition_times_out_and_recovers_once_released() {
    let store = Arc::new(InMemoryStore::new());
    let ledger = ledger_over(store.clone());
    ledger.append(draft(0, 0)).unwrap();

    let hold = store.hold_partition(&shared());
    let err = hold.while_held(|| {
        ledger
            .append_within(draft(1, 0), Deadline::within(Duration::from_millis(5)))
            .unwrap_err()
    });
    assert!(matches!(err, LedgerError::Timeout { .. }));
    assert!(err.is_retryable());
    assert_eq!(ledger.tail(&shared()).unwrap().sequence, 1);

    let event = ledger.append_with_retry(draft(1, 0), &patient()).unwrap();
    assert_eq!(event.sequence, 2);
    assert!(ledger.verify_partition(&shared()).unwrap().is_clean());
}

#[test]
fn writers_on_separate_partitions_never_conflict() {
    let ledger = ledger_over(Arc::new(InMemoryStore::new()));
    let barrier = Barrier::new(4);

    std::thread::scope(|s| {
        for w in 0..4 {
            let (ledger, barrier) = (&ledger, &barrier);
            s.spawn(move || {
                let subject = SubjectId::new(format!("system-{w}")).unwrap();
                let partition = PartitionId::for_subject(&subject);
                barrier.wait();
                for n in 0..5 {
                    let tail = ledger.tail(&partition).unwrap();
                    let d = EventDraft::new(
                        EventKind::PerformanceMonitoring,
                        subject.clone(),
                        ActorId::new("monitor").unwrap(),
                        format!("sample {n}"),
                    );
                    // Sole writer of its partition: the tail it read is still current.
                    ledger.append_expecting(d, &tail).unwrap();
                }
            });
        }
    });

    assert_eq!(ledger.partitions().len(), 4);
    for partition in ledger.partitions() {
        let report = ledger.verify_partition(&partition).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.events_checked, 5);
    }
}
