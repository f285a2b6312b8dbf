//! # Persistent Store Interface
//!
//! The ledger persists through a [`PersistentStore`]: an append-only,
//! per-partition log with a compare-and-swap on the partition tail.
//!
//! ## Concurrency Model
//!
//! - `append` succeeds only if the partition tail still equals the tail the
//!   caller linked against. Otherwise it fails with [`StoreError::Conflict`]
//!   and writes nothing.
//! - `read_range` returns a [`PartitionSnapshot`] taken under one lock
//!   acquisition, so verification never observes a half-applied append.
//! - Every operation honours a [`Deadline`]. Lock acquisition that cannot
//!   finish in time yields [`StoreError::Timeout`].
//!
//! [`InMemoryStore`] keeps one `parking_lot::RwLock` per partition, so
//! appends to different partitions never contend. Listing partitions reads
//! a separate set and never waits on a partition lock.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use aigov_core::{ContentDigest, EventId, PartitionId, GENESIS_DIGEST};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::AuditEvent;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// Latest instant by which an operation must complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline: block until the operation completes.
    pub fn none() -> Self {
        Self(None)
    }

    /// Complete within `budget` from now.
    pub fn within(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    /// Complete by `instant`.
    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Time left, or `None` if unbounded. Zero once expired.
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Whether the deadline has passed.
    pub fn is_expired(&self) -> bool {
        matches!(self.remaining(), Some(d) if d.is_zero())
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

// ---------------------------------------------------------------------------
// Tail and snapshot
// ---------------------------------------------------------------------------

/// The last appended position of a partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tail {
    /// Sequence of the last event; 0 for an empty partition.
    pub sequence: u64,
    /// Chain hash of the last event; genesis for an empty partition.
    pub chain_hash: ContentDigest,
}

impl Tail {
    /// The tail of an empty partition.
    pub fn genesis() -> Self {
        Self {
            sequence: 0,
            chain_hash: GENESIS_DIGEST,
        }
    }

    /// Sequence the next appended event will carry.
    pub fn next_sequence(&self) -> u64 {
        self.sequence + 1
    }
}

/// A consistent read of part of one partition.
#[derive(Debug, Clone)]
pub struct PartitionSnapshot {
    /// The partition read.
    pub partition: PartitionId,
    /// Tail at the time of the read.
    pub tail: Tail,
    /// Stored record immediately before the requested range, if the range
    /// does not start at 1 and that record exists.
    pub predecessor: Option<AuditEvent>,
    /// Stored records at positions `from..=to`, in storage order. Fewer than
    /// requested means records are missing.
    pub events: Vec<AuditEvent>,
}

// ---------------------------------------------------------------------------
// Errors and trait
// ---------------------------------------------------------------------------

/// Errors returned by a [`PersistentStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The tail moved since the caller read it.
    #[error("tail of {partition} moved: expected #{expected}, found #{actual}")]
    Conflict {
        /// Partition name.
        partition: String,
        /// Tail sequence the caller expected.
        expected: u64,
        /// Tail sequence found.
        actual: u64,
    },

    /// The deadline passed before the operation could run.
    #[error("{operation} on {partition} missed its deadline")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Partition name.
        partition: String,
    },

    /// The event does not extend the expected tail (wrong sequence or link).
    #[error("event does not extend tail of {partition}: {reason}")]
    NotAnExtension {
        /// Partition name.
        partition: String,
        /// What did not line up.
        reason: String,
    },

    /// An event with this id is already stored.
    #[error("event {0} already stored")]
    DuplicateEvent(EventId),

    /// Backend-specific failure.
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Append-only, per-partition event storage.
pub trait PersistentStore: Send + Sync {
    /// Current tail of `partition` (genesis if it has never been written).
    fn tail(&self, partition: &PartitionId, deadline: Deadline) -> Result<Tail, StoreError>;

    /// Append `event` to its partition if the tail still equals `expected`.
    /// Returns the new tail.
    fn append(
        &self,
        event: AuditEvent,
        expected: &Tail,
        deadline: Deadline,
    ) -> Result<Tail, StoreError>;

    /// Snapshot positions `from..=to` of `partition`.
    fn read_range(
        &self,
        partition: &PartitionId,
        from: u64,
        to: u64,
        deadline: Deadline,
    ) -> Result<PartitionSnapshot, StoreError>;

    /// Look an event up by id across all partitions.
    fn find(&self, event_id: &EventId, deadline: Deadline) -> Result<Option<AuditEvent>, StoreError>;

    /// All partitions that have at least one event, in order. Never blocks
    /// on a partition that is mid-append.
    fn partitions(&self) -> Vec<PartitionId>;
}

// ---------------------------------------------------------------------------
// InMemoryStore
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct PartitionLog {
    tail: Tail,
    // Position i holds sequence i + 1.
    events: Vec<AuditEvent>,
}

impl PartitionLog {
    fn new() -> Self {
        Self {
            tail: Tail::genesis(),
            events: Vec::new(),
        }
    }
}

/// Process-local [`PersistentStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    partitions: RwLock<BTreeMap<PartitionId, Arc<RwLock<PartitionLog>>>>,
    index: RwLock<HashMap<EventId, (PartitionId, u64)>>,
    // Partitions whose tail has moved past genesis.
    written: RwLock<BTreeSet<PartitionId>>,
}

impl InMemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn log(&self, partition: &PartitionId) -> Option<Arc<RwLock<PartitionLog>>> {
        self.partitions.read().get(partition).cloned()
    }

    fn log_or_create(&self, partition: &PartitionId) -> Arc<RwLock<PartitionLog>> {
        if let Some(log) = self.log(partition) {
            return log;
        }
        self.partitions
            .write()
            .entry(partition.clone())
            .or_insert_with(|| Arc::new(RwLock::new(PartitionLog::new())))
            .clone()
    }

    fn read_lock<'a>(
        log: &'a RwLock<PartitionLog>,
        operation: &'static str,
        partition: &PartitionId,
        deadline: Deadline,
    ) -> Result<RwLockReadGuard<'a, PartitionLog>, StoreError> {
        if deadline.is_expired() {
            return Err(StoreError::Timeout {
                operation,
                partition: partition.to_string(),
            });
        }
        let guard = match deadline.remaining() {
            None => Some(log.read()),
            Some(budget) => log.try_read_for(budget),
        };
        guard.ok_or_else(|| StoreError::Timeout {
            operation,
            partition: partition.to_string(),
        })
    }

    fn write_lock<'a>(
        log: &'a RwLock<PartitionLog>,
        operation: &'static str,
        partition: &PartitionId,
        deadline: Deadline,
    ) -> Result<RwLockWriteGuard<'a, PartitionLog>, StoreError> {
        if deadline.is_expired() {
            return Err(StoreError::Timeout {
                operation,
                partition: partition.to_string(),
            });
        }
        let guard = match deadline.remaining() {
            None => Some(log.write()),
            Some(budget) => log.try_write_for(budget),
        };
        guard.ok_or_else(|| StoreError::Timeout {
            operation,
            partition: partition.to_string(),
        })
    }

    /// Hold the write lock of `partition` until the returned guard drops.
    /// Lets tests make other operations on the partition miss deadlines.
    #[cfg(any(test, feature = "fault-injection"))]
    pub fn hold_partition(&self, partition: &PartitionId) -> PartitionHold {
        PartitionHold {
            log: self.log_or_create(partition),
        }
    }

    /// Rewrite the stored record at `sequence` in place, bypassing every
    /// ledger check. Returns `false` if no record is stored there.
    #[cfg(any(test, feature = "fault-injection"))]
    pub fn tamper(
        &self,
        partition: &PartitionId,
        sequence: u64,
        edit: impl FnOnce(&mut AuditEvent),
    ) -> bool {
        let Some(log) = self.log(partition) else {
            return false;
        };
        let mut guard = log.write();
        let Some(slot) = position(sequence).and_then(|i| guard.events.get_mut(i)) else {
            return false;
        };
        edit(slot);
        true
    }

    /// Drop the stored record at `sequence` without touching the tail.
    #[cfg(any(test, feature = "fault-injection"))]
    pub fn remove(&self, partition: &PartitionId, sequence: u64) -> Option<AuditEvent> {
        let log = self.log(partition)?;
        let mut guard = log.write();
        let i = position(sequence).filter(|i| *i < guard.events.len())?;
        Some(guard.events.remove(i))
    }

    /// Exchange the stored records at two sequences.
    #[cfg(any(test, feature = "fault-injection"))]
    pub fn swap(&self, partition: &PartitionId, a: u64, b: u64) -> bool {
        let Some(log) = self.log(partition) else {
            return false;
        };
        let mut guard = log.write();
        let len = guard.events.len();
        match (position(a), position(b)) {
            (Some(i), Some(j)) if i < len && j < len => {
                guard.events.swap(i, j);
                true
            }
            _ => false,
        }
    }
}

/// Guard returned by [`InMemoryStore::hold_partition`].
#[cfg(any(test, feature = "fault-injection"))]
pub struct PartitionHold {
    log: Arc<RwLock<PartitionLog>>,
}

#[cfg(any(test, feature = "fault-injection"))]
impl PartitionHold {
    /// Block until the partition's write lock is held, then run `f`.
    pub fn while_held<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.log.write();
        f()
    }
}

fn position(sequence: u64) -> Option<usize> {
    sequence.checked_sub(1).and_then(|p| usize::try_from(p).ok())
}

impl PersistentStore for InMemoryStore {
    fn tail(&self, partition: &PartitionId, deadline: Deadline) -> Result<Tail, StoreError> {
        let Some(log) = self.log(partition) else {
            return Ok(Tail::genesis());
        };
        let guard = Self::read_lock(&log, "tail", partition, deadline)?;
        Ok(guard.tail)
    }

    fn append(
        &self,
        event: AuditEvent,
        expected: &Tail,
        deadline: Deadline,
    ) -> Result<Tail, StoreError> {
        let partition = event.partition.clone();
        let log = self.log_or_create(&partition);
        let mut guard = Self::write_lock(&log, "append", &partition, deadline)?;

        if guard.tail != *expected {
            return Err(StoreError::Conflict {
                partition: partition.to_string(),
                expected: expected.sequence,
                actual: guard.tail.sequence,
            });
        }
        if event.sequence != guard.tail.next_sequence() {
            return Err(StoreError::NotAnExtension {
                partition: partition.to_string(),
                reason: format!(
                    "sequence {} does not follow tail #{}",
                    event.sequence, guard.tail.sequence
                ),
            });
        }
        if event.previous_chain_hash != guard.tail.chain_hash {
            return Err(StoreError::NotAnExtension {
                partition: partition.to_string(),
                reason: "previous chain hash does not match tail".to_string(),
            });
        }

        let mut index = self.index.write();
        if index.contains_key(&event.event_id) {
            return Err(StoreError::DuplicateEvent(event.event_id));
        }
        index.insert(event.event_id, (partition.clone(), event.sequence));
        self.written.write().insert(partition);

        let new_tail = Tail {
            sequence: event.sequence,
            chain_hash: event.chain_hash,
        };
        guard.events.push(event);
        guard.tail = new_tail;
        Ok(new_tail)
    }

    fn read_range(
        &self,
        partition: &PartitionId,
        from: u64,
        to: u64,
        deadline: Deadline,
    ) -> Result<PartitionSnapshot, StoreError> {
        let Some(log) = self.log(partition) else {
            return Ok(PartitionSnapshot {
                partition: partition.clone(),
                tail: Tail::genesis(),
                predecessor: None,
                events: Vec::new(),
            });
        };
        let guard = Self::read_lock(&log, "read_range", partition, deadline)?;
        let len = guard.events.len();
        let start = position(from).unwrap_or(0).min(len);
        let end = usize::try_from(to).unwrap_or(usize::MAX).min(len);
        let events = if start < end {
            guard.events[start..end].to_vec()
        } else {
            Vec::new()
        };
        let predecessor = from
            .checked_sub(1)
            .and_then(position)
            .and_then(|i| guard.events.get(i))
            .cloned();
        Ok(PartitionSnapshot {
            partition: partition.clone(),
            tail: guard.tail,
            predecessor,
            events,
        })
    }

    fn find(&self, event_id: &EventId, deadline: Deadline) -> Result<Option<AuditEvent>, StoreError> {
        let located = self.index.read().get(event_id).cloned();
        let Some((partition, sequence)) = located else {
            return Ok(None);
        };
        let Some(log) = self.log(&partition) else {
            return Ok(None);
        };
        let guard = Self::read_lock(&log, "find", &partition, deadline)?;
        // Prefer the indexed position; fall back to a scan if the log was
        // reshuffled underneath the index.
        let hit = position(sequence)
            .and_then(|i| guard.events.get(i))
            .filter(|e| e.event_id == *event_id)
            .or_else(|| guard.events.iter().find(|e| e.event_id == *event_id))
            .cloned();
        Ok(hit)
    }

    fn partitions(&self) -> Vec<PartitionId> {
        self.written.read().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventDraft, PendingEvent};
    use aigov_core::{ActorId, EventKind, KeyId, SubjectId, Timestamp};

    fn pid(s: &str) -> PartitionId {
        PartitionId::new(s).unwrap()
    }

    fn next_event(store: &InMemoryStore, partition: &str) -> (AuditEvent, Tail) {
        let tail = store.tail(&pid(partition), Deadline::none()).unwrap();
        let draft = EventDraft::new(
            EventKind::ModelTraining,
            SubjectId::new(partition).unwrap(),
            ActorId::new("trainer").unwrap(),
            "retrain",
        );
        let pending = PendingEvent::new(draft, Timestamp::parse("2026-01-01T00:00:00Z").unwrap());
        let mut event = pending.place(tail.next_sequence(), tail.chain_hash, KeyId::new("k").unwrap());
        event.content_hash = event.compute_content_hash().unwrap();
        event.chain_hash = event.compute_chain_hash();
        (event, tail)
    }

    #[test]
    fn empty_partition_has_genesis_tail() {
        let store = InMemoryStore::new();
        assert_eq!(store.tail(&pid("sys-1"), Deadline::none()).unwrap(), Tail::genesis());
        assert!(store.partitions().is_empty());
    }

    #[test]
    fn append_advances_tail() {
        let store = InMemoryStore::new();
        let (event, tail) = next_event(&store, "sys-1");
        let chain_hash = event.chain_hash;
        let new_tail = store.append(event, &tail, Deadline::none()).unwrap();
        assert_eq!(new_tail.sequence, 1);
        assert_eq!(new_tail.chain_hash, chain_hash);
        assert_eq!(store.partitions(), vec![pid("sys-1")]);
    }

    #[test]
    fn stale_tail_conflicts_and_writes_nothing() {
        let store = InMemoryStore::new();
        let (first, tail) = next_event(&store, "sys-1");
        let (second, _) = next_event(&store, "sys-1");
        store.append(first, &tail, Deadline::none()).unwrap();
        let err = store.append(second, &tail, Deadline::none()).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { expected: 0, actual: 1, .. }));
        assert_eq!(store.tail(&pid("sys-1"), Deadline::none()).unwrap().sequence, 1);
    }

    #[test]
    fn wrong_sequence_is_not_an_extension() {
        let store = InMemoryStore::new();
        let (mut event, tail) = next_event(&store, "sys-1");
        event.sequence = 5;
        assert!(matches!(
            store.append(event, &tail, Deadline::none()),
            Err(StoreError::NotAnExtension { .. })
        ));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let store = InMemoryStore::new();
        let (event, tail) = next_event(&store, "sys-1");
        let mut copy = event.clone();
        let new_tail = store.append(event, &tail, Deadline::none()).unwrap();
        copy.sequence = 2;
        copy.previous_chain_hash = new_tail.chain_hash;
        assert!(matches!(
            store.append(copy, &new_tail, Deadline::none()),
            Err(StoreError::DuplicateEvent(_))
        ));
    }

    #[test]
    fn read_range_returns_predecessor_and_slice() {
        let store = InMemoryStore::new();
        for _ in 0..4 {
            let (event, tail) = next_event(&store, "sys-1");
            store.append(event, &tail, Deadline::none()).unwrap();
        }
        let snap = store.read_range(&pid("sys-1"), 2, 3, Deadline::none()).unwrap();
        assert_eq!(snap.events.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![2, 3]);
        assert_eq!(snap.predecessor.map(|e| e.sequence), Some(1));
        assert_eq!(snap.tail.sequence, 4);

        let beyond = store.read_range(&pid("sys-1"), 3, 10, Deadline::none()).unwrap();
        assert_eq!(beyond.events.len(), 2);
    }

    #[test]
    fn find_locates_events_across_partitions() {
        let store = InMemoryStore::new();
        let (a, ta) = next_event(&store, "sys-a");
        let (b, tb) = next_event(&store, "sys-b");
        let id_b = b.event_id;
        store.append(a, &ta, Deadline::none()).unwrap();
        store.append(b, &tb, Deadline::none()).unwrap();
        let found = store.find(&id_b, Deadline::none()).unwrap().unwrap();
        assert_eq!(found.partition, pid("sys-b"));
        assert!(store.find(&EventId::new(), Deadline::none()).unwrap().is_none());
    }

    #[test]
    fn held_partition_times_out_append() {
        let store = InMemoryStore::new();
        let (event, tail) = next_event(&store, "sys-1");
        let hold = store.hold_partition(&pid("sys-1"));
        let result = hold.while_held(|| {
            store.append(event, &tail, Deadline::within(Duration::from_millis(20)))
        });
        assert!(matches!(result, Err(StoreError::Timeout { operation: "append", .. })));
    }

    #[test]
    fn listing_partitions_does_not_wait_on_a_held_partition() {
        let store = InMemoryStore::new();
        for partition in ["sys-1", "sys-2"] {
            let (event, tail) = next_event(&store, partition);
            store.append(event, &tail, Deadline::none()).unwrap();
        }
        let hold = store.hold_partition(&pid("sys-1"));
        let unwritten = store.hold_partition(&pid("sys-3"));
        let listed = hold.while_held(|| unwritten.while_held(|| store.partitions()));
        assert_eq!(listed, vec![pid("sys-1"), pid("sys-2")]);
    }

    #[test]
    fn expired_deadline_times_out_immediately() {
        let store = InMemoryStore::new();
        let (event, tail) = next_event(&store, "sys-1");
        let past = Deadline::at(Instant::now());
        assert!(past.is_expired());
        assert!(matches!(
            store.append(event, &tail, past),
            Err(StoreError::Timeout { .. })
        ));
    }

    #[test]
    fn deadline_none_never_expires() {
        assert!(!Deadline::none().is_expired());
        assert!(Deadline::none().remaining().is_none());
        assert!(Deadline::within(Duration::from_secs(60)).remaining().is_some());
    }

    #[test]
    fn tamper_and_remove_bypass_checks() {
        let store = InMemoryStore::new();
        for _ in 0..3 {
            let (event, tail) = next_event(&store, "sys-1");
            store.append(event, &tail, Deadline::none()).unwrap();
        }
        assert!(store.tamper(&pid("sys-1"), 2, |e| e.description = "edited".into()));
        assert!(!store.tamper(&pid("sys-1"), 9, |_| {}));
        let snap = store.read_range(&pid("sys-1"), 2, 2, Deadline::none()).unwrap();
        assert_eq!(snap.events[0].description, "edited");

        assert!(store.remove(&pid("sys-1"), 2).is_some());
        let snap = store.read_range(&pid("sys-1"), 1, 3, Deadline::none()).unwrap();
        assert_eq!(snap.events.len(), 2);
        assert_eq!(snap.tail.sequence, 3);
    }
}
