//! # Audit Events
//!
//! An [`EventDraft`] is what a caller submits; an [`AuditEvent`] is what the
//! ledger stores after assigning identity, time, position and the integrity
//! block.
//!
//! ## Integrity Model
//!
//! 1. `content_hash` = SHA-256 over the canonical bytes of every field
//!    before the integrity block (id through `corrects`).
//! 2. `chain_hash` = SHA-256(`content_hash` || `previous_chain_hash`), where
//!    the first event of a partition links to the genesis digest.
//! 3. `signature` = HMAC-SHA256 of `chain_hash` under the key named by
//!    `key_id`.
//!
//! Events are never mutated after append. A mistake is fixed by appending a
//! new event whose `corrects` field names the original.

use std::collections::{BTreeMap, BTreeSet};

use aigov_core::{
    chain_digest, sha256_digest, ActorId, BusinessImpact, CanonicalBytes, CanonicalizationError,
    ContentDigest, EventId, EventKind, FrameworkId, KeyId, PartitionId, RiskTier, SubjectId,
    Timestamp, ValidationError,
};
use aigov_crypto::ChainSignature;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Metadata attached to an event. Keys are sorted, so insertion order never
/// affects the content hash.
pub type Metadata = BTreeMap<String, Value>;

// ---------------------------------------------------------------------------
// EventDraft
// ---------------------------------------------------------------------------

/// An event as submitted for append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDraft {
    /// Partition to append to. Defaults to the subject's own partition.
    pub partition: PartitionId,
    /// What happened.
    pub kind: EventKind,
    /// The system the event is about.
    pub subject: SubjectId,
    /// Who did it.
    pub actor: ActorId,
    /// Free-text description. Must not be blank.
    pub description: String,
    /// Structured details.
    #[serde(default)]
    pub metadata: Metadata,
    /// Frameworks the actor declares the event relevant to.
    #[serde(default)]
    pub frameworks: BTreeSet<FrameworkId>,
    /// Declared risk tier.
    pub risk_tier: RiskTier,
    /// Declared business impact.
    pub business_impact: BusinessImpact,
    /// The earlier event this one corrects, if any.
    #[serde(default)]
    pub corrects: Option<EventId>,
}

impl EventDraft {
    /// A draft with low risk and impact, no metadata and no frameworks,
    /// appended to the subject's partition.
    pub fn new(
        kind: EventKind,
        subject: SubjectId,
        actor: ActorId,
        description: impl Into<String>,
    ) -> Self {
        Self {
            partition: PartitionId::for_subject(&subject),
            kind,
            subject,
            actor,
            description: description.into(),
            metadata: Metadata::new(),
            frameworks: BTreeSet::new(),
            risk_tier: RiskTier::Low,
            business_impact: BusinessImpact::Low,
            corrects: None,
        }
    }

    /// Append to an explicit partition instead of the subject's.
    pub fn in_partition(mut self, partition: PartitionId) -> Self {
        self.partition = partition;
        self
    }

    /// Add one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Declare applicable frameworks.
    pub fn with_frameworks(mut self, frameworks: impl IntoIterator<Item = FrameworkId>) -> Self {
        self.frameworks.extend(frameworks);
        self
    }

    /// Declare the risk tier.
    pub fn with_risk_tier(mut self, tier: RiskTier) -> Self {
        self.risk_tier = tier;
        self
    }

    /// Declare the business impact.
    pub fn with_business_impact(mut self, impact: BusinessImpact) -> Self {
        self.business_impact = impact;
        self
    }

    /// Mark this event as a correction of `original`.
    pub fn correcting(mut self, original: EventId) -> Self {
        self.corrects = Some(original);
        self
    }

    /// Structural validation that needs no ledger state.
    ///
    /// Whether a `corrects` target exists is checked by the ledger.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            return Err(ValidationError::MissingField("description"));
        }
        for (key, value) in &self.metadata {
            if key.trim().is_empty() {
                return Err(ValidationError::InvalidMetadata {
                    key: key.clone(),
                    reason: "metadata keys must not be blank".to_string(),
                });
            }
            CanonicalBytes::new(value).map_err(|e| ValidationError::InvalidMetadata {
                key: key.clone(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// AuditEvent
// ---------------------------------------------------------------------------

/// An appended, sealed audit event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique id.
    pub event_id: EventId,
    /// Partition (chain) the event belongs to.
    pub partition: PartitionId,
    /// 1-based position within the partition.
    pub sequence: u64,
    /// When the ledger accepted the event.
    pub recorded_at: Timestamp,
    /// What happened.
    pub kind: EventKind,
    /// The system the event is about.
    pub subject: SubjectId,
    /// Who did it.
    pub actor: ActorId,
    /// Free-text description.
    pub description: String,
    /// Structured details.
    pub metadata: Metadata,
    /// Declared frameworks.
    pub frameworks: BTreeSet<FrameworkId>,
    /// Declared risk tier.
    pub risk_tier: RiskTier,
    /// Declared business impact.
    pub business_impact: BusinessImpact,
    /// The event this one corrects.
    pub corrects: Option<EventId>,
    /// SHA-256 of the canonical content fields above.
    pub content_hash: ContentDigest,
    /// Chain hash of the preceding event in the partition (genesis for #1).
    pub previous_chain_hash: ContentDigest,
    /// SHA-256(content_hash || previous_chain_hash).
    pub chain_hash: ContentDigest,
    /// Key the signature was produced with.
    pub key_id: KeyId,
    /// HMAC-SHA256 of `chain_hash`.
    pub signature: ChainSignature,
}

/// Borrowed view of the hashed fields. Field names are the canonical names.
#[derive(Serialize)]
struct EventContent<'a> {
    event_id: &'a EventId,
    partition: &'a PartitionId,
    sequence: u64,
    recorded_at: &'a Timestamp,
    kind: EventKind,
    subject: &'a SubjectId,
    actor: &'a ActorId,
    description: &'a str,
    metadata: &'a Metadata,
    frameworks: &'a BTreeSet<FrameworkId>,
    risk_tier: RiskTier,
    business_impact: BusinessImpact,
    corrects: Option<&'a EventId>,
}

impl AuditEvent {
    fn content(&self) -> EventContent<'_> {
        EventContent {
            event_id: &self.event_id,
            partition: &self.partition,
            sequence: self.sequence,
            recorded_at: &self.recorded_at,
            kind: self.kind,
            subject: &self.subject,
            actor: &self.actor,
            description: &self.description,
            metadata: &self.metadata,
            frameworks: &self.frameworks,
            risk_tier: self.risk_tier,
            business_impact: self.business_impact,
            corrects: self.corrects.as_ref(),
        }
    }

    /// Recompute the content hash from the event's fields.
    pub fn compute_content_hash(&self) -> Result<ContentDigest, CanonicalizationError> {
        let canonical = CanonicalBytes::new(&self.content())?;
        Ok(sha256_digest(&canonical))
    }

    /// Recompute the chain hash from the stored content hash and link.
    pub fn compute_chain_hash(&self) -> ContentDigest {
        chain_digest(&self.content_hash, &self.previous_chain_hash)
    }

    /// Whether the event declares `framework`.
    pub fn declares(&self, framework: FrameworkId) -> bool {
        self.frameworks.contains(&framework)
    }
}

/// An event whose identity and time are fixed but whose position is not.
///
/// Retried appends reuse the same pending event so that the id a caller
/// may have logged stays valid.
#[derive(Debug, Clone)]
pub(crate) struct PendingEvent {
    pub(crate) event_id: EventId,
    pub(crate) recorded_at: Timestamp,
    pub(crate) draft: EventDraft,
}

impl PendingEvent {
    pub(crate) fn new(draft: EventDraft, recorded_at: Timestamp) -> Self {
        Self {
            event_id: EventId::new(),
            recorded_at,
            draft,
        }
    }

    /// Place the event after `previous_chain_hash` at `sequence`, with the
    /// integrity block left for the caller to fill from the content hash.
    pub(crate) fn place(
        &self,
        sequence: u64,
        previous_chain_hash: ContentDigest,
        key_id: KeyId,
    ) -> AuditEvent {
        let draft = self.draft.clone();
        AuditEvent {
            event_id: self.event_id,
            partition: draft.partition,
            sequence,
            recorded_at: self.recorded_at,
            kind: draft.kind,
            subject: draft.subject,
            actor: draft.actor,
            description: draft.description,
            metadata: draft.metadata,
            frameworks: draft.frameworks,
            risk_tier: draft.risk_tier,
            business_impact: draft.business_impact,
            corrects: draft.corrects,
            content_hash: ContentDigest::from_bytes([0u8; 32]),
            previous_chain_hash,
            chain_hash: ContentDigest::from_bytes([0u8; 32]),
            key_id,
            signature: ChainSignature::from_bytes([0u8; 32]),
        }
    }
}
