//! # Identity Newtypes
//!
//! Each identifier namespace is a distinct type: a [`SubjectId`] cannot be
//! passed where an [`ActorId`] is expected.
//!
//! ## Validation
//!
//! String identifiers are validated at construction and on deserialization:
//! non-empty, at most 128 bytes, ASCII alphanumerics plus `- _ . : @ /`.
//! [`EventId`] is a UUID and always valid.

use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

const MAX_IDENTIFIER_LEN: usize = 128;

fn validate_identifier(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    let reject = |reason| ValidationError::InvalidIdentifier {
        kind,
        value: value.to_string(),
        reason,
    };
    if value.trim().is_empty() {
        return Err(reject("must be non-empty"));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(reject("must be at most 128 bytes"));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':' | '@' | '/'))
    {
        return Err(reject("allowed characters are ASCII alphanumerics and - _ . : @ /"));
    }
    Ok(())
}

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Construct from a string, validating the format.
            pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
                let value = value.into();
                validate_identifier($kind, &value)?;
                Ok(Self(value))
            }

            /// Access the identifier string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let value = String::deserialize(deserializer)?;
                Self::new(value).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_identifier!(
    /// The AI system (or other subject) an event or assessment is about.
    SubjectId,
    "subject"
);

string_identifier!(
    /// The person or service that performed a recorded action.
    ActorId,
    "actor"
);

string_identifier!(
    /// An independently chained slice of the ledger, usually one per
    /// subject system.
    PartitionId,
    "partition"
);

string_identifier!(
    /// Identifier of a signing key held by a key provider.
    KeyId,
    "key"
);

string_identifier!(
    /// The assessor (human or automated) credited on an assessment.
    AssessorId,
    "assessor"
);

impl PartitionId {
    /// The conventional partition for a subject: one chain per system.
    pub fn for_subject(subject: &SubjectId) -> Self {
        Self(subject.as_str().to_string())
    }
}

/// Unique identifier of an audit event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// A new random (v4) event id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EventId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidIdentifier {
                kind: "event",
                value: s.to_string(),
                reason: "must be a UUID",
            })
    }
}
