//! # Time: UTC Timestamps and Injected Clocks
//!
//! `Timestamp` is UTC-only and truncated to whole seconds so that an event's
//! creation time canonicalizes to exactly one byte sequence
//! (`YYYY-MM-DDTHH:MM:SSZ`).
//!
//! `ClockSource` is the only way ledger and assessment code learns the
//! current time. Production wires [`SystemClock`]; tests wire
//! [`ManualClock`] to get reproducible content hashes and review dates.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a strict UTC timestamp. Only the `Z` suffix is accepted; explicit
    /// offsets, even `+00:00`, are rejected so that parsed and generated
    /// timestamps share one canonical form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        Self::parse_lenient(s)
    }

    /// Parse an RFC 3339 timestamp with any offset, converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| ValidationError::InvalidTimestamp {
            value: secs.to_string(),
            reason: "outside the representable range".to_string(),
        })?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp shifted forward by whole days. Saturates at the
    /// largest representable instant.
    pub fn plus_days(&self, days: u32) -> Self {
        self.0
            .checked_add_signed(Duration::days(i64::from(days)))
            .map(Self)
            .unwrap_or(Self(truncate_to_seconds(DateTime::<Utc>::MAX_UTC)))
    }

    /// This timestamp shifted back by whole days. Saturates at the smallest
    /// representable instant.
    pub fn minus_days(&self, days: u32) -> Self {
        self.0
            .checked_sub_signed(Duration::days(i64::from(days)))
            .map(Self)
            .unwrap_or(Self(truncate_to_seconds(DateTime::<Utc>::MIN_UTC)))
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ---------------------------------------------------------------------------
// Clocks
// ---------------------------------------------------------------------------

/// Source of the current time.
pub trait ClockSource: Send + Sync {
    /// The current instant, UTC, seconds precision.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_utc(Utc::now())
    }
}

/// A settable clock for deterministic tests and replays.
///
/// Every call to [`ClockSource::now`] returns the current reading and then
/// advances it by `step_secs` (zero keeps the clock frozen).
#[derive(Debug)]
pub struct ManualClock {
    secs: AtomicI64,
    step_secs: i64,
}

impl ManualClock {
    /// A frozen clock reading `start`.
    pub fn frozen(start: Timestamp) -> Self {
        Self::stepping(start, 0)
    }

    /// A clock reading `start` that advances by `step_secs` per reading.
    pub fn stepping(start: Timestamp, step_secs: i64) -> Self {
        Self {
            secs: AtomicI64::new(start.epoch_secs()),
            step_secs,
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        self.secs.store(to.epoch_secs(), Ordering::SeqCst);
    }

    /// Move forward by whole seconds.
    pub fn advance(&self, secs: i64) {
        self.secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Timestamp {
        let secs = self.secs.fetch_add(self.step_secs, Ordering::SeqCst);
        let fallback = if secs < 0 { DateTime::<Utc>::MIN_UTC } else { DateTime::<Utc>::MAX_UTC };
        Timestamp::from_epoch_secs(secs).unwrap_or_else(|_| Timestamp::from_utc(fallback))
    }
}
