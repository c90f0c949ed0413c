//! # Temporal Types
//!
//! [`Timestamp`] is a UTC instant truncated to seconds. The run's `as_of`
//! instant is a `Timestamp`; every relative quantity (cookie expiry in days,
//! days until certificate expiry) is computed against it, never against the
//! wall clock, so that rebuilding the dataset is idempotent.
//!
//! [`parse_instant`] is the lenient ingest parser for measurement records,
//! which carry either RFC 3339 strings (any offset) or Unix seconds.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A UTC timestamp truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 timestamp, converting any offset to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidTimestamp`] if the string is not
    /// RFC 3339.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let dt = DateTime::parse_from_rfc3339(s.trim()).map_err(|e| {
            ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self::from_utc(dt.with_timezone(&Utc)))
    }

    /// Create a timestamp from Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                value: secs.to_string(),
                reason: "out of range".to_string(),
            })
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Signed number of days from `self` until `later` (fractional).
    pub fn days_until(&self, later: &Timestamp) -> f64 {
        (later.epoch_secs() - self.epoch_secs()) as f64 / SECONDS_PER_DAY
    }

    /// Render as ISO 8601 with `Z` suffix (e.g. `2025-03-01T00:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl TryFrom<String> for Timestamp {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.to_iso8601()
    }
}

/// Parse an instant from an RFC 3339 string or Unix epoch seconds.
///
/// Epoch values may carry a fractional part (`1735689600.25`), which is
/// truncated. Empty strings are an error; callers that treat a missing
/// expiry as "session" must check for emptiness first.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimestamp`] when neither form parses.
pub fn parse_instant(raw: &str) -> Result<Timestamp, ValidationError> {
    let s = raw.trim();
    if let Ok(secs) = s.parse::<i64>() {
        return Timestamp::from_epoch_secs(secs);
    }
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() {
            return Timestamp::from_epoch_secs(secs.trunc() as i64);
        }
    }
    Timestamp::parse(s).map_err(|_| ValidationError::InvalidTimestamp {
        value: raw.to_string(),
        reason: "neither RFC 3339 nor Unix seconds".to_string(),
    })
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
