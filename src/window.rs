// ABOUTME: Time range value type and minute-aligned lookback window computation
// ABOUTME: Serializes with the fixed millisecond-precision ISO-8601 format the ledger and API share
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Time Windows
//!
//! [`TimeRange`] is the unit of work for the whole poller: an immutable pair
//! of UTC instants with `start < end`. Ranges are compared by timestamp value
//! and serialized as a two-element JSON array of ISO-8601 strings with
//! millisecond precision and a trailing `Z` — the exact format the activity
//! API's `createdat` filter expects, so a persisted range round-trips into a
//! request bound without reformatting.

use chrono::{DateTime, Duration, Utc};
use serde::de::Error as _;
use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display, Formatter};

/// Timestamp format shared by the ledger blob and the activity filter bounds.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Default lookback applied when there is no checkpoint history to anchor from.
pub const DEFAULT_LOOKBACK_MINUTES: u32 = 5;

/// Format a UTC instant with millisecond precision and a trailing `Z`.
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a timestamp previously produced by [`format_timestamp`].
///
/// Any RFC 3339 offset form is accepted and normalized to UTC.
///
/// # Errors
///
/// Returns the chrono parse error for anything that is not RFC 3339.
pub fn parse_timestamp(s: &str) -> chrono::ParseResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).map(|ts| ts.with_timezone(&Utc))
}

/// Truncate an instant to the start of its minute.
#[must_use]
pub fn floor_to_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    let secs = ts.timestamp();
    let floored = secs - secs.rem_euclid(60);
    DateTime::from_timestamp(floored, 0).unwrap_or(ts)
}

/// Half-open-by-convention pair of UTC instants delimiting activity records
/// to fetch. Immutable once created; `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    /// Build a range, rejecting zero-width and inverted bounds.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }

    /// Lower bound (inclusive).
    #[must_use]
    pub const fn start(&self) -> DateTime<Utc> {
        self.start
    }

    /// Upper bound.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Merge with a range that starts exactly where this one ends.
    pub(crate) const fn join(&self, later: &Self) -> Self {
        Self {
            start: self.start,
            end: later.end,
        }
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}..{}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tup = serializer.serialize_tuple(2)?;
        tup.serialize_element(&format_timestamp(self.start))?;
        tup.serialize_element(&format_timestamp(self.end))?;
        tup.end()
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (start, end) = <(String, String)>::deserialize(deserializer)?;
        let start = parse_timestamp(&start).map_err(D::Error::custom)?;
        let end = parse_timestamp(&end).map_err(D::Error::custom)?;
        Self::new(start, end)
            .ok_or_else(|| D::Error::custom("range start must precede range end"))
    }
}

/// Compute the default harvest window for a clock reading: the `lookback`
/// minutes ending at the reading's minute boundary.
///
/// Pure function of its arguments; used only when the ledger has no
/// requested or finished history to anchor from.
#[must_use]
pub fn default_window(now: DateTime<Utc>, lookback_minutes: u32) -> TimeRange {
    let end = floor_to_minute(now);
    let start = end - Duration::minutes(i64::from(lookback_minutes.max(1)));
    TimeRange { start, end }
}
