//! Time and timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// UTC timestamp used for event creation times and bridge clocks.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Format a timestamp the way the v1 API presents bridge clocks
/// (`2024-05-01T12:30:00`, no offset, second precision).
#[must_use]
pub fn hue_datetime(ts: Timestamp) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Format a timestamp as RFC 3339 with a `Z` suffix, as used by v2 events.
#[must_use]
pub fn rfc3339(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
