//! Record timestamp model

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// A record timestamp as stored in snapshots.
///
/// Local records use RFC 3339 strings; some payloads carry epoch
/// milliseconds instead. The original text is kept verbatim so a round trip
/// through sync never rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    Millis(i64),
    Text(String),
}

impl Timestamp {
    /// Current time as an RFC 3339 string with millisecond precision.
    #[must_use]
    pub fn now() -> Self {
        Self::Text(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    #[must_use]
    pub const fn from_millis(millis: i64) -> Self {
        Self::Millis(millis)
    }

    /// Milliseconds since the Unix epoch, or `None` when the text is not a date.
    ///
    /// Accepts RFC 3339, naive `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC) and
    /// bare `YYYY-MM-DD` dates.
    #[must_use]
    pub fn as_millis(&self) -> Option<i64> {
        match self {
            Self::Millis(millis) => Some(*millis),
            Self::Text(text) => parse_text(text.trim()),
        }
    }
}

fn parse_text(text: &str) -> Option<i64> {
    if text.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.timestamp_millis());
    }
    if let Ok(parsed) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(parsed.and_utc().timestamp_millis());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc().timestamp_millis())
}
