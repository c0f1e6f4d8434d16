//! Timestamp helpers.
//!
//! The service emits ISO-8601 strings, sometimes with an offset and sometimes naive (local server
//! time without a zone). Both are accepted; naive values are read as UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

/// Current client time in RFC 3339, used to stamp optimistic messages.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}
