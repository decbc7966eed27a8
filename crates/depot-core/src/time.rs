//! # Time Formats
//!
//! All timestamps are `DateTime<Utc>` truncated to whole seconds. The
//! repository protocol only ever carries second precision (HTTP dates,
//! `lastUpdated`, snapshot stamps), so comparing at finer precision would
//! make an unchanged artifact look modified.

use chrono::{DateTime, NaiveDateTime, TimeZone, Timelike, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const LAST_UPDATED: &str = "%Y%m%d%H%M%S";
const SNAPSHOT_STAMP: &str = "%Y%m%d.%H%M%S";

/// Drop sub-second precision.
pub fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Current time, truncated to seconds.
pub fn now() -> DateTime<Utc> {
    truncate_to_seconds(Utc::now())
}

/// Render an RFC 1123 date as used by `Last-Modified`.
pub fn format_http_date(dt: DateTime<Utc>) -> String {
    dt.format(HTTP_DATE).to_string()
}

/// Parse an HTTP date. Accepts RFC 1123 (`GMT` zone) and general RFC 2822.
pub fn parse_http_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, HTTP_DATE) {
        return Some(Utc.from_utc_datetime(&naive));
    }
    DateTime::parse_from_rfc2822(s)
        .ok()
        .map(|dt| truncate_to_seconds(dt.with_timezone(&Utc)))
}

/// Render a `lastUpdated` value (`yyyyMMddHHmmss`).
pub fn format_last_updated(dt: DateTime<Utc>) -> String {
    dt.format(LAST_UPDATED).to_string()
}

/// Parse a `lastUpdated` value.
pub fn parse_last_updated(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s.trim(), LAST_UPDATED)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Render a snapshot stamp timestamp (`yyyyMMdd.HHmmss`).
pub fn format_snapshot_timestamp(dt: DateTime<Utc>) -> String {
    dt.format(SNAPSHOT_STAMP).to_string()
}

/// Parse a snapshot stamp timestamp.
pub fn parse_snapshot_timestamp(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, SNAPSHOT_STAMP)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Convert a filesystem modification time.
pub fn from_system_time(t: std::time::SystemTime) -> DateTime<Utc> {
    truncate_to_seconds(DateTime::<Utc>::from(t))
}
