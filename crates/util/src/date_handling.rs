//! # Date Handling Utilities
//!
//! Recognition of the loosely formatted dates accepted by `datetime` fields.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses an RFC 3339 timestamp, an ISO-8601 date-time without offset (taken
/// as UTC) or a plain calendar date (midnight UTC).
///
/// # Example
/// ```rust
/// use actionkit_util::date_handling::parse_date_like;
///
/// assert!(parse_date_like("2023-12-25T10:30:00Z").is_some());
/// assert!(parse_date_like("2023-12-25T10:30:00.123").is_some());
/// assert!(parse_date_like("2023/12/25").is_some());
/// assert!(parse_date_like("2023-13-45").is_none());
/// ```
pub fn parse_date_like(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(text) {
        return Some(date_time.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, format) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }
    None
}

/// True for values a `datetime` field accepts: a parsable date string or a
/// numeric epoch.
pub fn is_date_like(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(text) => parse_date_like(text).is_some(),
        _ => false,
    }
}
