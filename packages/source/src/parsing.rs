//! Shared parsing utilities for feed values.
//!
//! Date, time, and duration parsing for the formats seen across telecom
//! exports, plus helpers for reading loosely-typed JSON values.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Date-only formats, tried in order.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Combined date-time formats, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Time-of-day formats, tried in order.
const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// Parses a calendar date. Accepts a trailing time component, which is
/// discarded.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_datetime(s).map(|dt| dt.date()))
}

/// Parses a wall-clock time of day.
#[must_use]
pub fn parse_time(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
}

/// Parses a combined date and time.
#[must_use]
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// Parses a call duration given either as whole seconds (`"83"`) or as
/// `HH:MM:SS` / `MM:SS`.
#[must_use]
pub fn parse_duration_seconds(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(secs) = s.parse::<u32>() {
        return Some(secs);
    }

    let parts: Vec<u32> = s
        .split(':')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [h, m, sec] => Some(h * 3600 + m * 60 + sec),
        [m, sec] => Some(m * 60 + sec),
        _ => None,
    }
}

/// Renders a JSON scalar as text.
///
/// Strings are returned verbatim (no trimming), numbers and booleans use
/// their JSON rendering. `null`, arrays, and objects yield `None`.
#[must_use]
pub fn value_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
            None
        }
    }
}

/// Returns the text of the first candidate field that is present and not
/// `null`.
#[must_use]
pub fn first_text(record: &serde_json::Value, fields: &[String]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| record.get(f))
        .find_map(value_text)
}

/// Like [`first_text`], but skips blank values and trims the result.
#[must_use]
pub fn first_non_empty(record: &serde_json::Value, fields: &[String]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| record.get(f))
        .filter_map(value_text)
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_and_brazilian_dates() {
        assert_eq!(
            parse_date("2024-01-15").unwrap().to_string(),
            "2024-01-15"
        );
        assert_eq!(
            parse_date("15/01/2024").unwrap().to_string(),
            "2024-01-15"
        );
        assert_eq!(
            parse_date("2024-01-15T14:30:00").unwrap().to_string(),
            "2024-01-15"
        );
        assert!(parse_date("not-a-date").is_none());
    }

    #[test]
    fn parses_times_with_and_without_seconds() {
        assert_eq!(parse_time("23:59:01").unwrap().to_string(), "23:59:01");
        assert_eq!(parse_time("07:05").unwrap().to_string(), "07:05:00");
        assert!(parse_time("25:00:00").is_none());
    }

    #[test]
    fn parses_combined_datetime() {
        let dt = parse_datetime("15/01/2024 03:12:44").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 03:12:44");
        let dt = parse_datetime("2024-01-15T03:12:44.000").unwrap();
        assert_eq!(dt.to_string(), "2024-01-15 03:12:44");
    }

    #[test]
    fn parses_durations() {
        assert_eq!(parse_duration_seconds("83"), Some(83));
        assert_eq!(parse_duration_seconds("00:01:23"), Some(83));
        assert_eq!(parse_duration_seconds("1:05"), Some(65));
        assert_eq!(parse_duration_seconds(""), None);
        assert_eq!(parse_duration_seconds("abc"), None);
    }

    #[test]
    fn renders_numbers_as_text() {
        let record = serde_json::json!({"lat": -15.7, "az": 120, "line": null});
        assert_eq!(
            first_text(&record, &["lat".to_string()]).as_deref(),
            Some("-15.7")
        );
        assert_eq!(
            first_text(&record, &["az".to_string()]).as_deref(),
            Some("120")
        );
        assert!(first_text(&record, &["line".to_string()]).is_none());
    }

    #[test]
    fn first_non_empty_skips_blank_candidates() {
        let record = serde_json::json!({"a": "  ", "b": " BRASILIA "});
        let fields = vec!["a".to_string(), "b".to_string()];
        assert_eq!(first_non_empty(&record, &fields).as_deref(), Some("BRASILIA"));
        assert_eq!(first_text(&record, &fields).as_deref(), Some("  "));
    }
}
