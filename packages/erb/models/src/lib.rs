#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Call-detail-record and cell-site types.
//!
//! Every feed schema is parsed into [`CallEvent`] records regardless of the
//! producer's field naming. Cell-site coordinates are kept exactly as
//! received so that sector deduplication can match byte-identical values;
//! numeric views are available through the [`CellSite`] accessors.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Whether the target line placed or received the call.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CallDirection {
    /// The target line started the call.
    Originated,
    /// The target line was called.
    Received,
}

/// Which kind of telecom export a record came from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordOrigin {
    /// Lawful interception session.
    Interception,
    /// Operator call history (billing records).
    CallHistory,
    /// Data connections. The interlocutor side is not a real party.
    Connections,
    /// The record carried no recognized origin tag.
    Unspecified,
}

/// Which leg of a call a placed cell sector belongs to.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LegRole {
    /// Cell serving the target when the call started.
    Target,
    /// Cell serving the target when the call ended (after a handover).
    TargetFinal,
    /// Cell serving the other party.
    Interlocutor,
}

impl LegRole {
    /// Returns `true` for legs that belong to the target line.
    #[must_use]
    pub const fn is_target_side(self) -> bool {
        matches!(self, Self::Target | Self::TargetFinal)
    }
}

/// A cell tower sector as described by one record.
///
/// Coordinates and azimuth are stored verbatim. Producers disagree on
/// decimal separators and number formatting, and the raw text is the
/// deduplication identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSite {
    /// Raw latitude text.
    pub latitude: Option<String>,
    /// Raw longitude text.
    pub longitude: Option<String>,
    /// Raw azimuth text (degrees).
    pub azimuth: Option<String>,
    /// City served by the tower, as written by the producer.
    pub city: Option<String>,
    /// Street address of the tower.
    pub address: Option<String>,
    /// Operator-assigned cell identifier.
    pub label: Option<String>,
}

impl CellSite {
    /// Returns `true` when the record has a non-blank latitude.
    #[must_use]
    pub fn has_latitude(&self) -> bool {
        self.latitude.as_deref().is_some_and(|s| !s.trim().is_empty())
    }

    /// Latitude in decimal degrees, accepting comma decimal separators.
    #[must_use]
    pub fn latitude_deg(&self) -> Option<f64> {
        self.latitude.as_deref().and_then(parse_decimal)
    }

    /// Longitude in decimal degrees, accepting comma decimal separators.
    #[must_use]
    pub fn longitude_deg(&self) -> Option<f64> {
        self.longitude.as_deref().and_then(parse_decimal)
    }

    /// Azimuth in degrees, accepting comma decimal separators.
    #[must_use]
    pub fn azimuth_deg(&self) -> Option<f64> {
        self.azimuth.as_deref().and_then(parse_decimal)
    }
}

/// One call-detail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallEvent {
    /// 1-based line number in the feed this record was read from.
    pub line_number: usize,
    /// Producer record ID, used to look the record up again upstream.
    pub record_id: Option<String>,
    /// Call direction relative to the target line.
    pub direction: CallDirection,
    /// Calendar date of the call.
    pub occurred_on: Option<NaiveDate>,
    /// Wall-clock time of day as recorded by the producer. No timezone
    /// conversion is applied.
    pub time_of_day: Option<NaiveTime>,
    /// Call duration in seconds.
    pub duration_seconds: Option<u32>,
    /// Calling number (A side).
    pub caller: Option<String>,
    /// Called number (B side).
    pub callee: Option<String>,
    /// Line under investigation.
    pub target_line: Option<String>,
    /// The other party's line.
    pub interlocutor_line: Option<String>,
    /// Operator serving the target line.
    pub target_operator: Option<String>,
    /// Operator serving the interlocutor line.
    pub interlocutor_operator: Option<String>,
    /// Cell serving the target at call start.
    pub target_cell: CellSite,
    /// Cell serving the target at call end, when the producer reports one.
    pub final_target_cell: Option<CellSite>,
    /// Cell serving the interlocutor.
    pub interlocutor_cell: Option<CellSite>,
    /// Which export the record came from.
    pub origin: RecordOrigin,
}

impl CallEvent {
    /// Hour of day (0-23) from the recorded time.
    #[must_use]
    pub fn hour(&self) -> Option<u32> {
        self.time_of_day.map(|t| t.hour())
    }

    /// Combined date and time, when both are known.
    #[must_use]
    pub fn occurred_at(&self) -> Option<NaiveDateTime> {
        Some(NaiveDateTime::new(self.occurred_on?, self.time_of_day?))
    }

    /// Returns the cell site for the given leg, if the record has one.
    #[must_use]
    pub const fn cell(&self, role: LegRole) -> Option<&CellSite> {
        match role {
            LegRole::Target => Some(&self.target_cell),
            LegRole::TargetFinal => self.final_target_cell.as_ref(),
            LegRole::Interlocutor => self.interlocutor_cell.as_ref(),
        }
    }

    /// Returns the line identifier that owns the given leg.
    #[must_use]
    pub fn line(&self, role: LegRole) -> Option<&str> {
        match role {
            LegRole::Target | LegRole::TargetFinal => self.target_line.as_deref(),
            LegRole::Interlocutor => self.interlocutor_line.as_deref(),
        }
    }
}

/// Replaces a comma decimal separator with a dot and trims whitespace.
///
/// Only the first comma is replaced; a value with more than one comma is
/// not a number and will fail to parse afterwards.
#[must_use]
pub fn normalize_decimal(raw: &str) -> String {
    raw.trim().replacen(',', ".", 1)
}

/// Parses a decimal number that may use a comma separator.
#[must_use]
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let normalized = normalize_decimal(raw);
    if normalized.is_empty() {
        return None;
    }
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Returns `true` if `line` is a non-empty string of ASCII digits.
#[must_use]
pub fn is_numeric_line(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty() && line.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_decimals() {
        assert!((parse_decimal("-15,7801").unwrap() - -15.7801).abs() < f64::EPSILON);
        assert!((parse_decimal(" -47.92 ").unwrap() - -47.92).abs() < f64::EPSILON);
        assert!(parse_decimal("").is_none());
        assert!(parse_decimal("1,2,3").is_none());
        assert!(parse_decimal("NaN").is_none());
    }

    #[test]
    fn numeric_line_rejects_blank_and_symbols() {
        assert!(is_numeric_line("61999998888"));
        assert!(!is_numeric_line(""));
        assert!(!is_numeric_line("  "));
        assert!(!is_numeric_line("+5561999998888"));
        assert!(!is_numeric_line("VIVO"));
    }

    #[test]
    fn cell_reports_blank_latitude() {
        let cell = CellSite {
            latitude: Some("   ".to_string()),
            ..CellSite::default()
        };
        assert!(!cell.has_latitude());
        assert!(!CellSite::default().has_latitude());
    }

    #[test]
    fn direction_serializes_screaming_snake() {
        assert_eq!(CallDirection::Originated.as_ref(), "ORIGINATED");
        assert_eq!(
            "CALL_HISTORY".parse::<RecordOrigin>().unwrap(),
            RecordOrigin::CallHistory
        );
    }
}
