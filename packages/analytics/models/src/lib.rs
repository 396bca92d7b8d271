#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate statistics types for a loaded call-record dataset.
//!
//! Defines the settings the aggregator reads and the plain-data summary it
//! produces. Nothing here renders; presentation layers consume these
//! structures as-is.

use chrono::NaiveDate;
use erb_map_erb_models::CellSite;
use serde::{Deserialize, Serialize};

/// Number of 4-hour buckets in a day.
pub const HOUR_BUCKETS: usize = 6;

/// Width of one hour bucket.
pub const HOURS_PER_BUCKET: u32 = 4;

/// Display labels for the hour buckets.
pub const HOUR_BUCKET_LABELS: [&str; HOUR_BUCKETS] =
    ["0-4h", "4-8h", "8-12h", "12-16h", "16-20h", "20-24h"];

/// Aggregation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// First hour (inclusive) of the overnight window.
    pub night_start_hour: u32,
    /// Last hour (exclusive) of the overnight window.
    pub night_end_hour: u32,
    /// Interlocutors are retained when their count is strictly greater
    /// than the top count times this ratio.
    pub interlocutor_cutoff_ratio: f64,
    /// Number prefixes excluded from area-code grouping (service and
    /// toll-free numbers).
    pub excluded_prefixes: Vec<String>,
    /// Minimum digit count for a number to carry an area code.
    pub min_phone_digits: usize,
    /// Number of leading digits forming the area code.
    pub area_code_digits: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            night_start_hour: 0,
            night_end_hour: 6,
            interlocutor_cutoff_ratio: 0.05,
            excluded_prefixes: vec!["303".to_string(), "0800".to_string(), "800".to_string()],
            min_phone_digits: 10,
            area_code_digits: 2,
        }
    }
}

impl AggregationConfig {
    /// Returns `true` if `hour` falls in the overnight window.
    #[must_use]
    pub const fn is_night(&self, hour: u32) -> bool {
        hour >= self.night_start_hour && hour < self.night_end_hour
    }
}

/// Call totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    /// Records aggregated.
    pub processed: u64,
    /// Calls placed by the target.
    pub originated: u64,
    /// Calls received by the target.
    pub received: u64,
}

/// Calls per 4-hour bucket of the recorded time of day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HourlyHistogram {
    /// Counts for `[0-4h, 4-8h, 8-12h, 12-16h, 16-20h, 20-24h]`.
    pub buckets: [u64; HOUR_BUCKETS],
}

impl HourlyHistogram {
    /// Bucket index for an hour of day.
    #[must_use]
    pub const fn bucket_of(hour: u32) -> usize {
        let idx = (hour / HOURS_PER_BUCKET) as usize;
        if idx < HOUR_BUCKETS { idx } else { HOUR_BUCKETS - 1 }
    }

    /// Sum over all buckets.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().sum()
    }

    /// Labeled buckets, in order.
    pub fn labeled(&self) -> impl Iterator<Item = (&'static str, u64)> + '_ {
        HOUR_BUCKET_LABELS.into_iter().zip(self.buckets.iter().copied())
    }
}

/// Calls with one interlocutor line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterlocutorCount {
    /// Interlocutor line.
    pub line: String,
    /// Number of calls.
    pub count: u64,
}

/// Interlocutor frequency ranking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterlocutorRanking {
    /// Every interlocutor, by count descending then line ascending.
    pub ranking: Vec<InterlocutorCount>,
    /// Cutoff derived from the top count.
    pub threshold: f64,
    /// Interlocutors whose count is strictly above the threshold.
    pub retained: Vec<InterlocutorCount>,
}

/// Records served by cells in one city.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityCount {
    /// Normalized city name.
    pub city: String,
    /// Number of records.
    pub count: u64,
}

/// A change of the target's city between consecutive records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    /// City entered.
    pub city: String,
    /// Date of the first record in that city.
    pub date: Option<NaiveDate>,
    /// Feed line of that record.
    pub line_number: usize,
}

/// A target cell sector used overnight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvernightSite {
    /// Cell identifier.
    pub label: String,
    /// Sector azimuth, as recorded.
    pub azimuth: String,
    /// Overnight records through this sector.
    pub count: u64,
    /// Cell as described by the first overnight record.
    pub representative: CellSite,
    /// Feed line of that record.
    pub first_line_number: usize,
}

/// Interlocutor numbers sharing an area code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AreaCodeGroup {
    /// Leading digits.
    pub code: String,
    /// Distinct numbers, sorted.
    pub numbers: Vec<String>,
}

/// Records a statistic could not use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedCounters {
    /// No parseable time of day (hourly and overnight).
    pub missing_time: u64,
    /// No interlocutor line (ranking and area codes).
    pub missing_interlocutor: u64,
    /// No target-cell city (cities and trips).
    pub missing_city: u64,
    /// Overnight record whose cell has neither label nor azimuth.
    pub missing_sector: u64,
    /// Interlocutor number not eligible for area-code grouping.
    pub ineligible_number: u64,
}

/// Summary of one dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    /// Call totals.
    pub totals: Totals,
    /// Calls by time of day.
    pub hourly: HourlyHistogram,
    /// Interlocutor ranking.
    pub interlocutors: InterlocutorRanking,
    /// Records per city, by count descending then name ascending.
    pub cities: Vec<CityCount>,
    /// City changes in feed order.
    pub trips: Vec<Trip>,
    /// Overnight sectors, by count descending.
    pub overnight: Vec<OvernightSite>,
    /// Area-code groups, by code ascending.
    pub area_codes: Vec<AreaCodeGroup>,
    /// Records each statistic had to leave out.
    pub skipped: SkippedCounters,
}

impl AggregateStats {
    /// Returns `true` when no record was aggregated.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.totals.processed == 0
    }
}
