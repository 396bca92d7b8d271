#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregate statistics over a loaded call-record dataset.
//!
//! [`aggregate`] is a pure function of the records and the settings: the
//! same input always yields the same [`AggregateStats`], and nothing is
//! carried over between calls. Records missing the field a statistic needs
//! are left out of that statistic only and counted in
//! [`AggregateStats::skipped`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::LazyLock;

use erb_map_analytics_models::{
    AggregateStats, AggregationConfig, AreaCodeGroup, CityCount, HourlyHistogram,
    InterlocutorCount, InterlocutorRanking, OvernightSite, Trip,
};
use erb_map_erb_models::{CallDirection, CallEvent, is_numeric_line};
use regex::Regex;
use thiserror::Error;

/// Runs of whitespace, collapsed to one space in city names.
static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Errors in aggregation settings.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A setting is out of range.
    #[error("Invalid aggregation config: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },
}

/// Checks that `config` describes a usable aggregation.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the overnight window is
/// empty or past midnight, the cutoff ratio is outside `0.0..=1.0`, or the
/// area code is longer than the minimum number length.
pub fn validate_config(config: &AggregationConfig) -> Result<(), AnalyticsError> {
    if config.night_start_hour >= config.night_end_hour || config.night_end_hour > 24 {
        return Err(AnalyticsError::InvalidConfig {
            message: format!(
                "night window {}..{} must be non-empty and end by hour 24",
                config.night_start_hour, config.night_end_hour
            ),
        });
    }
    if !(0.0..=1.0).contains(&config.interlocutor_cutoff_ratio) {
        return Err(AnalyticsError::InvalidConfig {
            message: format!(
                "interlocutor_cutoff_ratio {} must be between 0 and 1",
                config.interlocutor_cutoff_ratio
            ),
        });
    }
    if config.area_code_digits == 0 || config.area_code_digits > config.min_phone_digits {
        return Err(AnalyticsError::InvalidConfig {
            message: format!(
                "area_code_digits {} must be between 1 and min_phone_digits ({})",
                config.area_code_digits, config.min_phone_digits
            ),
        });
    }
    Ok(())
}

/// Normalizes a city name for grouping: underscores become spaces,
/// whitespace runs collapse, and the result is trimmed and upper-cased.
///
/// Returns `None` for a blank name.
#[must_use]
pub fn normalize_city(raw: &str) -> Option<String> {
    let spaced = raw.replace('_', " ");
    let collapsed = WHITESPACE_RE.replace_all(spaced.trim(), " ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed.to_uppercase())
    }
}

/// Returns the area code of `number`, or `None` if the number is not
/// eligible: not all digits, too short, all zeros, or starting with an
/// excluded prefix.
#[must_use]
pub fn area_code<'a>(number: &'a str, config: &AggregationConfig) -> Option<&'a str> {
    let number = number.trim();
    if !is_numeric_line(number)
        || number.len() < config.min_phone_digits
        || number.bytes().all(|b| b == b'0')
        || config
            .excluded_prefixes
            .iter()
            .any(|p| number.starts_with(p.as_str()))
    {
        return None;
    }
    number.get(..config.area_code_digits)
}

#[derive(Default)]
struct OvernightTally {
    order: Vec<OvernightSite>,
    index: HashMap<(String, String), usize>,
}

impl OvernightTally {
    fn record(&mut self, event: &CallEvent) -> bool {
        let cell = &event.target_cell;
        let label = cell.label.as_deref().unwrap_or_default().trim().to_string();
        let azimuth = cell.azimuth.as_deref().unwrap_or_default().trim().to_string();
        if label.is_empty() && azimuth.is_empty() {
            return false;
        }

        let key = (label, azimuth);
        if let Some(&idx) = self.index.get(&key) {
            self.order[idx].count += 1;
        } else {
            self.index.insert(key.clone(), self.order.len());
            self.order.push(OvernightSite {
                label: key.0,
                azimuth: key.1,
                count: 1,
                representative: cell.clone(),
                first_line_number: event.line_number,
            });
        }
        true
    }

    fn into_sorted(self) -> Vec<OvernightSite> {
        let mut sites = self.order;
        sites.sort_by(|a, b| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.label.cmp(&b.label))
                .then_with(|| a.azimuth.cmp(&b.azimuth))
        });
        sites
    }
}

/// Computes the summary statistics of `events`.
///
/// Records are read in slice order; trips depend on that order.
#[must_use]
pub fn aggregate(events: &[CallEvent], config: &AggregationConfig) -> AggregateStats {
    let mut stats = AggregateStats::default();
    let mut interlocutors: HashMap<&str, u64> = HashMap::new();
    let mut cities: HashMap<String, u64> = HashMap::new();
    let mut current_city: Option<String> = None;
    let mut overnight = OvernightTally::default();
    let mut area_codes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for event in events {
        stats.totals.processed += 1;
        match event.direction {
            CallDirection::Originated => stats.totals.originated += 1,
            CallDirection::Received => stats.totals.received += 1,
        }

        if let Some(hour) = event.hour() {
            stats.hourly.buckets[HourlyHistogram::bucket_of(hour)] += 1;
            if config.is_night(hour) && !overnight.record(event) {
                stats.skipped.missing_sector += 1;
            }
        } else {
            stats.skipped.missing_time += 1;
        }

        match event
            .interlocutor_line
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
        {
            Some(line) => {
                *interlocutors.entry(line).or_default() += 1;
                match area_code(line, config) {
                    Some(code) => {
                        area_codes
                            .entry(code.to_string())
                            .or_default()
                            .insert(line.to_string());
                    }
                    None => stats.skipped.ineligible_number += 1,
                }
            }
            None => stats.skipped.missing_interlocutor += 1,
        }

        match event.target_cell.city.as_deref().and_then(normalize_city) {
            Some(city) => {
                if current_city.as_deref() != Some(city.as_str()) {
                    stats.trips.push(Trip {
                        city: city.clone(),
                        date: event.occurred_on,
                        line_number: event.line_number,
                    });
                    current_city = Some(city.clone());
                }
                *cities.entry(city).or_default() += 1;
            }
            None => stats.skipped.missing_city += 1,
        }
    }

    stats.interlocutors = rank_interlocutors(interlocutors, config.interlocutor_cutoff_ratio);
    stats.cities = sort_cities(cities);
    stats.overnight = overnight.into_sorted();
    stats.area_codes = area_codes
        .into_iter()
        .map(|(code, numbers)| AreaCodeGroup {
            code,
            numbers: numbers.into_iter().collect(),
        })
        .collect();

    log::debug!(
        "Aggregated {} records: {} interlocutors, {} cities, {} trips, {} overnight sectors",
        stats.totals.processed,
        stats.interlocutors.ranking.len(),
        stats.cities.len(),
        stats.trips.len(),
        stats.overnight.len()
    );

    stats
}

#[allow(clippy::cast_precision_loss)]
fn rank_interlocutors(counts: HashMap<&str, u64>, cutoff_ratio: f64) -> InterlocutorRanking {
    let mut ranking: Vec<InterlocutorCount> = counts
        .into_iter()
        .map(|(line, count)| InterlocutorCount {
            line: line.to_string(),
            count,
        })
        .collect();
    ranking.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.line.cmp(&b.line)));

    let threshold = ranking.first().map_or(0.0, |top| top.count as f64 * cutoff_ratio);
    let retained = ranking
        .iter()
        .filter(|entry| entry.count as f64 > threshold)
        .cloned()
        .collect();

    InterlocutorRanking {
        ranking,
        threshold,
        retained,
    }
}

fn sort_cities(counts: HashMap<String, u64>) -> Vec<CityCount> {
    let mut cities: Vec<CityCount> = counts
        .into_iter()
        .map(|(city, count)| CityCount { city, count })
        .collect();
    cities.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.city.cmp(&b.city)));
    cities
}
