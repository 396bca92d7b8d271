#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Pipeline configuration, load report, and loaded dataset types.

use erb_map_analytics_models::{AggregateStats, AggregationConfig};
use erb_map_erb_models::CallEvent;
use erb_map_placement::{PlacementConfig, PlacementCounters, PlacementOutput};
use erb_map_source::feed::ParseError;
use serde::{Deserialize, Serialize};

/// Number of parse errors kept verbatim in a [`LoadReport`].
pub const MAX_ERROR_SAMPLES: usize = 20;

/// Settings for one pipeline run. Every section is optional.
///
/// ```toml
/// schema = "labeled"
///
/// [placement]
/// seed = 7
/// skip_interlocutor_origins = ["CONNECTIONS"]
///
/// [placement.exhaustion]
/// type = "hue_rotation"
/// saturation = 0.65
/// lightness = 0.5
///
/// [aggregation]
/// interlocutor_cutoff_ratio = 0.1
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Embedded schema ID to read the feed with.
    pub schema: Option<String>,
    /// Placement settings.
    pub placement: PlacementConfig,
    /// Aggregation settings.
    pub aggregation: AggregationConfig,
}

impl PipelineConfig {
    /// Parses a pipeline config from TOML.
    ///
    /// # Errors
    ///
    /// Returns the TOML error if the document is malformed or has a field
    /// of the wrong type.
    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// What happened to each line of a loaded feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Lines in the feed, blank ones included.
    pub lines_total: u64,
    /// Whitespace-only lines.
    pub blank_lines: u64,
    /// Lines decoded into records.
    pub events_parsed: u64,
    /// Lines that failed to decode.
    pub parse_errors: u64,
    /// The first [`MAX_ERROR_SAMPLES`] failures.
    pub error_samples: Vec<ParseError>,
    /// Placement leg counts.
    pub placement: PlacementCounters,
}

impl LoadReport {
    /// Records a failed line, keeping it as a sample while there is room.
    pub fn record_error(&mut self, error: ParseError) {
        self.parse_errors += 1;
        if self.error_samples.len() < MAX_ERROR_SAMPLES {
            self.error_samples.push(error);
        }
    }

    /// Returns `true` when every non-blank line decoded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.parse_errors == 0
    }
}

/// Result of one pipeline run, as plain data for a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadedDataset {
    /// Schema the feed was read with.
    pub schema_id: String,
    /// Parsed records in feed order.
    pub events: Vec<CallEvent>,
    /// Placed entities, colors, and heat points.
    pub placement: PlacementOutput,
    /// Summary statistics.
    pub stats: AggregateStats,
    /// Line and leg accounting.
    pub report: LoadReport,
}

#[cfg(test)]
mod tests {
    use erb_map_erb_models::RecordOrigin;
    use erb_map_placement::{Color, ExhaustionPolicy};
    use erb_map_source::feed::ParseErrorKind;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = PipelineConfig::from_toml_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(
            config.placement.skip_interlocutor_origins,
            [RecordOrigin::Connections]
        );
        assert_eq!(config.aggregation.night_end_hour, 6);
    }

    #[test]
    fn parses_all_sections() {
        let config = PipelineConfig::from_toml_str(
            r##"
            schema = "labeled"

            [placement]
            seed = 7
            skip_interlocutor_origins = []

            [placement.exhaustion]
            type = "fallback"
            color = "#808080"

            [aggregation]
            interlocutor_cutoff_ratio = 0.1
            excluded_prefixes = ["0300"]
            "##,
        )
        .unwrap();

        assert_eq!(config.schema.as_deref(), Some("labeled"));
        assert_eq!(config.placement.seed, Some(7));
        assert!(config.placement.skip_interlocutor_origins.is_empty());
        assert_eq!(
            config.placement.exhaustion,
            ExhaustionPolicy::Fallback {
                color: Color::rgb(0x80, 0x80, 0x80)
            }
        );
        assert!((config.aggregation.interlocutor_cutoff_ratio - 0.1).abs() < f64::EPSILON);
        assert_eq!(config.aggregation.excluded_prefixes, ["0300"]);
        assert_eq!(config.aggregation.min_phone_digits, 10);
    }

    #[test]
    fn rejects_bad_color() {
        let err = PipelineConfig::from_toml_str(
            "[placement.exhaustion]\ntype = \"fallback\"\ncolor = \"black\"\n",
        );
        assert!(err.is_err());
    }

    #[test]
    fn error_samples_are_capped() {
        let mut report = LoadReport::default();
        for line_number in 1..=MAX_ERROR_SAMPLES + 5 {
            report.record_error(ParseError {
                line_number,
                content: "{".to_string(),
                kind: ParseErrorKind::InvalidJson,
                message: "EOF".to_string(),
            });
        }
        assert_eq!(report.parse_errors, (MAX_ERROR_SAMPLES + 5) as u64);
        assert_eq!(report.error_samples.len(), MAX_ERROR_SAMPLES);
        assert_eq!(report.error_samples[0].line_number, 1);
        assert!(!report.is_clean());
    }
}
