#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for loading a call-detail feed into a placed, aggregated
//! dataset.
//!
//! One call to [`load_dataset`] parses the feed, places every cell sector,
//! and computes the summary statistics. Each call starts from a fresh
//! placement session, so nothing from a previous load survives into the
//! next one.

pub mod interactive;
pub mod report;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use erb_map_analytics::{AnalyticsError, aggregate, validate_config};
use erb_map_ingest_models::{LoadReport, LoadedDataset, PipelineConfig};
use erb_map_placement::PlacementSession;
use erb_map_source::SourceError;
use erb_map_source::feed::parse_feed;
use erb_map_source::progress::{LoadPhase, ProgressCallback};
use erb_map_source::schema_def::FeedSchema;

/// Environment variable naming the schema to use when none is given on the
/// command line.
pub const SCHEMA_ENV_VAR: &str = "ERB_MAP_SCHEMA";

/// Schema used when nothing else selects one.
pub const DEFAULT_SCHEMA_ID: &str = "export";

/// Errors that stop a pipeline run before it starts.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Schema lookup or schema file failed.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A config or feed file could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The pipeline config is not valid TOML for [`PipelineConfig`].
    #[error("Invalid pipeline config {}: {source}", path.display())]
    Config {
        /// Config file.
        path: PathBuf,
        /// Underlying error.
        source: toml::de::Error,
    },

    /// The aggregation settings are out of range.
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),
}

/// Returns all embedded feed schemas.
#[must_use]
pub fn all_schemas() -> Vec<FeedSchema> {
    erb_map_source::registry::all_schemas()
}

/// Reads a pipeline config file, or returns the defaults when `path` is
/// `None`.
///
/// # Errors
///
/// Returns [`PipelineError`] if the file cannot be read, is not a valid
/// config, or has out-of-range aggregation settings.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, PipelineError> {
    let config = match path {
        Some(path) => {
            let contents = read_file(path)?;
            PipelineConfig::from_toml_str(&contents).map_err(|source| PipelineError::Config {
                path: path.to_path_buf(),
                source,
            })?
        }
        None => PipelineConfig::default(),
    };
    validate_config(&config.aggregation)?;
    Ok(config)
}

/// Picks the feed schema for a run.
///
/// A schema file wins over everything. Otherwise the ID comes from the
/// `--schema` flag, then the `ERB_MAP_SCHEMA` environment variable, then
/// the config's `schema`, and finally [`DEFAULT_SCHEMA_ID`].
///
/// # Errors
///
/// Returns [`PipelineError`] if the schema file is unreadable or invalid,
/// or the ID names no embedded schema.
pub fn resolve_schema(
    cli_id: Option<&str>,
    schema_file: Option<&Path>,
    config: &PipelineConfig,
) -> Result<FeedSchema, PipelineError> {
    if let Some(path) = schema_file {
        return Ok(erb_map_source::registry::load_schema_file(path)?);
    }

    let id = cli_id
        .map(ToString::to_string)
        .or_else(|| std::env::var(SCHEMA_ENV_VAR).ok())
        .filter(|id| !id.trim().is_empty())
        .or_else(|| config.schema.clone())
        .unwrap_or_else(|| DEFAULT_SCHEMA_ID.to_string());

    Ok(erb_map_source::registry::schema_by_id(id.trim())?)
}

/// Reads a file to a string, attaching its path to any error.
///
/// # Errors
///
/// Returns [`PipelineError::Io`] if the file cannot be read.
pub fn read_file(path: &Path) -> Result<String, PipelineError> {
    std::fs::read_to_string(path).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Parses, places, and aggregates one feed.
///
/// Lines that fail to decode are counted in the report and skipped; the
/// load itself never fails.
#[must_use]
pub fn load_dataset(
    feed: &str,
    schema: &FeedSchema,
    config: &PipelineConfig,
    progress: Arc<dyn ProgressCallback>,
) -> LoadedDataset {
    let start = Instant::now();
    log::info!("Loading feed with schema: {} ({})", schema.name(), schema.id());

    let mut report = LoadReport::default();
    let mut events = Vec::new();

    progress.start_phase(LoadPhase::Parsing, Some(feed.lines().count() as u64));
    let mut reader = parse_feed(feed, schema).with_progress(Arc::clone(&progress));
    for result in reader.by_ref() {
        match result {
            Ok(event) => events.push(event),
            Err(e) => report.record_error(e),
        }
    }
    report.lines_total = reader.lines_read() as u64;
    report.blank_lines = reader.blank_lines() as u64;
    report.events_parsed = events.len() as u64;

    progress.start_phase(LoadPhase::Placing, Some(events.len() as u64));
    let mut session = PlacementSession::new(&config.placement);
    for event in &events {
        session.place_event(event);
        progress.advance(1);
    }
    let placement = session.finish();
    report.placement = placement.counters.clone();

    progress.start_phase(LoadPhase::Aggregating, None);
    let stats = aggregate(&events, &config.aggregation);

    let summary = format!(
        "{}: {} records, {} bad lines, {} sectors placed, {} legs skipped in {:.2}s",
        schema.id(),
        report.events_parsed,
        report.parse_errors,
        report.placement.placed,
        report.placement.skipped_total(),
        start.elapsed().as_secs_f64()
    );
    log::info!("{summary}");
    if report.parse_errors > 0 {
        log::warn!(
            "{} line(s) could not be decoded; first at line {}",
            report.parse_errors,
            report
                .error_samples
                .first()
                .map_or(0, |e| e.line_number)
        );
    }
    progress.finish(summary);

    LoadedDataset {
        schema_id: schema.id().to_string(),
        events,
        placement,
        stats,
        report,
    }
}

/// What to load and how, as collected from the command line or the
/// interactive prompts.
#[derive(Debug, Clone, Default)]
pub struct LoadRequest {
    /// Feed file.
    pub feed: PathBuf,
    /// Embedded schema ID.
    pub schema: Option<String>,
    /// Schema TOML file, overrides `schema`.
    pub schema_file: Option<PathBuf>,
    /// Pipeline config TOML file.
    pub config: Option<PathBuf>,
    /// Color seed, overrides the config's.
    pub seed: Option<u64>,
}

/// Resolves config and schema for `request`, reads the feed file, and
/// loads it.
///
/// # Errors
///
/// Returns [`PipelineError`] if the config, schema, or feed cannot be
/// read.
pub fn load_file(
    request: &LoadRequest,
    progress: Arc<dyn ProgressCallback>,
) -> Result<LoadedDataset, PipelineError> {
    let mut config = load_config(request.config.as_deref())?;
    if request.seed.is_some() {
        config.placement.seed = request.seed;
    }
    let schema = resolve_schema(
        request.schema.as_deref(),
        request.schema_file.as_deref(),
        &config,
    )?;
    let feed = read_file(&request.feed)?;

    Ok(load_dataset(&feed, &schema, &config, progress))
}

#[cfg(test)]
mod tests {
    use erb_map_erb_models::LegRole;
    use erb_map_placement::{PlacementConfig, SkipReason};
    use erb_map_source::progress::null_progress;
    use erb_map_source::registry::schema_by_id;
    use serde_json::json;

    use super::*;

    fn seeded(seed: u64) -> PipelineConfig {
        PipelineConfig {
            placement: PlacementConfig {
                seed: Some(seed),
                ..PlacementConfig::default()
            },
            ..PipelineConfig::default()
        }
    }

    fn record(target: &str, other: &str, lat: &str, lon: &str, az: &str, hour: u32) -> String {
        json!({
            "ALVO": target,
            "INTERLOCUTOR": other,
            "TIPO": "ORIGINADA",
            "DATA_FORMATADA": "2024-03-01",
            "HORA_FORMATADA": format!("{hour:02}:10:00"),
            "ERB_ALVO": "DF0001",
            "ERB_ALVO_LATITUDE": "-10",
            "ERB_ALVO_LONGITUDE": "-50",
            "ERB_ALVO_AZIMUTE": "30",
            "ERB_ALVO_CIDADE": "BRASILIA",
            "ERB_INTERLOCUTOR_LATITUDE": lat,
            "ERB_INTERLOCUTOR_LONGITUDE": lon,
            "ERB_INTERLOCUTOR_AZIMUTE": az,
        })
        .to_string()
    }

    fn feed() -> String {
        [
            record("61999990000", "11988887777", "-23.5", "-46.6", "120", 1),
            String::new(),
            record("61999990000", "21977776666", "-22.9", "-43.2", "0", 14),
            "{\"ALVO\": ".to_string(),
        ]
        .join("\n")
    }

    #[test]
    fn shared_target_sector_links_both_interlocutors() {
        let schema = schema_by_id("export").unwrap();
        let dataset = load_dataset(&feed(), &schema, &seeded(1), null_progress());

        let entities = &dataset.placement.entities;
        let targets: Vec<_> = entities.iter().filter(|e| e.role == LegRole::Target).collect();
        assert_eq!(targets.len(), 1);
        let target_id = targets[0].id;
        let others: Vec<_> = entities
            .iter()
            .filter(|e| e.role == LegRole::Interlocutor)
            .collect();
        assert_eq!(others.len(), 2);
        assert!(others.iter().all(|e| e.linked.contains(&target_id)));
    }

    #[test]
    fn report_accounts_for_every_line() {
        let schema = schema_by_id("export").unwrap();
        let dataset = load_dataset(&feed(), &schema, &seeded(1), null_progress());
        let report = &dataset.report;

        assert_eq!(report.lines_total, 4);
        assert_eq!(report.blank_lines, 1);
        assert_eq!(report.events_parsed, 2);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(report.error_samples[0].line_number, 4);
        assert_eq!(
            report.lines_total,
            report.blank_lines + report.events_parsed + report.parse_errors
        );
        assert_eq!(dataset.stats.totals.processed, 2);
        assert_eq!(dataset.stats.hourly.total(), 2);
    }

    #[test]
    fn repeated_loads_are_identical() {
        let schema = schema_by_id("export").unwrap();
        let config = seeded(9);
        let first = load_dataset(&feed(), &schema, &config, null_progress());
        let second = load_dataset(&feed(), &schema, &config, null_progress());
        assert_eq!(first, second);
    }

    #[test]
    fn nothing_leaks_between_loads() {
        let schema = schema_by_id("export").unwrap();
        let config = seeded(3);
        let other = record("61911112222", "31955554444", "-19.9", "-43.9", "60", 9);

        let fresh = load_dataset(&other, &schema, &config, null_progress());
        let _ = load_dataset(&feed(), &schema, &config, null_progress());
        let after = load_dataset(&other, &schema, &config, null_progress());

        assert_eq!(fresh, after);
        assert_eq!(after.placement.entities.len(), 2);
        assert_eq!(after.placement.colors.len(), 1);
    }

    #[test]
    fn connections_records_place_only_the_target() {
        let schema = schema_by_id("export").unwrap();
        let mut value: serde_json::Value =
            serde_json::from_str(&record("61999990000", "11988887777", "-1", "-2", "3", 8))
                .unwrap();
        value["origem"] = json!("Conexões");
        let dataset = load_dataset(&value.to_string(), &schema, &seeded(1), null_progress());

        assert_eq!(dataset.placement.entities.len(), 1);
        assert!(dataset.placement.entities[0].linked.is_empty());
        assert_eq!(
            dataset.report.placement.skipped.get(&SkipReason::ExcludedOrigin),
            Some(&1)
        );
    }

    #[test]
    fn empty_feed_is_distinguishable() {
        let schema = schema_by_id("export").unwrap();
        let dataset = load_dataset("", &schema, &PipelineConfig::default(), null_progress());
        assert!(dataset.stats.is_empty());
        assert_eq!(dataset.report, LoadReport::default());
        assert!(dataset.placement.entities.is_empty());
    }

    #[test]
    fn resolves_schema_from_flag_then_config() {
        let config = PipelineConfig {
            schema: Some("labeled".to_string()),
            ..PipelineConfig::default()
        };
        let schema = resolve_schema(Some("snake"), None, &config).unwrap();
        assert_eq!(schema.id(), "snake");

        assert!(matches!(
            resolve_schema(Some("bogus"), None, &config),
            Err(PipelineError::Source(SourceError::UnknownSchema { .. }))
        ));
    }

    #[test]
    fn load_file_reports_missing_feed() {
        let request = LoadRequest {
            feed: PathBuf::from("/nonexistent/feed.jsonl"),
            schema: Some("export".to_string()),
            ..LoadRequest::default()
        };
        assert!(matches!(
            load_file(&request, null_progress()),
            Err(PipelineError::Io { .. })
        ));
    }

    #[test]
    fn missing_config_file_reports_its_path() {
        let err = load_config(Some(Path::new("/nonexistent/erb_map.toml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/erb_map.toml"));
        assert!(load_config(None).is_ok());
    }

    #[test]
    fn labeled_feed_splits_directions() {
        let schema = schema_by_id("labeled").unwrap();
        let line = |direction: Option<&str>| {
            let mut value = json!({
                "Linha do Alvo": "61999990000",
                "Linha do Interlocutor": "11988887777",
                "Data e Hora": "01/02/2024 04:30:00",
                "Latitude da ERB do Alvo": "-15,8",
                "Longitude da ERB do Alvo": "-47,9",
                "Azimute do Alvo": "240",
            });
            if let Some(direction) = direction {
                value["Direção"] = json!(direction);
            }
            value.to_string()
        };
        let feed = [
            line(Some("Originada")),
            line(Some("Recebida")),
            line(Some("Recebida")),
            line(None),
        ]
        .join("\n");

        let dataset = load_dataset(&feed, &schema, &seeded(1), null_progress());
        let totals = dataset.stats.totals;
        assert_eq!(totals.processed, 4);
        assert_eq!(totals.originated, 2);
        assert_eq!(totals.received, 2);
    }
}
