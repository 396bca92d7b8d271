//! Config-driven feed schema definition.
//!
//! Producers of call-detail feeds disagree on field names for the same
//! concept (`ERB_ALVO_LATITUDE`, `"Latitude da ERB do Alvo"`,
//! `erb_alvo_latitude`, ...). A [`FeedSchema`] captures one naming
//! convention in a serializable config struct, and a single generic
//! normalizer turns any record into a [`CallEvent`].

use erb_map_erb_models::{CallDirection, CallEvent, CellSite, RecordOrigin};
use serde::Deserialize;

use crate::SourceError;
use crate::parsing::{
    first_non_empty, first_text, parse_date, parse_datetime, parse_duration_seconds, parse_time,
};

// ── Top-level schema definition ──────────────────────────────────────────

/// A complete feed schema: how to map one producer's field names onto
/// [`CallEvent`].
#[derive(Debug, Clone, Deserialize)]
pub struct FeedSchema {
    /// Unique identifier (e.g., `"export"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Field name mappings.
    pub fields: FieldMapping,
    /// Which direction values mean "originated".
    #[serde(default)]
    pub direction: DirectionMapping,
    /// Which origin values map to which [`RecordOrigin`].
    #[serde(default)]
    pub origins: OriginMapping,
}

// ── Field mapping ────────────────────────────────────────────────────────

/// Maps producer-specific JSON field names to [`CallEvent`] fields.
///
/// Every entry is a list of candidate field names tried in order; the
/// first one present with a non-null value wins.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldMapping {
    /// Producer record ID.
    #[serde(default)]
    pub record_id: Vec<String>,
    /// Call direction (`"ORIGINADA"`, `"RECEBIDA"`, ...).
    #[serde(default)]
    pub direction: Vec<String>,
    /// How to extract the date and time of the call.
    pub timestamp: TimestampExtractor,
    /// Call duration.
    #[serde(default)]
    pub duration: Vec<String>,
    /// Calling number (A side).
    #[serde(default)]
    pub caller: Vec<String>,
    /// Called number (B side).
    #[serde(default)]
    pub callee: Vec<String>,
    /// Line under investigation.
    pub target_line: Vec<String>,
    /// The other party's line.
    pub interlocutor_line: Vec<String>,
    /// Operator serving the target.
    #[serde(default)]
    pub target_operator: Vec<String>,
    /// Operator serving the interlocutor.
    #[serde(default)]
    pub interlocutor_operator: Vec<String>,
    /// Cell serving the target at call start.
    pub target_cell: CellFields,
    /// Cell serving the target at call end. Only some producers report it.
    #[serde(default)]
    pub final_target_cell: Option<CellFields>,
    /// Cell serving the interlocutor.
    #[serde(default)]
    pub interlocutor_cell: Option<CellFields>,
    /// Record origin tag.
    #[serde(default)]
    pub origin: Vec<String>,
}

/// Field names describing one cell site.
#[derive(Debug, Clone, Deserialize)]
pub struct CellFields {
    /// Latitude field candidates.
    pub latitude: Vec<String>,
    /// Longitude field candidates.
    pub longitude: Vec<String>,
    /// Azimuth field candidates.
    pub azimuth: Vec<String>,
    /// City field candidates.
    #[serde(default)]
    pub city: Vec<String>,
    /// Address field candidates.
    #[serde(default)]
    pub address: Vec<String>,
    /// Cell identifier field candidates.
    #[serde(default)]
    pub label: Vec<String>,
}

// ── Strategy enums ───────────────────────────────────────────────────────

/// How to extract the call date and time from a raw record.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TimestampExtractor {
    /// Separate date and time-of-day fields.
    DatePlusTime {
        /// JSON field holding the date.
        date_field: String,
        /// JSON field holding the time of day.
        time_field: String,
    },
    /// One field holding both, e.g. `"15/01/2024 03:12:44"`.
    Combined {
        /// JSON field name.
        field: String,
    },
}

/// Values of the direction field for each [`CallDirection`]. A value that
/// matches neither list, or a missing field, resolves to `fallback`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectionMapping {
    /// Case-insensitive values meaning [`CallDirection::Originated`].
    pub originated: Vec<String>,
    /// Case-insensitive values meaning [`CallDirection::Received`].
    pub received: Vec<String>,
    /// Direction of records whose value is missing or unrecognized.
    pub fallback: CallDirection,
}

impl Default for DirectionMapping {
    fn default() -> Self {
        Self {
            originated: vec!["ORIGINADA".to_string(), "ORIGINATED".to_string()],
            received: vec!["RECEBIDA".to_string(), "RECEIVED".to_string()],
            fallback: CallDirection::Received,
        }
    }
}

/// Values of the origin field for each [`RecordOrigin`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OriginMapping {
    /// Case-insensitive values meaning [`RecordOrigin::Interception`].
    pub interception: Vec<String>,
    /// Case-insensitive values meaning [`RecordOrigin::CallHistory`].
    pub call_history: Vec<String>,
    /// Case-insensitive values meaning [`RecordOrigin::Connections`].
    pub connections: Vec<String>,
}

impl Default for OriginMapping {
    fn default() -> Self {
        Self {
            interception: vec!["Interceptação".to_string(), "INTERCEPTION".to_string()],
            call_history: vec![
                "Histórico de Chamadas".to_string(),
                "CALL_HISTORY".to_string(),
            ],
            connections: vec!["Conexões".to_string(), "CONNECTIONS".to_string()],
        }
    }
}

// ── Helper methods on extractors ─────────────────────────────────────────

fn matches_any(value: &str, candidates: &[String]) -> bool {
    let value = value.trim();
    candidates
        .iter()
        .any(|c| c.trim().to_lowercase() == value.to_lowercase())
}

impl TimestampExtractor {
    /// Extracts the date and time of day from a JSON record. Either half
    /// may be missing independently.
    fn extract(
        &self,
        record: &serde_json::Value,
    ) -> (Option<chrono::NaiveDate>, Option<chrono::NaiveTime>) {
        match self {
            Self::DatePlusTime {
                date_field,
                time_field,
            } => {
                let date = record
                    .get(date_field)
                    .and_then(crate::parsing::value_text)
                    .and_then(|s| parse_date(&s));
                let time = record
                    .get(time_field)
                    .and_then(crate::parsing::value_text)
                    .and_then(|s| parse_time(&s));
                (date, time)
            }
            Self::Combined { field } => {
                let Some(text) = record.get(field).and_then(crate::parsing::value_text) else {
                    return (None, None);
                };
                parse_datetime(&text).map_or_else(
                    || (parse_date(&text), None),
                    |dt| (Some(dt.date()), Some(dt.time())),
                )
            }
        }
    }
}

impl CellFields {
    /// Extracts a cell site from a JSON record. Returns `None` when none of
    /// the coordinate fields are present at all.
    fn extract(&self, record: &serde_json::Value) -> Option<CellSite> {
        let latitude = first_text(record, &self.latitude);
        let longitude = first_text(record, &self.longitude);
        let azimuth = first_text(record, &self.azimuth);
        let city = first_non_empty(record, &self.city);
        let address = first_non_empty(record, &self.address);
        let label = first_non_empty(record, &self.label);

        if latitude.is_none()
            && longitude.is_none()
            && azimuth.is_none()
            && city.is_none()
            && label.is_none()
        {
            return None;
        }

        Some(CellSite {
            latitude,
            longitude,
            azimuth,
            city,
            address,
            label,
        })
    }
}

impl DirectionMapping {
    fn classify(&self, raw: Option<&str>) -> CallDirection {
        match raw {
            Some(value) if matches_any(value, &self.originated) => CallDirection::Originated,
            Some(value) if matches_any(value, &self.received) => CallDirection::Received,
            _ => self.fallback,
        }
    }
}

impl OriginMapping {
    fn classify(&self, raw: Option<&str>) -> RecordOrigin {
        let Some(value) = raw else {
            return RecordOrigin::Unspecified;
        };
        if matches_any(value, &self.interception) {
            RecordOrigin::Interception
        } else if matches_any(value, &self.call_history) {
            RecordOrigin::CallHistory
        } else if matches_any(value, &self.connections) {
            RecordOrigin::Connections
        } else {
            RecordOrigin::Unspecified
        }
    }
}

// ── Normalization ───────────────────────────────────────────────────────

impl FeedSchema {
    /// Returns the unique schema identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the human-readable schema name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalizes one decoded JSON record into a [`CallEvent`].
    ///
    /// Missing fields never fail normalization; they surface as `None`
    /// and the consumers decide what to skip.
    #[must_use]
    pub fn normalize_record(&self, record: &serde_json::Value, line_number: usize) -> CallEvent {
        let fields = &self.fields;

        let (occurred_on, time_of_day) = fields.timestamp.extract(record);

        let direction_raw = first_non_empty(record, &fields.direction);
        let origin_raw = first_non_empty(record, &fields.origin);

        let target_cell = fields
            .target_cell
            .extract(record)
            .unwrap_or_default();
        let final_target_cell = fields
            .final_target_cell
            .as_ref()
            .and_then(|f| f.extract(record));
        let interlocutor_cell = fields
            .interlocutor_cell
            .as_ref()
            .and_then(|f| f.extract(record));

        CallEvent {
            line_number,
            record_id: first_non_empty(record, &fields.record_id),
            direction: self.direction.classify(direction_raw.as_deref()),
            occurred_on,
            time_of_day,
            duration_seconds: first_non_empty(record, &fields.duration)
                .and_then(|s| parse_duration_seconds(&s)),
            caller: first_non_empty(record, &fields.caller),
            callee: first_non_empty(record, &fields.callee),
            target_line: first_non_empty(record, &fields.target_line),
            interlocutor_line: first_non_empty(record, &fields.interlocutor_line),
            target_operator: first_non_empty(record, &fields.target_operator),
            interlocutor_operator: first_non_empty(record, &fields.interlocutor_operator),
            target_cell,
            final_target_cell,
            interlocutor_cell,
            origin: self.origins.classify(origin_raw.as_deref()),
        }
    }
}

/// Parses a [`FeedSchema`] from a TOML string.
///
/// # Errors
///
/// Returns [`SourceError::Schema`] if the TOML is malformed or missing
/// required fields.
pub fn parse_schema_toml(toml_str: &str) -> Result<FeedSchema, SourceError> {
    toml::de::from_str(toml_str).map_err(|e| SourceError::Schema {
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell_fields(prefix: &str) -> CellFields {
        CellFields {
            latitude: vec![format!("{prefix}_LATITUDE")],
            longitude: vec![format!("{prefix}_LONGITUDE")],
            azimuth: vec![format!("{prefix}_AZIMUTE")],
            city: vec![format!("{prefix}_CIDADE")],
            address: vec![],
            label: vec![prefix.to_string()],
        }
    }

    fn schema() -> FeedSchema {
        FeedSchema {
            id: "test".to_string(),
            name: "Test".to_string(),
            fields: FieldMapping {
                record_id: vec!["id".to_string()],
                direction: vec!["TIPO".to_string()],
                timestamp: TimestampExtractor::DatePlusTime {
                    date_field: "DATA".to_string(),
                    time_field: "HORA".to_string(),
                },
                duration: vec!["DURACAO".to_string()],
                caller: vec![],
                callee: vec![],
                target_line: vec!["ALVO".to_string()],
                interlocutor_line: vec!["INTERLOCUTOR".to_string()],
                target_operator: vec![],
                interlocutor_operator: vec![],
                target_cell: cell_fields("ERB_ALVO"),
                final_target_cell: None,
                interlocutor_cell: Some(cell_fields("ERB_INTERLOCUTOR")),
                origin: vec!["origem".to_string()],
            },
            direction: DirectionMapping::default(),
            origins: OriginMapping::default(),
        }
    }

    #[test]
    fn normalizes_full_record() {
        let record = serde_json::json!({
            "id": 42,
            "TIPO": "originada",
            "DATA": "2024-03-01",
            "HORA": "02:15:00",
            "DURACAO": "00:00:45",
            "ALVO": "61999990000",
            "INTERLOCUTOR": 61988887777_u64,
            "ERB_ALVO": "BSB01",
            "ERB_ALVO_LATITUDE": "-15,78",
            "ERB_ALVO_LONGITUDE": "-47,93",
            "ERB_ALVO_AZIMUTE": 120,
            "ERB_ALVO_CIDADE": "brasilia",
            "origem": "Interceptação"
        });
        let event = schema().normalize_record(&record, 7);

        assert_eq!(event.line_number, 7);
        assert_eq!(event.record_id.as_deref(), Some("42"));
        assert_eq!(event.direction, CallDirection::Originated);
        assert_eq!(event.occurred_on.unwrap().to_string(), "2024-03-01");
        assert_eq!(event.hour(), Some(2));
        assert_eq!(event.duration_seconds, Some(45));
        assert_eq!(event.interlocutor_line.as_deref(), Some("61988887777"));
        assert_eq!(event.target_cell.latitude.as_deref(), Some("-15,78"));
        assert_eq!(event.target_cell.azimuth.as_deref(), Some("120"));
        assert!((event.target_cell.latitude_deg().unwrap() - -15.78).abs() < 1e-9);
        assert_eq!(event.target_cell.label.as_deref(), Some("BSB01"));
        assert!(event.interlocutor_cell.is_none());
        assert_eq!(event.origin, RecordOrigin::Interception);
    }

    #[test]
    fn unknown_direction_is_received() {
        let record = serde_json::json!({"TIPO": "RECEBIDA"});
        let event = schema().normalize_record(&record, 1);
        assert_eq!(event.direction, CallDirection::Received);

        let event = schema().normalize_record(&serde_json::json!({}), 1);
        assert_eq!(event.direction, CallDirection::Received);
        assert_eq!(event.origin, RecordOrigin::Unspecified);
    }

    #[test]
    fn direction_fallback_applies_to_unlisted_values() {
        let mut schema = schema();
        schema.direction.fallback = CallDirection::Originated;

        let event = schema.normalize_record(&serde_json::json!({"TIPO": "Recebida"}), 1);
        assert_eq!(event.direction, CallDirection::Received);

        let event = schema.normalize_record(&serde_json::json!({"TIPO": "Desviada"}), 2);
        assert_eq!(event.direction, CallDirection::Originated);

        let event = schema.normalize_record(&serde_json::json!({}), 3);
        assert_eq!(event.direction, CallDirection::Originated);
    }

    #[test]
    fn combined_timestamp_falls_back_to_date_only() {
        let extractor = TimestampExtractor::Combined {
            field: "Data e Hora".to_string(),
        };
        let (date, time) = extractor.extract(&serde_json::json!({"Data e Hora": "15/01/2024 23:10:00"}));
        assert_eq!(date.unwrap().to_string(), "2024-01-15");
        assert_eq!(time.unwrap().to_string(), "23:10:00");

        let (date, time) = extractor.extract(&serde_json::json!({"Data e Hora": "15/01/2024"}));
        assert_eq!(date.unwrap().to_string(), "2024-01-15");
        assert!(time.is_none());
    }

    #[test]
    fn keeps_raw_coordinate_text() {
        let record = serde_json::json!({
            "ERB_INTERLOCUTOR_LATITUDE": "-15.70",
            "ERB_INTERLOCUTOR_LONGITUDE": "",
            "ERB_INTERLOCUTOR_AZIMUTE": null
        });
        let event = schema().normalize_record(&record, 1);
        let cell = event.interlocutor_cell.unwrap();
        assert_eq!(cell.latitude.as_deref(), Some("-15.70"));
        assert_eq!(cell.longitude.as_deref(), Some(""));
        assert!(cell.azimuth.is_none());
    }

    #[test]
    fn rejects_schema_without_timestamp() {
        let err = parse_schema_toml("id = \"x\"\nname = \"x\"\n[fields]\ntarget_line = []\n")
            .unwrap_err();
        assert!(matches!(err, SourceError::Schema { .. }));
    }
}
