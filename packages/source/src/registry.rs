//! Embedded feed schemas.
//!
//! Each `.toml` file in `packages/source/schemas/` is baked into the binary
//! at compile time via [`include_str!`]. A new producer variant needs a new
//! TOML file and an entry in `SCHEMA_TOMLS`; anything else can be loaded
//! at run time with [`load_schema_file`].

use std::path::Path;

use crate::SourceError;
use crate::schema_def::{FeedSchema, parse_schema_toml};

/// TOML configs embedded at compile time.
const SCHEMA_TOMLS: &[(&str, &str)] = &[
    ("export", include_str!("../schemas/export.toml")),
    ("labeled", include_str!("../schemas/labeled.toml")),
    ("snake", include_str!("../schemas/snake.toml")),
];

/// Total number of embedded schemas (used in tests).
#[cfg(test)]
const EXPECTED_SCHEMA_COUNT: usize = 3;

/// Returns all embedded feed schemas.
///
/// # Panics
///
/// Panics if any TOML config is malformed (this is a compile-time guarantee
/// since the configs are embedded).
#[must_use]
pub fn all_schemas() -> Vec<FeedSchema> {
    SCHEMA_TOMLS
        .iter()
        .map(|(name, toml)| {
            parse_schema_toml(toml).unwrap_or_else(|e| panic!("Failed to parse {name}.toml: {e}"))
        })
        .collect()
}

/// Looks up an embedded schema by its ID.
///
/// # Errors
///
/// Returns [`SourceError::UnknownSchema`] if no embedded schema has that ID.
pub fn schema_by_id(id: &str) -> Result<FeedSchema, SourceError> {
    let schemas = all_schemas();
    let available = schemas
        .iter()
        .map(FeedSchema::id)
        .collect::<Vec<_>>()
        .join(", ");

    schemas
        .into_iter()
        .find(|s| s.id == id)
        .ok_or_else(|| SourceError::UnknownSchema {
            id: id.to_string(),
            available,
        })
}

/// Reads a user-supplied schema TOML file.
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or is not a valid
/// schema.
pub fn load_schema_file(path: &Path) -> Result<FeedSchema, SourceError> {
    let contents = std::fs::read_to_string(path)?;
    let schema = parse_schema_toml(&contents)?;
    log::info!("Loaded feed schema '{}' from {}", schema.id, path.display());
    Ok(schema)
}
