#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Feed schemas and line-delimited JSON parsing for call-detail records.
//!
//! A feed is newline-delimited JSON, one record per line. Each producer
//! variant is described by a [`schema_def::FeedSchema`], and
//! [`feed::parse_feed`] lazily turns the text into
//! [`erb_map_erb_models::CallEvent`]s, reporting bad lines without
//! aborting the rest of the feed.

pub mod feed;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod schema_def;

/// Errors that can occur while loading schemas or reading feeds.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error (file read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A schema definition could not be parsed.
    #[error("Invalid feed schema: {message}")]
    Schema {
        /// Description of what went wrong.
        message: String,
    },

    /// No embedded schema has the requested ID.
    #[error("Unknown feed schema '{id}'. Available: {available}")]
    UnknownSchema {
        /// The requested schema ID.
        id: String,
        /// Comma-separated list of known schema IDs.
        available: String,
    },
}
