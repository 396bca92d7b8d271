//! Lazy reader over a newline-delimited JSON feed.
//!
//! Each non-blank line must hold one JSON object. Lines that fail to decode
//! are yielded as [`ParseError`]s so that the caller can report them and
//! keep going; one bad export row never aborts the whole feed.

use std::sync::Arc;

use erb_map_erb_models::CallEvent;
use serde::Serialize;

use crate::progress::ProgressCallback;
use crate::schema_def::FeedSchema;

/// Maximum number of characters of an offending line kept in log output.
const LOG_SNIPPET_CHARS: usize = 120;

/// Why a feed line could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorKind {
    /// The line is not valid JSON.
    InvalidJson,
    /// The line is valid JSON but not an object.
    NotAnObject,
}

/// One feed line that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(rename_all = "camelCase")]
#[error("line {line_number}: {message}")]
pub struct ParseError {
    /// 1-based line number in the feed.
    pub line_number: usize,
    /// The offending line, verbatim.
    pub content: String,
    /// Failure category.
    pub kind: ParseErrorKind,
    /// Decoder message.
    pub message: String,
}

/// Iterator yielding one [`CallEvent`] or [`ParseError`] per non-blank line.
pub struct FeedReader<'a> {
    lines: std::iter::Enumerate<std::str::Lines<'a>>,
    schema: &'a FeedSchema,
    progress: Option<Arc<dyn ProgressCallback>>,
    blank_lines: usize,
    lines_read: usize,
}

/// Starts reading `feed` with the field names from `schema`.
#[must_use]
pub fn parse_feed<'a>(feed: &'a str, schema: &'a FeedSchema) -> FeedReader<'a> {
    FeedReader {
        lines: feed.lines().enumerate(),
        schema,
        progress: None,
        blank_lines: 0,
        lines_read: 0,
    }
}

impl<'a> FeedReader<'a> {
    /// Reports one unit of progress per line read.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Number of whitespace-only lines skipped so far.
    #[must_use]
    pub const fn blank_lines(&self) -> usize {
        self.blank_lines
    }

    /// Number of lines consumed so far, blank ones included.
    #[must_use]
    pub const fn lines_read(&self) -> usize {
        self.lines_read
    }

    fn decode(&self, line_number: usize, line: &'a str) -> Result<CallEvent, ParseError> {
        let value: serde_json::Value =
            serde_json::from_str(line).map_err(|e| ParseError {
                line_number,
                content: line.to_string(),
                kind: ParseErrorKind::InvalidJson,
                message: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(ParseError {
                line_number,
                content: line.to_string(),
                kind: ParseErrorKind::NotAnObject,
                message: "expected a JSON object".to_string(),
            });
        }

        Ok(self.schema.normalize_record(&value, line_number))
    }
}

impl Iterator for FeedReader<'_> {
    type Item = Result<CallEvent, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (idx, line) = self.lines.next()?;
            self.lines_read += 1;
            if let Some(progress) = &self.progress {
                progress.advance(1);
            }

            if line.trim().is_empty() {
                self.blank_lines += 1;
                continue;
            }

            let result = self.decode(idx + 1, line.trim());
            if let Err(e) = &result {
                log::warn!(
                    "Skipping feed line {}: {} ({})",
                    e.line_number,
                    e.message,
                    snippet(&e.content)
                );
            }
            return Some(result);
        }
    }
}

/// Truncates a line for log output without splitting a UTF-8 character.
fn snippet(line: &str) -> String {
    if line.chars().count() <= LOG_SNIPPET_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(LOG_SNIPPET_CHARS).collect();
    out.push_str("...");
    out
}
