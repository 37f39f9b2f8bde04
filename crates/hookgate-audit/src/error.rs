//! Error types for the audit crate.

use hookgate_core::InvariantError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while recording an event.
///
/// Recording failures are reported, never fatal to the action that
/// triggered the event.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The record breaks a history invariant and was not written.
    #[error("invalid event record: {0}")]
    Invalid(#[from] InvariantError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Some views could not be written; the others were.
    #[error("failed to write {} of {} log views: {}", .failures.len(), .attempted, join_failures(.failures))]
    Views {
        attempted: usize,
        failures: Vec<ViewWriteError>,
    },
}

/// A single view that could not be appended to.
#[derive(Debug, Error)]
#[error("{}: {source}", .path.display())]
pub struct ViewWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

fn join_failures(failures: &[ViewWriteError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A record could not be parsed back from a view.
///
/// Counted and skipped; reading continues with the next record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The record closed but is not a valid event record.
    #[error("line {line}: malformed record: {message}")]
    Malformed { line: usize, message: String },

    /// The record never closed (end of input, or a new record began).
    #[error("line {line}: record never closed")]
    Truncated { line: usize },

    /// Content outside any record.
    #[error("line {line}: unexpected content outside a record")]
    Stray { line: usize },
}

impl ParseError {
    /// Line where the offending record started.
    pub fn line(&self) -> usize {
        match self {
            Self::Malformed { line, .. } | Self::Truncated { line } | Self::Stray { line } => *line,
        }
    }
}

/// A view could not be opened for reading.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("failed to open log view {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Invalid query criteria, reported to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("invalid time bound '{value}': expected RFC 3339 (2026-01-31T12:00:00Z) or a date (2026-01-31)")]
    InvalidTimeBound { value: String },

    #[error("invalid hours '{value}': must be a positive number")]
    InvalidHours { value: String },

    #[error(transparent)]
    UnknownEventType(#[from] hookgate_core::event::UnknownEventType),

    #[error("{0} cannot be combined")]
    ConflictingBounds(String),

    #[error("empty time window: since {since} is not before until {until}")]
    EmptyWindow { since: String, until: String },

    #[error("invalid log view '{value}': expected all, daily:YYYY-MM-DD, type:<EventType> or a file path")]
    InvalidView { value: String },
}
