//! Error types for provenance records
//!
//! Provides error handling for:
//! - Index lookups into a workspace history
//! - Replaying a recorded algorithm
//! - Reading and writing persisted history files
//! - Parsing individual legacy text records

use std::path::PathBuf;

/// Errors raised by history operations
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// Index past the end of the history
    #[error("history index {index} is out of range (history holds {size} algorithms)")]
    OutOfRange { index: usize, size: usize },

    /// Operation needs at least one record
    #[error("history contains no algorithms")]
    Empty,

    /// The algorithm factory does not know the recorded algorithm
    #[error("algorithm {name} v{version} is not registered")]
    UnknownAlgorithm { name: String, version: i32 },

    /// A recorded property value was refused on replay
    #[error("algorithm {algorithm} rejected property '{property}': {reason}")]
    PropertyRejected {
        algorithm: String,
        property: String,
        reason: String,
    },

    /// IO failure while reading or writing a history file
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// History file is not a valid container
    #[error("malformed history file {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl HistoryError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Why a single persisted history record could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordParseError {
    /// Too few lines to hold the fixed header
    #[error("malformed history record: incorrect record size ({lines} lines)")]
    IncorrectRecordSize { lines: usize },

    /// A fixed header line carries the wrong label
    #[error("malformed history record: expected '{expected}' line, found '{line}'")]
    MissingField { expected: &'static str, line: String },

    /// First line is not `Algorithm: <name> v<version>`
    #[error("malformed algorithm header: '{0}'")]
    MalformedHeader(String),

    /// Version token is not an integer
    #[error("invalid algorithm version: '{0}'")]
    BadVersion(String),

    /// Execution date cannot be parsed
    #[error("invalid execution date: '{0}'")]
    BadDate(String),

    /// Duration is not a non-negative number
    #[error("invalid execution duration: '{0}'")]
    BadDuration(String),

    /// Property line does not follow `Name: .., Value: .., Default?: .., Direction: ..`
    #[error("malformed property line: '{0}'")]
    MalformedProperty(String),

    /// Direction text is not one of the known directions
    #[error("unknown property direction: '{0}'")]
    UnknownDirection(String),
}
