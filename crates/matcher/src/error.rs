use std::fmt;

use crate::model::{Field, MatchType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (threshold out of range, zero weights, etc.).
    ConfigValidation(String),
    /// A dataset has no column mapped for a field a match type requires.
    MissingField {
        dataset: String,
        match_type: MatchType,
        field: Field,
    },
    /// More than one header maps to the same canonical field.
    AmbiguousHeader {
        dataset: String,
        field: Field,
        columns: Vec<String>,
    },
    /// CSV source could not be parsed.
    Csv(String),
    /// Worker pool could not be started.
    WorkerPool(String),
    /// Run was cancelled before every input row was processed.
    Cancelled,
    /// Broken engine invariant (e.g. a result slot never filled).
    Internal(String),
}

impl fmt::Display for MatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingField { dataset, match_type, field } => {
                write!(
                    f,
                    "dataset '{dataset}': {} matching requires a '{field}' column",
                    match_type.label()
                )
            }
            Self::AmbiguousHeader { dataset, field, columns } => {
                write!(
                    f,
                    "dataset '{dataset}': multiple columns map to '{field}': {}",
                    columns.join(", ")
                )
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
            Self::WorkerPool(msg) => write!(f, "worker pool error: {msg}"),
            Self::Cancelled => write!(f, "run cancelled"),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for MatchError {}
