//! Error types for the CSV adapter

use docmap_model::AdapterError;
use thiserror::Error;

/// Errors that can occur when working with CSV
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CsvError {
    /// CSV read error with context
    #[error("CSV read error at line {line}: {message}")]
    Read { line: u64, message: String },

    /// CSV write error
    #[error("CSV write error: {0}")]
    Write(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CsvError {
    /// Create a read error at a specific line
    pub fn read_at(line: u64, message: impl Into<String>) -> Self {
        Self::Read {
            line,
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a write error
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write(message.into())
    }

    /// Get the line number if available
    #[must_use]
    pub fn line_number(&self) -> Option<u64> {
        match self {
            Self::Read { line, .. } if *line > 0 => Some(*line),
            _ => None,
        }
    }

    /// Convert into the adapter error reported for document `doc_id`.
    #[must_use]
    pub fn into_adapter_error(self, doc_id: &str) -> AdapterError {
        match self {
            Self::Read { .. } | Self::Config(_) => AdapterError::parse(doc_id, self.to_string()),
            Self::Write(_) => AdapterError::serialize(doc_id, self.to_string()),
        }
    }
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        let line = e.position().map_or(0, csv::Position::line);
        Self::Read {
            line,
            message: e.to_string(),
        }
    }
}

/// Result type alias for CSV operations
pub type CsvResult<T> = std::result::Result<T, CsvError>;
