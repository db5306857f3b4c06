//! Error types for the JSON adapter

use docmap_model::AdapterError;
use thiserror::Error;

/// Errors that can occur when working with JSON
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JsonError {
    #[error("JSON parse error at line {line}, column {column}: {message}")]
    Parse {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("JSON write error: {0}")]
    Write(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl JsonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Convert into the adapter error reported for document `doc_id`.
    #[must_use]
    pub fn into_adapter_error(self, doc_id: &str) -> AdapterError {
        match self {
            Self::Parse { .. } | Self::Config(_) => AdapterError::parse(doc_id, self.to_string()),
            Self::Write(_) => AdapterError::serialize(doc_id, self.to_string()),
        }
    }
}

impl From<serde_json::Error> for JsonError {
    fn from(e: serde_json::Error) -> Self {
        if e.is_io() {
            return Self::Write(e.to_string());
        }
        Self::Parse {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        }
    }
}

/// Result type alias for JSON operations
pub type JsonResult<T> = std::result::Result<T, JsonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_serde_error_keeps_position() {
        let err: JsonError = serde_json::from_str::<serde_json::Value>("{\n  \"a\": }")
            .unwrap_err()
            .into();
        assert!(matches!(err, JsonError::Parse { line: 2, .. }));
        assert!(matches!(
            err.into_adapter_error("in"),
            AdapterError::Parse { .. }
        ));
    }
}
