//! Error types for loading and executing mapping documents

use docmap_model::{AdapterError, PathError};
use docmap_transform::{ActionError, ConversionError};
use thiserror::Error;

/// Errors raised while loading a mapping document
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to parse mapping document: {message}{}", location(.line, .column))]
    Parse {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },

    #[error("Failed to read mapping document: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Path(#[from] PathError),
}

impl LoadError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            line: None,
            column: None,
        }
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Parse {
            message: e.to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        let positioned = e.line() > 0;
        Self::Parse {
            message: e.to_string(),
            line: positioned.then(|| e.line()),
            column: positioned.then(|| e.column()),
        }
    }
}

fn location(line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!(" (line {line}, column {column})"),
        _ => String::new(),
    }
}

/// Errors that abort a whole execution
#[derive(Error, Debug)]
pub enum EngineError {
    /// A bound document could not be opened, parsed, or serialized
    #[error("Document '{doc_id}' failed: {source}")]
    Document {
        doc_id: String,
        #[source]
        source: AdapterError,
    },

    /// A mapping references a document no adapter is bound to
    #[error("No document bound for id '{0}'")]
    UnboundDocument(String),

    /// No adapter factory is registered for a data source's format
    #[error("No adapter registered for format '{format}' (data source '{doc_id}')")]
    UnknownFormat { format: String, doc_id: String },
}

impl EngineError {
    pub fn document(doc_id: impl Into<String>, source: AdapterError) -> Self {
        Self::Document {
            doc_id: doc_id.into(),
            source,
        }
    }
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// A single field's failure, recorded as an audit rather than returned
#[derive(Error, Debug)]
pub(crate) enum FieldError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error("{0}")]
    Shape(String),
}
