//! Error types for the XML adapter

use docmap_model::AdapterError;
use thiserror::Error;

/// Errors that can occur when working with XML
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    /// Input could not be tokenized
    #[error("XML parse error: {0}")]
    Parse(String),

    /// Well-formed tokens that do not make a document
    #[error("Malformed XML document: {0}")]
    Malformed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl XmlError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Convert into the adapter error reported for document `doc_id`.
    #[must_use]
    pub fn into_adapter_error(self, doc_id: &str) -> AdapterError {
        AdapterError::parse(doc_id, self.to_string())
    }
}

/// Result type alias for XML operations
pub type XmlResult<T> = std::result::Result<T, XmlError>;
