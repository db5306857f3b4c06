//! Document adapter contract
//!
//! Every format plugs into the engine through [`DocumentAdapter`]. Reads of
//! absent structure resolve to `Ok(None)`; writes create whatever intermediate
//! structure the path needs.

use crate::field::FieldNode;
use crate::path::{MAX_INDEX, Path};
use thiserror::Error;

/// Errors raised by document adapters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Intermediate segment absent; the engine treats this as a skip
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Write target is structurally incompatible
    #[error("Cannot write to {path}: {reason}")]
    Unwritable { path: String, reason: String },

    /// Addressing form the format does not support
    #[error("Unsupported path {path}: {reason}")]
    Unsupported { path: String, reason: String },

    /// Bound document could not be parsed
    #[error("Failed to parse document '{doc_id}': {message}")]
    Parse { doc_id: String, message: String },

    /// Document could not be serialized
    #[error("Failed to serialize document '{doc_id}': {message}")]
    Serialize { doc_id: String, message: String },

    /// I/O failure opening or flushing the document
    #[error("IO error: {0}")]
    Io(String),
}

impl AdapterError {
    /// Build a not-found error.
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.format(),
        }
    }

    /// Build an unwritable error.
    pub fn unwritable(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unwritable {
            path: path.format(),
            reason: reason.into(),
        }
    }

    /// Check that `index` can be materialized by a write to `path`.
    ///
    /// # Errors
    ///
    /// Returns `Unwritable` when `index` is not below [`MAX_INDEX`].
    pub fn check_index(path: &Path, index: u32) -> Result<usize, Self> {
        if index >= MAX_INDEX {
            return Err(Self::unwritable(
                path,
                format!("index {index} must be below {MAX_INDEX}"),
            ));
        }
        Ok(index as usize)
    }

    /// Build an unsupported-path error.
    pub fn unsupported(path: &Path, reason: impl Into<String>) -> Self {
        Self::Unsupported {
            path: path.format(),
            reason: reason.into(),
        }
    }

    /// Build a parse error.
    pub fn parse(doc_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            doc_id: doc_id.into(),
            message: message.into(),
        }
    }

    /// Build a serialization error.
    pub fn serialize(doc_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Serialize {
            doc_id: doc_id.into(),
            message: message.into(),
        }
    }

    /// Whether the failure concerns the whole document rather than one field.
    #[must_use]
    pub fn is_document_level(&self) -> bool {
        matches!(self, Self::Parse { .. } | Self::Serialize { .. } | Self::Io(_))
    }
}

/// Adapter result type.
pub type AdapterResult<T> = std::result::Result<T, AdapterError>;

/// A concrete document bound to a document id
///
/// The lifecycle hooks mirror the engine's execution phases so that an
/// adapter can materialize its tree before any read and serialize it after
/// the last write.
pub trait DocumentAdapter: Send {
    /// Document id this adapter is bound to.
    fn doc_id(&self) -> &str;

    /// Resolve `path` to a field or group; `Ok(None)` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error when the path uses a form the format cannot address.
    fn read(&self, path: &Path) -> AdapterResult<Option<FieldNode>>;

    /// Write `value` at `path`, creating missing structure.
    ///
    /// # Errors
    ///
    /// Returns an error when the path cannot hold the value.
    fn write(&mut self, path: &Path, value: &FieldNode) -> AdapterResult<()>;

    /// Number of elements in the collection addressed by `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the path uses a form the format cannot address.
    fn collection_size(&self, path: &Path) -> AdapterResult<u32>;

    /// Called before any source read.
    ///
    /// # Errors
    ///
    /// A failure here is fatal for the whole execution.
    fn pre_source_execution(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    /// Called before any target write.
    ///
    /// # Errors
    ///
    /// A failure here is fatal for the whole execution.
    fn pre_target_execution(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    /// Called after the last source read.
    ///
    /// # Errors
    ///
    /// A failure here is fatal for the whole execution.
    fn post_source_execution(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    /// Called after the last target write.
    ///
    /// # Errors
    ///
    /// A failure here is fatal for the whole execution.
    fn post_target_execution(&mut self) -> AdapterResult<()> {
        Ok(())
    }

    /// Serialized document produced by `post_target_execution`, if any.
    fn output(&self) -> Option<&str> {
        None
    }
}
