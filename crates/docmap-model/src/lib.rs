#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-model
//!
//! Path grammar, field model, and mapping document types shared by every
//! docmap crate.
//!
//! Paths address a field inside a document (`/orders/order<>/@id`), fields
//! and field groups carry values between documents, and the mapping document
//! declares which source fields feed which target fields.

/// Document adapter contract implemented by every format.
pub mod adapter;
/// Audits and validation entries.
pub mod audit;
/// Mapping document types.
pub mod document;
/// Fields, field groups, and field actions.
pub mod field;
/// Path expression grammar.
pub mod path;
/// Field types and scalar values.
pub mod value;

pub use adapter::{AdapterError, AdapterResult, DocumentAdapter};
pub use audit::{Audit, Scope, Status, ValidationEntry};
pub use document::{
    CONSTANTS_DOC_ID, Constant, DEFAULT_SOURCE_DOC_ID, DEFAULT_TARGET_DOC_ID, DataSource,
    DataSourceRole, LookupEntry, LookupTable, Mapping, MappingDocument, MappingKind, Namespace,
    PROPERTIES_DOC_ID, Property, is_reserved_doc_id,
};
pub use field::{CollectionType, Field, FieldAction, FieldGroup, FieldNode, FieldStatus};
pub use path::{MAX_INDEX, Path, PathError, PathSegment, Repetition};
pub use value::{FieldType, Scalar};
