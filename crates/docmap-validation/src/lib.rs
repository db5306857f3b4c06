#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-validation
//!
//! Pre-execution validation of mapping documents.
//!
//! Validators inspect the mapping document only; bound documents are never
//! opened. Findings are collected as [`docmap_model::ValidationEntry`]
//! values and never abort anything by themselves.
//!
//! ## Example Usage
//!
//! ```rust
//! use docmap_model::{LookupEntry, LookupTable, MappingDocument};
//! use docmap_validation::ValidationEngine;
//!
//! let document = MappingDocument::new("example")
//!     .with_lookup_table(LookupTable::new("qwerty").with_entry(LookupEntry::new("a", "b")))
//!     .with_lookup_table(LookupTable::new("qwerty").with_entry(LookupEntry::new("c", "d")));
//!
//! let result = ValidationEngine::new().validate(&document);
//! assert_eq!(result.error_count(), 1);
//! ```

pub mod engine;
pub mod formats;
pub mod reporter;
pub mod rules;

// Re-export main types
pub use engine::{
    Construct, ConstructKind, StrictnessLevel, ValidationConfig, ValidationContext,
    ValidationEngine, ValidationResult, Validator,
};
pub use formats::{CsvDataSourceValidator, XmlDataSourceValidator};
pub use reporter::ValidationReporter;
pub use rules::{
    DataSourceValidator, FieldValidator, LookupTableValidator, MAX_ID_LENGTH, MAX_INDEX,
    MappingValidator, NamedValueValidator, validate_id_length,
};

/// Convenience function to validate a mapping document with default settings
#[must_use]
pub fn validate(document: &docmap_model::MappingDocument) -> ValidationResult {
    ValidationEngine::new().validate(document)
}
