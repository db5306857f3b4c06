#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-adapter-csv
//!
//! CSV document adapter.
//!
//! A CSV document is addressed as a collection of records whose columns are
//! matched by header name.
//!
//! ## Example Usage
//!
//! ```rust
//! use docmap_adapter_csv::{CsvAdapter, CsvConfig};
//! use docmap_model::{DocumentAdapter, Path, Scalar};
//!
//! let mut adapter = CsvAdapter::new("people")
//!     .with_config(CsvConfig::new().delimiter(';'))
//!     .with_input("name;age\nJohn;30\n");
//! adapter.pre_source_execution().unwrap();
//!
//! let path = Path::parse("/people<0>/age").unwrap();
//! let field = adapter.read(&path).unwrap().unwrap();
//! assert_eq!(field.value(), Some(&Scalar::from("30")));
//! ```

pub mod adapter;
pub mod config;
pub mod errors;
pub mod reader;
pub mod table;
pub mod writer;

// Re-export main types
pub use adapter::CsvAdapter;
pub use config::{CsvConfig, NullRepresentation, RecordTerminator};
pub use errors::{CsvError, CsvResult};
pub use reader::CsvReader;
pub use table::CsvTable;
pub use writer::CsvWriter;

/// Format name this adapter is registered under.
pub const FORMAT: &str = "csv";
