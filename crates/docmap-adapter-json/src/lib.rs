#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-adapter-json
//!
//! JSON document adapter backed by `serde_json::Value`.
//!
//! ## Example Usage
//!
//! ```rust
//! use docmap_adapter_json::JsonAdapter;
//! use docmap_model::{DocumentAdapter, Path, Scalar};
//!
//! let mut adapter = JsonAdapter::new("in").with_input(r#"{"orders": [{"id": 1}, {"id": 2}]}"#);
//! adapter.pre_source_execution().unwrap();
//!
//! let second = adapter.read(&Path::parse("/orders<1>/id").unwrap()).unwrap().unwrap();
//! assert_eq!(second.value(), Some(&Scalar::Long(2)));
//! ```

pub mod adapter;
pub mod config;
pub mod errors;

pub use adapter::JsonAdapter;
pub use config::JsonConfig;
pub use errors::{JsonError, JsonResult};

/// Format name this adapter is registered under.
pub const FORMAT: &str = "json";
