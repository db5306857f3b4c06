#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-adapter-xml
//!
//! XML document adapter.
//!
//! Documents are parsed into an owned element tree where every element and
//! attribute carries the namespace URI its prefix resolved to. Path segments
//! are matched against that tree; writes create missing structure.
//!
//! ## Example Usage
//!
//! ```rust
//! use docmap_adapter_xml::XmlAdapter;
//! use docmap_model::{DocumentAdapter, Field, Path};
//!
//! let mut adapter = XmlAdapter::new("out");
//! let path = Path::parse("/orders/order/id/@custId").unwrap();
//! adapter.write(&path, &Field::new("out", path.clone()).with_value("b").into()).unwrap();
//! adapter.post_target_execution().unwrap();
//!
//! assert_eq!(
//!     adapter.output(),
//!     Some(r#"<orders><order><id custId="b"/></order></orders>"#)
//! );
//! ```

pub mod adapter;
pub mod config;
pub mod errors;
pub mod parser;
pub mod tree;
pub mod writer;

pub use adapter::XmlAdapter;
pub use config::XmlConfig;
pub use errors::{XmlError, XmlResult};
pub use parser::parse_document;
pub use tree::{NamespaceDeclaration, XmlAttribute, XmlElement, XmlNode};
pub use writer::write_document;

/// Format name this adapter is registered under.
pub const FORMAT: &str = "xml";
