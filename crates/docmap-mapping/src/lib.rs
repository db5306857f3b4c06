#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-mapping
//!
//! Mapping document loader, execution session, and engine.
//!
//! A [`MappingDocument`](docmap_model::MappingDocument) is loaded with
//! [`MappingDsl`], its documents are bound to a [`MappingSession`] (directly
//! or through an [`AdapterRegistry`]), and [`MappingEngine::execute`] walks
//! the mappings, recording per-field problems as audits on the session.
//!
//! ## Example Usage
//!
//! ```rust
//! use docmap_mapping::{AdapterRegistry, MappingDsl, MappingEngine, MappingSession};
//! use std::collections::BTreeMap;
//!
//! let yaml = r#"
//! name: greeting
//! dataSources:
//!   - { id: in, role: SOURCE, format: xml }
//!   - { id: out, role: TARGET, format: json }
//! mappings:
//!   - kind: MAP
//!     inputs: [{ docId: in, path: /person/@name, actions: [uppercase] }]
//!     outputs: [{ docId: out, path: /name }]
//! "#;
//! let report = MappingDsl::new().parse_yaml(yaml).unwrap();
//!
//! let mut session = MappingSession::new();
//! let contents = BTreeMap::from([("in".to_string(), r#"<person name="ada"/>"#.to_string())]);
//! AdapterRegistry::with_defaults()
//!     .bind_all(&report.document, &mut session, contents)
//!     .unwrap();
//!
//! MappingEngine::new().execute(&report.document, &mut session).unwrap();
//! assert_eq!(session.output("out"), Some(r#"{"name":"ADA"}"#));
//! ```

pub mod dsl;
pub mod engine;
pub mod error;
pub mod properties;
pub mod registry;
pub mod session;

pub use dsl::{LoadReport, MappingDsl};
pub use engine::{EngineConfig, MappingEngine};
pub use error::{EngineError, LoadError, Result};
pub use properties::PropertiesAdapter;
pub use registry::{AdapterFactory, AdapterRegistry};
pub use session::{ExecutionPhase, MappingContext, MappingSession};
