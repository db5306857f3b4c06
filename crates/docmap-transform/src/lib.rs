#![deny(rust_2018_idioms)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

//! # docmap-transform
//!
//! Value transforms applied between reading a source field and writing its
//! target: type conversion through [`TypeConversionRegistry`] and named field
//! actions through [`ActionRegistry`].

/// Field action pipeline.
pub mod actions;
/// Type conversion registry.
pub mod conversion;
mod numeric;

pub use actions::{ActionError, ActionHandler, ActionRegistry};
pub use conversion::{Concern, ConversionError, ConverterFn, TypeConversionRegistry};
