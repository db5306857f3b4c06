//! Type conversion registry
//!
//! Converters are keyed by `(from, to)` and carry the concerns a mapping
//! author should be told about when the pair is used. A converter is a pure
//! function; null values never reach it.

use crate::numeric::{self, Number};
use docmap_model::{FieldType, Scalar};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::trace;

/// Conversion failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    /// No converter is registered for the pair
    #[error("No converter registered from {from} to {to}")]
    Unsupported { from: FieldType, to: FieldType },

    /// The value does not fit the target type
    #[error("Value '{value}' of type {from} is out of range for {to}")]
    OutOfRange {
        value: String,
        from: FieldType,
        to: FieldType,
    },

    /// The value could not be read as the target type
    #[error("Value '{value}' cannot be read as {to}: {reason}")]
    Format {
        value: String,
        to: FieldType,
        reason: String,
    },
}

impl ConversionError {
    /// Build a format error.
    pub fn format(value: impl Into<String>, to: FieldType, reason: impl Into<String>) -> Self {
        Self::Format {
            value: value.into(),
            to,
            reason: reason.into(),
        }
    }
}

/// Result type for conversions
pub type Result<T> = std::result::Result<T, ConversionError>;

/// Risk attached to a converter pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concern {
    /// The value may not fit the target
    Range,
    /// A fractional part is dropped
    FractionalPartLoss,
    /// Time zone information is dropped
    TimezoneLoss,
    /// The source text may not be in the expected format
    FormatRisk,
    /// The result depends on a representation convention
    Convention,
}

impl fmt::Display for Concern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Concern::Range => "RANGE",
            Concern::FractionalPartLoss => "FRACTIONAL_PART",
            Concern::TimezoneLoss => "TIMEZONE",
            Concern::FormatRisk => "FORMAT",
            Concern::Convention => "CONVENTION",
        };
        f.write_str(name)
    }
}

/// Converter function signature
pub type ConverterFn = Arc<dyn Fn(&Scalar) -> Result<Scalar> + Send + Sync>;

#[derive(Clone)]
struct Converter {
    concerns: Vec<Concern>,
    convert: ConverterFn,
}

/// Registry of converters keyed by `(from, to)`
#[derive(Clone, Default)]
pub struct TypeConversionRegistry {
    converters: HashMap<(FieldType, FieldType), Converter>,
}

impl fmt::Debug for TypeConversionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeConversionRegistry")
            .field("converters", &self.converters.len())
            .finish()
    }
}

const NUMERIC: [FieldType; 6] = [
    FieldType::Byte,
    FieldType::Short,
    FieldType::Integer,
    FieldType::Long,
    FieldType::Float,
    FieldType::Double,
];

const INTEGRAL: [FieldType; 4] = [
    FieldType::Byte,
    FieldType::Short,
    FieldType::Integer,
    FieldType::Long,
];

impl TypeConversionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in converters for every scalar
    /// pair that has a sensible conversion.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register_numeric();
        registry.register_text();
        registry.register_boolean();
        registry.register_char();
        registry
    }

    /// Register (or replace) the converter for `from -> to`.
    pub fn register<F>(
        &mut self,
        from: FieldType,
        to: FieldType,
        concerns: &[Concern],
        convert: F,
    ) -> &mut Self
    where
        F: Fn(&Scalar) -> Result<Scalar> + Send + Sync + 'static,
    {
        self.converters.insert(
            (from, to),
            Converter {
                concerns: concerns.to_vec(),
                convert: Arc::new(convert),
            },
        );
        self
    }

    /// Whether `from -> to` can be converted. Identity pairs always can.
    #[must_use]
    pub fn supports(&self, from: FieldType, to: FieldType) -> bool {
        from == to || self.converters.contains_key(&(from, to))
    }

    /// Concerns declared for `from -> to`; empty for identity and unknown
    /// pairs.
    #[must_use]
    pub fn concerns(&self, from: FieldType, to: FieldType) -> &[Concern] {
        match self.converters.get(&(from, to)) {
            Some(converter) => &converter.concerns,
            None => &[],
        }
    }

    /// Convert `value` from `from` to `to`. A null value converts to null.
    ///
    /// # Errors
    ///
    /// Returns `Unsupported` when no converter is registered, or the
    /// converter's own `OutOfRange`/`Format` failure.
    pub fn convert(
        &self,
        value: Option<&Scalar>,
        from: FieldType,
        to: FieldType,
    ) -> Result<Option<Scalar>> {
        let Some(value) = value else {
            return Ok(None);
        };
        if from == to {
            return Ok(Some(value.clone()));
        }
        let converter = self
            .converters
            .get(&(from, to))
            .ok_or(ConversionError::Unsupported { from, to })?;
        trace!(%from, %to, value = %value, "Converting value");
        (converter.convert)(value).map(Some)
    }

    /// Convert a value from its own type to `to`.
    ///
    /// # Errors
    ///
    /// See [`TypeConversionRegistry::convert`].
    pub fn convert_to(&self, value: &Scalar, to: FieldType) -> Result<Scalar> {
        let from = value.field_type();
        self.convert(Some(value), from, to)
            .map(|converted| converted.unwrap_or_else(|| value.clone()))
    }

    fn register_numeric(&mut self) {
        for from in NUMERIC {
            for to in NUMERIC {
                if from == to {
                    continue;
                }
                let concerns = if !from.is_integral() && to.is_integral() {
                    vec![Concern::Range, Concern::FractionalPartLoss]
                } else if numeric::rank(to) < numeric::rank(from) {
                    vec![Concern::Range]
                } else {
                    Vec::new()
                };
                self.register(from, to, &concerns, move |value| {
                    let number = numeric::to_number(value).ok_or_else(|| {
                        ConversionError::format(value.render(), to, "not a number")
                    })?;
                    numeric::from_number(number, value, to)
                });
            }
        }
    }

    fn register_text(&mut self) {
        for to in NUMERIC {
            let concerns: &[Concern] = if to.is_integral() {
                &[Concern::FormatRisk, Concern::Range, Concern::FractionalPartLoss]
            } else {
                &[Concern::FormatRisk, Concern::Range]
            };
            self.register(FieldType::String, to, concerns, move |value| {
                let text = value.render();
                let number = numeric::parse_number(&text, to)?;
                numeric::from_number(number, value, to)
            });
            self.register(to, FieldType::String, &[], |value| {
                Ok(Scalar::String(value.render()))
            });
        }

        self.register(FieldType::Boolean, FieldType::String, &[], |value| {
            Ok(Scalar::String(value.render()))
        });
        self.register(
            FieldType::String,
            FieldType::Boolean,
            &[Concern::Convention],
            |value| parse_boolean(&value.render()).map(Scalar::Boolean),
        );

        self.register(FieldType::Char, FieldType::String, &[], |value| {
            Ok(Scalar::String(value.render()))
        });
        self.register(FieldType::String, FieldType::Char, &[Concern::Range], |value| {
            let text = value.render();
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Ok(Scalar::Char(c)),
                _ => Err(ConversionError::format(
                    text,
                    FieldType::Char,
                    "expected exactly one character",
                )),
            }
        });

        self.register(
            FieldType::ByteArray,
            FieldType::String,
            &[Concern::FormatRisk],
            |value| match value {
                Scalar::ByteArray(bytes) => {
                    String::from_utf8(bytes.clone()).map(Scalar::String).map_err(|e| {
                        ConversionError::format(value.render(), FieldType::String, e.to_string())
                    })
                }
                other => Ok(Scalar::String(other.render())),
            },
        );
        self.register(FieldType::String, FieldType::ByteArray, &[], |value| {
            Ok(Scalar::ByteArray(value.render().into_bytes()))
        });
    }

    fn register_boolean(&mut self) {
        for numeric_type in NUMERIC {
            self.register(
                FieldType::Boolean,
                numeric_type,
                &[Concern::Convention],
                move |value| from_boolean(value, numeric_type),
            );
            self.register(
                numeric_type,
                FieldType::Boolean,
                &[Concern::Convention],
                |value| {
                    let number = numeric::to_number(value).ok_or_else(|| {
                        ConversionError::format(value.render(), FieldType::Boolean, "not a number")
                    })?;
                    numeric::from_number(number, value, FieldType::Boolean)
                },
            );
        }
    }

    fn register_char(&mut self) {
        for integral in INTEGRAL {
            let to_char: &[Concern] = &[Concern::Range];
            self.register(integral, FieldType::Char, to_char, |value| {
                let number = numeric::to_number(value).ok_or_else(|| {
                    ConversionError::format(value.render(), FieldType::Char, "not a number")
                })?;
                numeric::from_number(number, value, FieldType::Char)
            });

            let narrower = numeric::rank(integral) < numeric::rank(FieldType::Integer);
            let from_char: &[Concern] = if narrower {
                &[Concern::Range]
            } else {
                &[]
            };
            self.register(FieldType::Char, integral, from_char, move |value| {
                let number = numeric::to_number(value).ok_or_else(|| {
                    ConversionError::format(value.render(), integral, "not a character")
                })?;
                numeric::from_number(number, value, integral)
            });
        }
    }
}

fn from_boolean(value: &Scalar, to: FieldType) -> Result<Scalar> {
    match value {
        Scalar::Boolean(flag) => {
            numeric::from_number(Number::Integral(i64::from(*flag)), value, to)
        }
        other => Err(ConversionError::format(other.render(), to, "not a boolean")),
    }
}

/// Read the common textual spellings of a boolean.
fn parse_boolean(text: &str) -> Result<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Ok(true),
        "false" | "f" | "no" | "n" | "0" => Ok(false),
        _ => Err(ConversionError::format(
            text,
            FieldType::Boolean,
            "not a boolean",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_null() {
        let registry = TypeConversionRegistry::with_defaults();
        let value = Scalar::from("abc");
        assert_eq!(
            registry
                .convert(Some(&value), FieldType::String, FieldType::String)
                .unwrap(),
            Some(value)
        );
        assert_eq!(
            registry
                .convert(None, FieldType::String, FieldType::Integer)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_string_to_numbers() {
        let registry = TypeConversionRegistry::with_defaults();
        let converted = registry
            .convert(Some(&Scalar::from("42")), FieldType::String, FieldType::Integer)
            .unwrap();
        assert_eq!(converted, Some(Scalar::Integer(42)));

        let converted = registry
            .convert(Some(&Scalar::from("2.5")), FieldType::String, FieldType::Double)
            .unwrap();
        assert_eq!(converted, Some(Scalar::Double(2.5)));

        let err = registry
            .convert(Some(&Scalar::from("x1")), FieldType::String, FieldType::Long)
            .unwrap_err();
        assert!(matches!(err, ConversionError::Format { .. }));
    }

    #[test]
    fn test_narrowing_reports_out_of_range() {
        let registry = TypeConversionRegistry::with_defaults();
        let err = registry
            .convert(Some(&Scalar::Long(70_000)), FieldType::Long, FieldType::Short)
            .unwrap_err();
        assert!(matches!(err, ConversionError::OutOfRange { .. }));
        assert_eq!(
            registry.concerns(FieldType::Long, FieldType::Short),
            &[Concern::Range]
        );
    }

    #[test]
    fn test_fractional_concerns() {
        let registry = TypeConversionRegistry::with_defaults();
        assert_eq!(
            registry.concerns(FieldType::Double, FieldType::Integer),
            &[Concern::Range, Concern::FractionalPartLoss]
        );
        assert!(registry.concerns(FieldType::Integer, FieldType::Long).is_empty());
        let converted = registry.convert_to(&Scalar::Double(9.99), FieldType::Integer).unwrap();
        assert_eq!(converted, Scalar::Integer(9));
    }

    #[test]
    fn test_boolean_conventions() {
        let registry = TypeConversionRegistry::with_defaults();
        assert_eq!(
            registry.convert_to(&Scalar::from("Yes"), FieldType::Boolean).unwrap(),
            Scalar::Boolean(true)
        );
        assert_eq!(
            registry.convert_to(&Scalar::Boolean(true), FieldType::Integer).unwrap(),
            Scalar::Integer(1)
        );
        assert_eq!(
            registry.convert_to(&Scalar::Integer(0), FieldType::Boolean).unwrap(),
            Scalar::Boolean(false)
        );
        assert!(registry.convert_to(&Scalar::from("maybe"), FieldType::Boolean).is_err());
    }

    #[test]
    fn test_char_conversions() {
        let registry = TypeConversionRegistry::with_defaults();
        assert_eq!(
            registry.convert_to(&Scalar::Char('A'), FieldType::Integer).unwrap(),
            Scalar::Integer(65)
        );
        assert!(matches!(
            registry.convert_to(&Scalar::Byte(-1), FieldType::Char),
            Err(ConversionError::OutOfRange { .. })
        ));
        assert!(registry.convert_to(&Scalar::from("ab"), FieldType::Char).is_err());
    }

    #[test]
    fn test_unsupported_pair() {
        let registry = TypeConversionRegistry::with_defaults();
        assert!(!registry.supports(FieldType::Complex, FieldType::String));
        let err = registry
            .convert(Some(&Scalar::from("a")), FieldType::Complex, FieldType::String)
            .unwrap_err();
        assert_eq!(
            err,
            ConversionError::Unsupported {
                from: FieldType::Complex,
                to: FieldType::String
            }
        );
    }

    #[test]
    fn test_register_custom_converter() {
        let mut registry = TypeConversionRegistry::new();
        registry.register(
            FieldType::String,
            FieldType::Integer,
            &[Concern::TimezoneLoss],
            |value| Ok(Scalar::Integer(i32::try_from(value.render().len()).unwrap_or(i32::MAX))),
        );
        assert_eq!(
            registry.convert_to(&Scalar::from("abcd"), FieldType::Integer).unwrap(),
            Scalar::Integer(4)
        );
        assert_eq!(
            registry.concerns(FieldType::String, FieldType::Integer),
            &[Concern::TimezoneLoss]
        );
    }
}
