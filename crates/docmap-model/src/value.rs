//! Field types and scalar values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of field types understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Double,
    Float,
    Integer,
    Long,
    Short,
    #[default]
    String,
    ByteArray,
    Complex,
    Unsupported,
}

impl FieldType {
    /// Every field type, in declaration order.
    pub const ALL: [FieldType; 12] = [
        FieldType::Boolean,
        FieldType::Byte,
        FieldType::Char,
        FieldType::Double,
        FieldType::Float,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Short,
        FieldType::String,
        FieldType::ByteArray,
        FieldType::Complex,
        FieldType::Unsupported,
    ];

    /// Integral and floating point types.
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Self::Byte | Self::Short | Self::Integer | Self::Long | Self::Float | Self::Double
        )
    }

    /// Integral types only.
    #[must_use]
    pub fn is_integral(self) -> bool {
        matches!(self, Self::Byte | Self::Short | Self::Integer | Self::Long)
    }

    /// Types that hold a single scalar value.
    #[must_use]
    pub fn is_scalar(self) -> bool {
        !matches!(self, Self::Complex | Self::Unsupported)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Boolean => "BOOLEAN",
            Self::Byte => "BYTE",
            Self::Char => "CHAR",
            Self::Double => "DOUBLE",
            Self::Float => "FLOAT",
            Self::Integer => "INTEGER",
            Self::Long => "LONG",
            Self::Short => "SHORT",
            Self::String => "STRING",
            Self::ByteArray => "BYTE_ARRAY",
            Self::Complex => "COMPLEX",
            Self::Unsupported => "UNSUPPORTED",
        };
        f.write_str(name)
    }
}

/// A single typed value
///
/// Absence is modelled as `Option<Scalar>::None`, never as a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Boolean(bool),
    Byte(i8),
    Char(char),
    Double(f64),
    Float(f32),
    Integer(i32),
    Long(i64),
    Short(i16),
    String(String),
    ByteArray(Vec<u8>),
}

impl Scalar {
    /// The field type this value belongs to.
    #[must_use]
    pub fn field_type(&self) -> FieldType {
        match self {
            Scalar::Boolean(_) => FieldType::Boolean,
            Scalar::Byte(_) => FieldType::Byte,
            Scalar::Char(_) => FieldType::Char,
            Scalar::Double(_) => FieldType::Double,
            Scalar::Float(_) => FieldType::Float,
            Scalar::Integer(_) => FieldType::Integer,
            Scalar::Long(_) => FieldType::Long,
            Scalar::Short(_) => FieldType::Short,
            Scalar::String(_) => FieldType::String,
            Scalar::ByteArray(_) => FieldType::ByteArray,
        }
    }

    /// Render as text, the form used by text-based documents and by
    /// combine/separate.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Scalar::Boolean(b) => b.to_string(),
            Scalar::Byte(v) => v.to_string(),
            Scalar::Char(c) => c.to_string(),
            Scalar::Double(d) => d.to_string(),
            Scalar::Float(f) => f.to_string(),
            Scalar::Integer(i) => i.to_string(),
            Scalar::Long(l) => l.to_string(),
            Scalar::Short(s) => s.to_string(),
            Scalar::String(s) => s.clone(),
            Scalar::ByteArray(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Borrow the text of a string value.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::String(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::String(value)
    }
}

impl From<i32> for Scalar {
    fn from(value: i32) -> Self {
        Scalar::Integer(value)
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Long(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Boolean(value)
    }
}
