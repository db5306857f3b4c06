use crate::conversion::ConversionError;
use docmap_model::{FieldType, Scalar};

/// Intermediate form shared by every numeric converter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Integral(i64),
    Fractional(f64),
}

/// Widening order of the numeric types.
pub(crate) fn rank(field_type: FieldType) -> u8 {
    match field_type {
        FieldType::Byte => 1,
        FieldType::Short => 2,
        FieldType::Integer => 3,
        FieldType::Long => 4,
        FieldType::Float => 5,
        FieldType::Double => 6,
        _ => 0,
    }
}

pub(crate) fn to_number(value: &Scalar) -> Option<Number> {
    match value {
        Scalar::Byte(v) => Some(Number::Integral(i64::from(*v))),
        Scalar::Short(v) => Some(Number::Integral(i64::from(*v))),
        Scalar::Integer(v) => Some(Number::Integral(i64::from(*v))),
        Scalar::Long(v) => Some(Number::Integral(*v)),
        Scalar::Float(v) => Some(Number::Fractional(f64::from(*v))),
        Scalar::Double(v) => Some(Number::Fractional(*v)),
        Scalar::Char(c) => Some(Number::Integral(i64::from(u32::from(*c)))),
        Scalar::Boolean(b) => Some(Number::Integral(i64::from(*b))),
        Scalar::String(_) | Scalar::ByteArray(_) => None,
    }
}

/// Parse text as a number, preferring the integral reading.
pub(crate) fn parse_number(text: &str, target: FieldType) -> Result<Number, ConversionError> {
    let trimmed = text.trim();
    if let Ok(integral) = trimmed.parse::<i64>() {
        return Ok(Number::Integral(integral));
    }
    trimmed
        .parse::<f64>()
        .map(Number::Fractional)
        .map_err(|_| ConversionError::format(text, target, "not a number"))
}

fn out_of_range(value: &Scalar, target: FieldType) -> ConversionError {
    ConversionError::OutOfRange {
        value: value.render(),
        from: value.field_type(),
        to: target,
    }
}

/// Truncate a fractional value to an integral one, rejecting values no `i64`
/// can hold.
fn truncate(value: f64, original: &Scalar, target: FieldType) -> Result<i64, ConversionError> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound
    #[allow(clippy::cast_precision_loss)]
    let (min, max) = (i64::MIN as f64, i64::MAX as f64);
    let truncated = value.trunc();
    if !truncated.is_finite() || truncated < min || truncated >= max {
        return Err(out_of_range(original, target));
    }
    #[allow(clippy::cast_possible_truncation)]
    Ok(truncated as i64)
}

/// Produce a scalar of `target` type from `number`, checking the target's
/// representable range.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(crate) fn from_number(
    number: Number,
    original: &Scalar,
    target: FieldType,
) -> Result<Scalar, ConversionError> {
    let integral = |n: Number| match n {
        Number::Integral(i) => Ok(i),
        Number::Fractional(f) => truncate(f, original, target),
    };
    match target {
        FieldType::Byte => i8::try_from(integral(number)?)
            .map(Scalar::Byte)
            .map_err(|_| out_of_range(original, target)),
        FieldType::Short => i16::try_from(integral(number)?)
            .map(Scalar::Short)
            .map_err(|_| out_of_range(original, target)),
        FieldType::Integer => i32::try_from(integral(number)?)
            .map(Scalar::Integer)
            .map_err(|_| out_of_range(original, target)),
        FieldType::Long => integral(number).map(Scalar::Long),
        FieldType::Float => match number {
            Number::Integral(i) => Ok(Scalar::Float(i as f32)),
            Number::Fractional(f) if f.is_finite() && f.abs() > f64::from(f32::MAX) => {
                Err(out_of_range(original, target))
            }
            Number::Fractional(f) => Ok(Scalar::Float(f as f32)),
        },
        FieldType::Double => match number {
            Number::Integral(i) => Ok(Scalar::Double(i as f64)),
            Number::Fractional(f) => Ok(Scalar::Double(f)),
        },
        FieldType::Char => {
            let code = match number {
                Number::Integral(i) => i,
                Number::Fractional(_) => return Err(out_of_range(original, target)),
            };
            u32::try_from(code)
                .ok()
                .and_then(char::from_u32)
                .map(Scalar::Char)
                .ok_or_else(|| out_of_range(original, target))
        }
        FieldType::Boolean => Ok(Scalar::Boolean(match number {
            Number::Integral(i) => i != 0,
            Number::Fractional(f) => f != 0.0,
        })),
        other => Err(ConversionError::Unsupported {
            from: original.field_type(),
            to: other,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrowing_checks_range() {
        let value = Scalar::Integer(300);
        let result = from_number(to_number(&value).unwrap(), &value, FieldType::Byte);
        assert!(matches!(result, Err(ConversionError::OutOfRange { .. })));

        let value = Scalar::Integer(100);
        let result = from_number(to_number(&value).unwrap(), &value, FieldType::Byte);
        assert_eq!(result.unwrap(), Scalar::Byte(100));
    }

    #[test]
    fn test_fraction_truncates() {
        let value = Scalar::Double(-3.9);
        let result = from_number(to_number(&value).unwrap(), &value, FieldType::Integer);
        assert_eq!(result.unwrap(), Scalar::Integer(-3));

        let value = Scalar::Double(f64::NAN);
        let result = from_number(to_number(&value).unwrap(), &value, FieldType::Long);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(
            parse_number(" 42 ", FieldType::Integer).unwrap(),
            Number::Integral(42)
        );
        assert_eq!(
            parse_number("4.5", FieldType::Double).unwrap(),
            Number::Fractional(4.5)
        );
        assert!(parse_number("abc", FieldType::Integer).is_err());
    }

    #[test]
    fn test_rank_orders_widening() {
        assert!(rank(FieldType::Byte) < rank(FieldType::Short));
        assert!(rank(FieldType::Long) < rank(FieldType::Float));
        assert_eq!(rank(FieldType::String), 0);
    }
}
