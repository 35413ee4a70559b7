//! Conversion of raw driver scalars into a field's declared representation

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use crate::types::{KeelError, KeelResult};
use crate::value::{FieldType, Value};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Convert `raw` into `target`, passing `Null` through untouched.
///
/// Integer widening is always allowed, narrowing only when the value fits.
/// Anything printable converts to `String`; strings parse back into the
/// structured types. Other pairings fail with `KeelError::TypeConversion`.
pub fn convert(raw: Value, target: FieldType) -> KeelResult<Value> {
    if raw.is_null() || raw.field_type() == Some(target) {
        return Ok(raw);
    }

    let converted = match (&raw, target) {
        (Value::Int(v), FieldType::BigInt) => Some(Value::BigInt(i64::from(*v))),
        (Value::BigInt(v), FieldType::Int) => i32::try_from(*v).ok().map(Value::Int),
        (Value::Int(v), FieldType::Double) => Some(Value::Double(f64::from(*v))),
        (Value::BigInt(v), FieldType::Double) => Some(Value::Double(*v as f64)),
        (Value::Int(v), FieldType::Decimal) => Some(Value::Decimal(Decimal::from(*v))),
        (Value::BigInt(v), FieldType::Decimal) => Some(Value::Decimal(Decimal::from(*v))),
        (Value::Int(v), FieldType::Bool) => int_to_bool(i64::from(*v)),
        (Value::BigInt(v), FieldType::Bool) => int_to_bool(*v),
        (Value::Double(v), FieldType::Int) => integral(*v)
            .and_then(|i| i32::try_from(i).ok())
            .map(Value::Int),
        (Value::Double(v), FieldType::BigInt) => integral(*v).map(Value::BigInt),
        // Shortest round-trip text keeps 9.99 as 9.99 rather than its binary expansion
        (Value::Double(v), FieldType::Decimal) => {
            Decimal::from_str(&v.to_string()).ok().map(Value::Decimal)
        }
        (Value::Decimal(v), FieldType::Double) => v.to_f64().map(Value::Double),
        (Value::Decimal(v), FieldType::Int) => {
            decimal_integral(v).and_then(|d| d.to_i32()).map(Value::Int)
        }
        (Value::Decimal(v), FieldType::BigInt) => {
            decimal_integral(v).and_then(|d| d.to_i64()).map(Value::BigInt)
        }
        (Value::Bytes(_), FieldType::String) => None,
        (_, FieldType::String) => Some(Value::String(raw.to_string())),
        (Value::String(s), _) => parse_string(s, target),
        (Value::Bytes(b), FieldType::Uuid) => Uuid::from_slice(b).ok().map(Value::Uuid),
        (Value::Date(d), FieldType::DateTime) => Some(Value::DateTime(d.and_time(NaiveTime::MIN))),
        (Value::DateTime(dt), FieldType::Date) => Some(Value::Date(dt.date())),
        _ => None,
    };

    converted
        .ok_or_else(|| KeelError::type_conversion(raw.type_name(), target.name(), raw.to_string()))
}

fn int_to_bool(v: i64) -> Option<Value> {
    match v {
        0 => Some(Value::Bool(false)),
        1 => Some(Value::Bool(true)),
        _ => None,
    }
}

fn integral(v: f64) -> Option<i64> {
    if v.fract() == 0.0 && v >= i64::MIN as f64 && v <= i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn decimal_integral(v: &Decimal) -> Option<Decimal> {
    if v.fract().is_zero() {
        Some(*v)
    } else {
        None
    }
}

fn parse_string(s: &str, target: FieldType) -> Option<Value> {
    let trimmed = s.trim();
    match target {
        FieldType::Uuid => Uuid::parse_str(trimmed).ok().map(Value::Uuid),
        FieldType::Int => trimmed.parse::<i32>().ok().map(Value::Int),
        FieldType::BigInt => trimmed.parse::<i64>().ok().map(Value::BigInt),
        FieldType::Double => trimmed.parse::<f64>().ok().map(Value::Double),
        FieldType::Decimal => Decimal::from_str(trimmed).ok().map(Value::Decimal),
        FieldType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Some(Value::Bool(true)),
            "false" | "f" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Date => NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .or_else(|| parse_datetime(trimmed).map(|dt| dt.date()))
            .map(Value::Date),
        FieldType::DateTime => parse_datetime(trimmed)
            .or_else(|| {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                    .ok()
                    .map(|d| d.and_time(NaiveTime::MIN))
            })
            .map(Value::DateTime),
        FieldType::Bytes => Some(Value::Bytes(s.as_bytes().to_vec())),
        FieldType::String => Some(Value::String(s.to_string())),
    }
}

fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_passes_through_any_target() {
        for target in [FieldType::Int, FieldType::Uuid, FieldType::String] {
            assert_eq!(convert(Value::Null, target).unwrap(), Value::Null);
        }
    }

    #[test]
    fn integers_widen_and_narrow_when_they_fit() {
        assert_eq!(convert(Value::Int(5), FieldType::BigInt).unwrap(), Value::BigInt(5));
        assert_eq!(convert(Value::BigInt(5), FieldType::Int).unwrap(), Value::Int(5));
        assert!(convert(Value::BigInt(i64::MAX), FieldType::Int).is_err());
    }

    #[test]
    fn anything_printable_becomes_string() {
        assert_eq!(
            convert(Value::BigInt(42), FieldType::String).unwrap(),
            Value::String("42".into())
        );
        assert_eq!(
            convert(Value::Bool(true), FieldType::String).unwrap(),
            Value::String("true".into())
        );
    }

    #[test]
    fn strings_parse_into_uuid() {
        let id = Uuid::new_v4();
        assert_eq!(
            convert(Value::String(id.to_string()), FieldType::Uuid).unwrap(),
            Value::Uuid(id)
        );
    }

    #[test]
    fn malformed_uuid_is_a_conversion_error() {
        let err = convert(Value::String("not-a-uuid".into()), FieldType::Uuid).unwrap_err();
        match err {
            KeelError::TypeConversion { from, to, value } => {
                assert_eq!(from, "STRING");
                assert_eq!(to, "UUID");
                assert_eq!(value, "not-a-uuid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn doubles_become_decimals_without_binary_noise() {
        let converted = convert(Value::Double(9.99), FieldType::Decimal).unwrap();
        assert_eq!(converted, Value::Decimal(Decimal::from_str("9.99").unwrap()));
    }

    #[test]
    fn sqlite_storage_classes_map_back() {
        assert_eq!(convert(Value::BigInt(1), FieldType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(
            convert(Value::String("2024-02-29".into()), FieldType::Date).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
        let dt = convert(Value::String("2024-02-29 10:30:00".into()), FieldType::DateTime).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(dt, Value::DateTime(expected));
    }

    #[test]
    fn fractional_doubles_do_not_truncate_into_integers() {
        assert!(convert(Value::Double(1.5), FieldType::Int).is_err());
        assert_eq!(convert(Value::Double(3.0), FieldType::BigInt).unwrap(), Value::BigInt(3));
    }

    #[test]
    fn bytes_do_not_become_text() {
        assert!(convert(Value::Bytes(vec![0xff]), FieldType::String).is_err());
    }
}
