//! Scalar value model shared by the query builder, the driver seam and entity fields
//!
//! `Value` is what travels to and from the database; `FieldType` is the declared
//! representation of an entity field; `ColumnValue` ties a Rust field type to both.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::coercion::convert;
use crate::types::{KeelError, KeelResult};

/// A single scalar as bound to a statement or read from a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Uuid(Uuid),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The field type this value naturally carries, `None` for `Null`
    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldType::Bool),
            Value::Int(_) => Some(FieldType::Int),
            Value::BigInt(_) => Some(FieldType::BigInt),
            Value::Double(_) => Some(FieldType::Double),
            Value::Decimal(_) => Some(FieldType::Decimal),
            Value::String(_) => Some(FieldType::String),
            Value::Uuid(_) => Some(FieldType::Uuid),
            Value::Date(_) => Some(FieldType::Date),
            Value::DateTime(_) => Some(FieldType::DateTime),
            Value::Bytes(_) => Some(FieldType::Bytes),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.field_type().map(FieldType::name).unwrap_or("NULL")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::String(v) => write!(f, "{}", v),
            Value::Uuid(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v),
            Value::DateTime(v) => write!(f, "{}", v),
            Value::Bytes(v) => {
                write!(f, "0x")?;
                for byte in v {
                    write!(f, "{:02x}", byte)?;
                }
                Ok(())
            }
        }
    }
}

/// Declared representation of an entity field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    BigInt,
    Double,
    Decimal,
    String,
    Uuid,
    Date,
    DateTime,
    Bytes,
}

impl FieldType {
    pub fn name(self) -> &'static str {
        match self {
            FieldType::Bool => "BOOL",
            FieldType::Int => "INT32",
            FieldType::BigInt => "INT64",
            FieldType::Double => "DOUBLE",
            FieldType::Decimal => "DECIMAL",
            FieldType::String => "STRING",
            FieldType::Uuid => "UUID",
            FieldType::Date => "DATE",
            FieldType::DateTime => "DATETIME",
            FieldType::Bytes => "BYTES",
        }
    }

    /// Map a catalog SQL type name to the field type a generated descriptor declares.
    ///
    /// Type parameters (`VARCHAR(255)`, `NUMERIC(10,2)`) are ignored and unknown
    /// types fall back to `String`.
    pub fn from_sql_type(sql_type: &str) -> Self {
        let base = sql_type
            .split('(')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_uppercase();
        match base.as_str() {
            "INTEGER" | "SERIAL" | "INT" | "INT4" => FieldType::Int,
            "BIGINT" | "BIGSERIAL" | "INT8" => FieldType::BigInt,
            "VARCHAR" | "TEXT" => FieldType::String,
            "DATE" => FieldType::Date,
            "TIMESTAMP" => FieldType::DateTime,
            "BOOLEAN" => FieldType::Bool,
            "DECIMAL" | "NUMERIC" => FieldType::Decimal,
            "DOUBLE" | "FLOAT" | "REAL" => FieldType::Double,
            "UUID" => FieldType::Uuid,
            _ => FieldType::String,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "BOOL" => Ok(FieldType::Bool),
            "INT32" => Ok(FieldType::Int),
            "INT64" => Ok(FieldType::BigInt),
            "DOUBLE" => Ok(FieldType::Double),
            "DECIMAL" => Ok(FieldType::Decimal),
            "STRING" => Ok(FieldType::String),
            "UUID" => Ok(FieldType::Uuid),
            "DATE" => Ok(FieldType::Date),
            "DATETIME" => Ok(FieldType::DateTime),
            "BYTES" => Ok(FieldType::Bytes),
            other => Err(format!("unknown field type '{}'", other)),
        }
    }
}

/// A Rust type that can sit in an entity column.
///
/// `Option<T>` maps `None` to `Value::Null`; a bare `T` rejects `Null` with a
/// type conversion error.
pub trait ColumnValue: Sized + Send + Sync + 'static {
    const FIELD_TYPE: FieldType;

    /// Whether the field can hold `Value::Null`
    const NULLABLE: bool = false;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> KeelResult<Self>;
}

fn unexpected(value: Value, to: FieldType) -> KeelError {
    KeelError::type_conversion(value.type_name(), to.name(), value.to_string())
}

macro_rules! column_value {
    ($ty:ty, $field_type:ident, $variant:ident) => {
        impl ColumnValue for $ty {
            const FIELD_TYPE: FieldType = FieldType::$field_type;

            fn to_value(&self) -> Value {
                Value::$variant(self.clone())
            }

            fn from_value(value: Value) -> KeelResult<Self> {
                match convert(value, FieldType::$field_type)? {
                    Value::$variant(v) => Ok(v),
                    other => Err(unexpected(other, FieldType::$field_type)),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

column_value!(bool, Bool, Bool);
column_value!(i32, Int, Int);
column_value!(i64, BigInt, BigInt);
column_value!(f64, Double, Double);
column_value!(Decimal, Decimal, Decimal);
column_value!(String, String, String);
column_value!(Uuid, Uuid, Uuid);
column_value!(NaiveDate, Date, Date);
column_value!(NaiveDateTime, DateTime, DateTime);
column_value!(Vec<u8>, Bytes, Bytes);

impl<T: ColumnValue> ColumnValue for Option<T> {
    const FIELD_TYPE: FieldType = T::FIELD_TYPE;
    const NULLABLE: bool = true;

    fn to_value(&self) -> Value {
        match self {
            Some(v) => v.to_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> KeelResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
