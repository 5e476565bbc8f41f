//! Database value types
//!
//! This module defines the values bound to statement placeholders and read
//! back out of result columns.

use chrono::{NaiveDate, NaiveDateTime};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Text layout used when a date is bound as text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Text layout used when a timestamp is bound as text
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Database value that can hold different types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatabaseValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 64-bit integer
    Long(i64),
    /// 64-bit floating point
    Double(f64),
    /// String value
    Text(String),
    /// Binary data
    Bytes(Vec<u8>),
    /// Exact decimal
    Decimal(Decimal),
    /// Arbitrary-precision integer
    BigInt(BigInt),
    /// Calendar date without time
    Date(NaiveDate),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
}

impl DatabaseValue {
    /// Get the value as a string slice (zero-copy for Text values)
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DatabaseValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Get the value as an i64
    pub fn as_long(&self) -> Option<i64> {
        match self {
            DatabaseValue::Long(v) => Some(*v),
            DatabaseValue::Bool(v) => Some(*v as i64),
            DatabaseValue::BigInt(v) => i64::try_from(v).ok(),
            DatabaseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Get the value as a decimal
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            DatabaseValue::Decimal(v) => Some(*v),
            DatabaseValue::Long(v) => Some(Decimal::from(*v)),
            DatabaseValue::Double(v) => Decimal::try_from(*v).ok(),
            DatabaseValue::BigInt(v) => v.to_string().parse().ok(),
            DatabaseValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Render the value as text, if it has a textual form
    pub fn to_text(&self) -> Option<String> {
        match self {
            DatabaseValue::Text(s) => Some(s.clone()),
            DatabaseValue::Bool(v) => Some(v.to_string()),
            DatabaseValue::Long(v) => Some(v.to_string()),
            DatabaseValue::Double(v) => Some(v.to_string()),
            DatabaseValue::Decimal(v) => Some(v.to_string()),
            DatabaseValue::BigInt(v) => Some(v.to_string()),
            DatabaseValue::Date(v) => Some(v.format(DATE_FORMAT).to_string()),
            DatabaseValue::Timestamp(v) => Some(v.format(TIMESTAMP_FORMAT).to_string()),
            DatabaseValue::Null | DatabaseValue::Bytes(_) => None,
        }
    }

    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DatabaseValue::Null)
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            DatabaseValue::Null => "null",
            DatabaseValue::Bool(_) => "bool",
            DatabaseValue::Long(_) => "long",
            DatabaseValue::Double(_) => "double",
            DatabaseValue::Text(_) => "text",
            DatabaseValue::Bytes(_) => "bytes",
            DatabaseValue::Decimal(_) => "decimal",
            DatabaseValue::BigInt(_) => "bigint",
            DatabaseValue::Date(_) => "date",
            DatabaseValue::Timestamp(_) => "timestamp",
        }
    }
}

impl From<bool> for DatabaseValue {
    fn from(v: bool) -> Self {
        DatabaseValue::Bool(v)
    }
}

impl From<i32> for DatabaseValue {
    fn from(v: i32) -> Self {
        DatabaseValue::Long(v as i64)
    }
}

impl From<i64> for DatabaseValue {
    fn from(v: i64) -> Self {
        DatabaseValue::Long(v)
    }
}

impl From<f64> for DatabaseValue {
    fn from(v: f64) -> Self {
        DatabaseValue::Double(v)
    }
}

impl From<String> for DatabaseValue {
    fn from(v: String) -> Self {
        DatabaseValue::Text(v)
    }
}

impl From<&str> for DatabaseValue {
    fn from(v: &str) -> Self {
        DatabaseValue::Text(v.to_string())
    }
}

impl From<Vec<u8>> for DatabaseValue {
    fn from(v: Vec<u8>) -> Self {
        DatabaseValue::Bytes(v)
    }
}

impl From<Decimal> for DatabaseValue {
    fn from(v: Decimal) -> Self {
        DatabaseValue::Decimal(v)
    }
}

impl From<BigInt> for DatabaseValue {
    fn from(v: BigInt) -> Self {
        DatabaseValue::BigInt(v)
    }
}

impl From<NaiveDate> for DatabaseValue {
    fn from(v: NaiveDate) -> Self {
        DatabaseValue::Date(v)
    }
}

impl From<NaiveDateTime> for DatabaseValue {
    fn from(v: NaiveDateTime) -> Self {
        DatabaseValue::Timestamp(v)
    }
}

impl<T: Into<DatabaseValue>> From<Option<T>> for DatabaseValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => DatabaseValue::Null,
        }
    }
}
