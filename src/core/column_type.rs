//! Declared column types
//!
//! Every mapped field carries a [`ColumnType`] tag derived from its Rust type
//! through [`ColumnField`]. The tag, not the database's own column type,
//! decides which extractor reads the column back.

use super::error::{OrmError, Result};
use super::value::DatabaseValue;
use chrono::{NaiveDate, NaiveDateTime};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Declared type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    /// Character data
    Text,
    /// Exact decimal
    Decimal,
    /// Arbitrary-precision integer
    BigInteger,
    /// Calendar date without time
    Date,
    /// Date and time
    Timestamp,
    /// Boolean (write-only by default)
    Boolean,
    /// Fixed-width integer (write-only by default)
    Integer,
    /// Floating point (write-only by default)
    Real,
    /// Binary data (write-only by default)
    Blob,
}

impl ColumnType {
    /// Convert column type to string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Decimal => "decimal",
            ColumnType::BigInteger => "biginteger",
            ColumnType::Date => "date",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Boolean => "boolean",
            ColumnType::Integer => "integer",
            ColumnType::Real => "real",
            ColumnType::Blob => "blob",
        }
    }

    /// Check if the standard conversion registry can read this type
    pub fn is_readable(&self) -> bool {
        matches!(
            self,
            ColumnType::Text
                | ColumnType::Decimal
                | ColumnType::BigInteger
                | ColumnType::Date
                | ColumnType::Timestamp
        )
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for ColumnType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "string" | "varchar" => Ok(ColumnType::Text),
            "decimal" | "numeric" => Ok(ColumnType::Decimal),
            "biginteger" | "bigint" => Ok(ColumnType::BigInteger),
            "date" => Ok(ColumnType::Date),
            "timestamp" | "datetime" => Ok(ColumnType::Timestamp),
            "boolean" | "bool" => Ok(ColumnType::Boolean),
            "integer" | "int" => Ok(ColumnType::Integer),
            "real" | "double" | "float" => Ok(ColumnType::Real),
            "blob" | "bytes" => Ok(ColumnType::Blob),
            _ => Err(format!("Invalid column type: '{}'", s)),
        }
    }
}

/// A Rust type that can sit behind a column binding
///
/// `to_value` returns `None` when the field is absent; absent fields are
/// left out of generated statements. `from_value` assigns an already
/// converted column value.
pub trait ColumnField: Sized {
    /// Declared type tag used to select an extractor
    const COLUMN_TYPE: ColumnType;

    /// Read the field as a bound value, `None` when absent
    fn to_value(&self) -> Option<DatabaseValue>;

    /// Build the field from a converted column value
    fn from_value(value: DatabaseValue) -> Result<Self>;
}

fn mismatch(expected: ColumnType, value: &DatabaseValue) -> OrmError {
    OrmError::type_mismatch(expected.to_str(), value.type_name())
}

impl ColumnField for String {
    const COLUMN_TYPE: ColumnType = ColumnType::Text;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Text(self.clone()))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Text(s) => Ok(s),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for Decimal {
    const COLUMN_TYPE: ColumnType = ColumnType::Decimal;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Decimal(*self))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Decimal(d) => Ok(d),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for BigInt {
    const COLUMN_TYPE: ColumnType = ColumnType::BigInteger;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::BigInt(self.clone()))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::BigInt(v) => Ok(v),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for NaiveDate {
    const COLUMN_TYPE: ColumnType = ColumnType::Date;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Date(*self))
    }

    // Date columns are read back as a timestamp at midnight.
    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Date(d) => Ok(d),
            DatabaseValue::Timestamp(ts) => Ok(ts.date()),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for NaiveDateTime {
    const COLUMN_TYPE: ColumnType = ColumnType::Timestamp;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Timestamp(*self))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Timestamp(ts) => Ok(ts),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for bool {
    const COLUMN_TYPE: ColumnType = ColumnType::Boolean;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Bool(*self))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Bool(v) => Ok(v),
            DatabaseValue::Long(v) => Ok(v != 0),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for i64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Integer;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Long(*self))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        value
            .as_long()
            .ok_or_else(|| mismatch(Self::COLUMN_TYPE, &value))
    }
}

impl ColumnField for i32 {
    const COLUMN_TYPE: ColumnType = ColumnType::Integer;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Long(*self as i64))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        value
            .as_long()
            .and_then(|v| i32::try_from(v).ok())
            .ok_or_else(|| mismatch(Self::COLUMN_TYPE, &value))
    }
}

impl ColumnField for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Real;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Double(*self))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Double(v) => Ok(v),
            DatabaseValue::Long(v) => Ok(v as f64),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl ColumnField for Vec<u8> {
    const COLUMN_TYPE: ColumnType = ColumnType::Blob;

    fn to_value(&self) -> Option<DatabaseValue> {
        Some(DatabaseValue::Bytes(self.clone()))
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        match value {
            DatabaseValue::Bytes(v) => Ok(v),
            other => Err(mismatch(Self::COLUMN_TYPE, &other)),
        }
    }
}

impl<T: ColumnField> ColumnField for Option<T> {
    const COLUMN_TYPE: ColumnType = T::COLUMN_TYPE;

    fn to_value(&self) -> Option<DatabaseValue> {
        self.as_ref().and_then(T::to_value)
    }

    fn from_value(value: DatabaseValue) -> Result<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}
