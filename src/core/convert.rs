//! Type conversion registry
//!
//! Maps a destination field's declared [`ColumnType`] to the routine that
//! extracts a column value for it. The extractor is picked from the
//! destination type alone, never from what the database reports, and is
//! chosen once per query.

use super::column_type::ColumnType;
use super::error::{OrmError, Result};
use super::value::{DatabaseValue, TIMESTAMP_FORMAT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;

/// Turns a raw column value into the shape the destination field expects
pub type ColumnExtractor = fn(&DatabaseValue) -> Result<DatabaseValue>;

/// Declared type to extractor lookup
#[derive(Clone)]
pub struct ConversionRegistry {
    extractors: HashMap<ColumnType, ColumnExtractor>,
}

impl std::fmt::Debug for ConversionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.extractors.keys()).finish()
    }
}

impl ConversionRegistry {
    /// Registry without any extractor
    pub fn empty() -> Self {
        Self {
            extractors: HashMap::new(),
        }
    }

    /// Registry for text, decimal, big integer, date and timestamp fields
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry
            .register(ColumnType::Text, extract_text)
            .register(ColumnType::Decimal, extract_decimal)
            .register(ColumnType::BigInteger, extract_big_integer)
            .register(ColumnType::Date, extract_date)
            .register(ColumnType::Timestamp, extract_timestamp);
        registry
    }

    /// Add or replace the extractor for `column_type`
    pub fn register(&mut self, column_type: ColumnType, extractor: ColumnExtractor) -> &mut Self {
        self.extractors.insert(column_type, extractor);
        self
    }

    /// Whether `column_type` has an extractor
    pub fn supports(&self, column_type: ColumnType) -> bool {
        self.extractors.contains_key(&column_type)
    }

    /// Extractor for a field of `column_type` bound to `column`
    pub fn extractor(&self, column_type: ColumnType, column: &str) -> Result<ColumnExtractor> {
        self.extractors
            .get(&column_type)
            .copied()
            .ok_or_else(|| OrmError::unsupported_type(column_type.to_str(), column))
    }
}

impl Default for ConversionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

fn mismatch(expected: ColumnType, raw: &DatabaseValue) -> OrmError {
    OrmError::type_mismatch(expected.to_str(), raw.type_name())
}

/// Native string read
pub fn extract_text(raw: &DatabaseValue) -> Result<DatabaseValue> {
    match raw {
        DatabaseValue::Null => Ok(DatabaseValue::Null),
        DatabaseValue::Bytes(_) => Err(mismatch(ColumnType::Text, raw)),
        other => other
            .to_text()
            .map(DatabaseValue::Text)
            .ok_or_else(|| mismatch(ColumnType::Text, other)),
    }
}

/// Native decimal read
pub fn extract_decimal(raw: &DatabaseValue) -> Result<DatabaseValue> {
    read_decimal(raw).map(|d| d.map_or(DatabaseValue::Null, DatabaseValue::Decimal))
}

/// Integer read truncated toward zero
///
/// Integer and text sources are read at full precision; only doubles and
/// decimals pass through a decimal.
pub fn extract_big_integer(raw: &DatabaseValue) -> Result<DatabaseValue> {
    let value = match raw {
        DatabaseValue::Null => return Ok(DatabaseValue::Null),
        DatabaseValue::BigInt(v) => v.clone(),
        DatabaseValue::Long(v) => BigInt::from(*v),
        DatabaseValue::Text(s) => parse_big_integer(s)
            .ok_or_else(|| mismatch(ColumnType::BigInteger, raw))?,
        DatabaseValue::Double(_) | DatabaseValue::Decimal(_) => match read_decimal(raw)? {
            Some(decimal) => truncate_decimal(decimal),
            None => return Ok(DatabaseValue::Null),
        },
        other => return Err(mismatch(ColumnType::BigInteger, other)),
    };
    Ok(DatabaseValue::BigInt(value))
}

fn truncate_decimal(decimal: Decimal) -> BigInt {
    let mut whole = decimal.trunc();
    whole.rescale(0);
    BigInt::from(whole.mantissa())
}

/// Plain decimal notation of any length, fraction dropped
fn parse_big_integer(s: &str) -> Option<BigInt> {
    let s = s.trim();
    let (whole, fraction) = s.split_once('.').unwrap_or((s, ""));
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match whole {
        "" | "-" | "+" if !fraction.is_empty() => Some(BigInt::from(0)),
        _ => BigInt::from_str(whole).ok(),
    }
}

/// Date read, re-wrapped as a timestamp at midnight
pub fn extract_date(raw: &DatabaseValue) -> Result<DatabaseValue> {
    let date = match raw {
        DatabaseValue::Null => return Ok(DatabaseValue::Null),
        DatabaseValue::Date(d) => *d,
        DatabaseValue::Timestamp(ts) => ts.date(),
        DatabaseValue::Text(s) => parse_date(s).ok_or_else(|| mismatch(ColumnType::Date, raw))?,
        other => return Err(mismatch(ColumnType::Date, other)),
    };
    Ok(DatabaseValue::Timestamp(date.and_time(NaiveTime::MIN)))
}

/// Native timestamp read
pub fn extract_timestamp(raw: &DatabaseValue) -> Result<DatabaseValue> {
    let ts = match raw {
        DatabaseValue::Null => return Ok(DatabaseValue::Null),
        DatabaseValue::Timestamp(ts) => *ts,
        DatabaseValue::Date(d) => d.and_time(NaiveTime::MIN),
        DatabaseValue::Text(s) => {
            parse_timestamp(s).ok_or_else(|| mismatch(ColumnType::Timestamp, raw))?
        }
        DatabaseValue::Long(secs) => DateTime::from_timestamp(*secs, 0)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| mismatch(ColumnType::Timestamp, raw))?,
        other => return Err(mismatch(ColumnType::Timestamp, other)),
    };
    Ok(DatabaseValue::Timestamp(ts))
}

fn read_decimal(raw: &DatabaseValue) -> Result<Option<Decimal>> {
    match raw {
        DatabaseValue::Null => Ok(None),
        DatabaseValue::Decimal(_)
        | DatabaseValue::Long(_)
        | DatabaseValue::Double(_)
        | DatabaseValue::BigInt(_)
        | DatabaseValue::Text(_) => raw
            .as_decimal()
            .map(Some)
            .ok_or_else(|| mismatch(ColumnType::Decimal, raw)),
        other => Err(mismatch(ColumnType::Decimal, other)),
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date()))
}

fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn midnight(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    #[test]
    fn test_standard_registry_coverage() {
        let registry = ConversionRegistry::standard();
        for ty in [
            ColumnType::Text,
            ColumnType::Decimal,
            ColumnType::BigInteger,
            ColumnType::Date,
            ColumnType::Timestamp,
        ] {
            assert!(registry.supports(ty), "{ty} should be readable");
        }

        let err = registry.extractor(ColumnType::Integer, "age").err().unwrap();
        assert!(matches!(err, OrmError::UnsupportedColumnType { .. }));
    }

    #[test]
    fn test_register_custom_extractor() {
        fn extract_long(raw: &DatabaseValue) -> Result<DatabaseValue> {
            Ok(raw.as_long().map_or(DatabaseValue::Null, DatabaseValue::Long))
        }

        let mut registry = ConversionRegistry::standard();
        registry.register(ColumnType::Integer, extract_long);
        let extract = registry.extractor(ColumnType::Integer, "age").unwrap();
        assert_eq!(
            extract(&DatabaseValue::Text("41".into())).unwrap(),
            DatabaseValue::Long(41)
        );
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(
            extract_text(&DatabaseValue::Long(12)).unwrap(),
            DatabaseValue::Text("12".into())
        );
        assert_eq!(extract_text(&DatabaseValue::Null).unwrap(), DatabaseValue::Null);
        assert!(extract_text(&DatabaseValue::Bytes(vec![1])).is_err());
    }

    #[test]
    fn test_extract_decimal() {
        assert_eq!(
            extract_decimal(&DatabaseValue::Text("100.50".into())).unwrap(),
            DatabaseValue::Decimal(Decimal::from_str("100.50").unwrap())
        );
        assert_eq!(
            extract_decimal(&DatabaseValue::Double(2.5)).unwrap(),
            DatabaseValue::Decimal(Decimal::new(25, 1))
        );
        assert!(extract_decimal(&DatabaseValue::Text("abc".into())).is_err());
    }

    #[test]
    fn test_extract_big_integer_truncates() {
        assert_eq!(
            extract_big_integer(&DatabaseValue::Text("42.99".into())).unwrap(),
            DatabaseValue::BigInt(BigInt::from(42))
        );
        assert_eq!(
            extract_big_integer(&DatabaseValue::Double(-7.5)).unwrap(),
            DatabaseValue::BigInt(BigInt::from(-7))
        );
        assert_eq!(
            extract_big_integer(&DatabaseValue::Null).unwrap(),
            DatabaseValue::Null
        );
    }

    #[test]
    fn test_extract_big_integer_beyond_decimal_range() {
        let digits = format!("1{}", "0".repeat(39));
        let expected = BigInt::from_str(&digits).unwrap();

        assert_eq!(
            extract_big_integer(&DatabaseValue::Text(digits.clone())).unwrap(),
            DatabaseValue::BigInt(expected.clone())
        );
        assert_eq!(
            extract_big_integer(&DatabaseValue::Text(format!("-{}.75", digits))).unwrap(),
            DatabaseValue::BigInt(-expected)
        );
        assert_eq!(
            extract_big_integer(&DatabaseValue::Long(i64::MIN)).unwrap(),
            DatabaseValue::BigInt(BigInt::from(i64::MIN))
        );
        assert_eq!(
            extract_big_integer(&DatabaseValue::Text("-.5".into())).unwrap(),
            DatabaseValue::BigInt(BigInt::from(0))
        );
        assert!(extract_big_integer(&DatabaseValue::Text("12.x".into())).is_err());
        assert!(extract_big_integer(&DatabaseValue::Bool(true)).is_err());
    }

    #[test]
    fn test_extract_date_rewraps_at_midnight() {
        assert_eq!(
            extract_date(&DatabaseValue::Text("2024-03-15".into())).unwrap(),
            DatabaseValue::Timestamp(midnight(2024, 3, 15))
        );

        let afternoon = NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_opt(15, 30, 0))
            .unwrap();
        assert_eq!(
            extract_date(&DatabaseValue::Timestamp(afternoon)).unwrap(),
            DatabaseValue::Timestamp(midnight(2024, 3, 15))
        );
        assert_eq!(extract_date(&DatabaseValue::Null).unwrap(), DatabaseValue::Null);
    }

    #[test]
    fn test_extract_timestamp() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 15)
            .and_then(|d| d.and_hms_milli_opt(8, 1, 2, 250))
            .unwrap();
        assert_eq!(
            extract_timestamp(&DatabaseValue::Text("2024-03-15 08:01:02.250".into())).unwrap(),
            DatabaseValue::Timestamp(expected)
        );
        assert_eq!(
            extract_timestamp(&DatabaseValue::Text("2024-03-15T08:01:02.250".into())).unwrap(),
            DatabaseValue::Timestamp(expected)
        );
        assert_eq!(
            extract_timestamp(&DatabaseValue::Long(0)).unwrap(),
            DatabaseValue::Timestamp(midnight(1970, 1, 1))
        );
        assert!(extract_timestamp(&DatabaseValue::Bool(true)).is_err());
    }
}
