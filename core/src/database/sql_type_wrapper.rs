use std::{fmt, str::FromStr};

use bytes::BytesMut;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type as PgType};

/// A single bound parameter value.
///
/// `Null` doubles as the no-op sentinel for conditionally-set columns: bound into
/// a `COALESCE(?, col)` slot it leaves the stored value untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    I16(i16),
    I32(i32),
    I64(i64),
    Decimal(Decimal),
    String(String),
    Bytes(Vec<u8>),
    DateTime(DateTime<Utc>),
    Json(Value),
}

impl SqlValue {
    pub fn raw_name(&self) -> &'static str {
        match self {
            SqlValue::Null => "Null",
            SqlValue::Bool(_) => "Bool",
            SqlValue::I16(_) => "I16",
            SqlValue::I32(_) => "I32",
            SqlValue::I64(_) => "I64",
            SqlValue::Decimal(_) => "Decimal",
            SqlValue::String(_) => "String",
            SqlValue::Bytes(_) => "Bytes",
            SqlValue::DateTime(_) => "DateTime",
            SqlValue::Json(_) => "Json",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Maps a JSON value onto the closest parameter type. Integers become `I64`,
    /// other numbers `Decimal`, arrays and objects are kept as `Json`.
    pub fn from_json(value: &Value) -> SqlValue {
        match value {
            Value::Null => SqlValue::Null,
            Value::Bool(b) => SqlValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::I64(i)
                } else {
                    match Decimal::from_str(&n.to_string()) {
                        Ok(d) => SqlValue::Decimal(d),
                        // out of Decimal range (e.g. huge u64 or exponent form)
                        Err(_) => SqlValue::Json(value.clone()),
                    }
                }
            }
            Value::String(s) => SqlValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => SqlValue::Json(value.clone()),
        }
    }

    fn write_integer(
        value: i64,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::INT2 {
            i16::try_from(value)?.to_sql_checked(ty, out)
        } else if *ty == PgType::INT4 {
            i32::try_from(value)?.to_sql_checked(ty, out)
        } else if *ty == PgType::NUMERIC {
            Decimal::from(value).to_sql_checked(ty, out)
        } else {
            value.to_sql_checked(ty, out)
        }
    }

    /// Text from a batch file is parsed into the column type; anything else must be a
    /// text column.
    fn write_text(
        value: &str,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::INT2 || *ty == PgType::INT4 || *ty == PgType::INT8 {
            Self::write_integer(value.trim().parse::<i64>()?, ty, out)
        } else if *ty == PgType::NUMERIC {
            Decimal::from_str(value.trim())?.to_sql_checked(ty, out)
        } else if *ty == PgType::TIMESTAMPTZ || *ty == PgType::TIMESTAMP {
            Self::write_timestamp(parse_timestamp(value.trim())?, ty, out)
        } else if *ty == PgType::BOOL {
            value.trim().parse::<bool>()?.to_sql_checked(ty, out)
        } else {
            <&str as ToSql>::to_sql_checked(&value, ty, out)
        }
    }

    fn write_timestamp(
        value: DateTime<Utc>,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        if *ty == PgType::TIMESTAMP {
            value.naive_utc().to_sql_checked(ty, out)
        } else {
            value.to_sql_checked(ty, out)
        }
    }
}

/// RFC 3339, or `YYYY-MM-DD HH:MM:SS[.fff]` read as UTC.
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(parsed) => Ok(parsed.with_timezone(&Utc)),
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive)),
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::I32(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::I64(value)
    }
}

impl From<Decimal> for SqlValue {
    fn from(value: Decimal) -> Self {
        SqlValue::Decimal(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::DateTime(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

impl ToSql for SqlValue {
    fn to_sql(
        &self,
        ty: &PgType,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            SqlValue::Null => Ok(IsNull::Yes),
            SqlValue::Bool(value) => value.to_sql_checked(ty, out),
            SqlValue::I16(value) => Self::write_integer(i64::from(*value), ty, out),
            SqlValue::I32(value) => Self::write_integer(i64::from(*value), ty, out),
            SqlValue::I64(value) => Self::write_integer(*value, ty, out),
            SqlValue::Decimal(value) => value.to_sql_checked(ty, out),
            SqlValue::String(value) => Self::write_text(value, ty, out),
            SqlValue::Bytes(value) => value.to_sql_checked(ty, out),
            SqlValue::DateTime(value) => Self::write_timestamp(*value, ty, out),
            SqlValue::Json(value) => value.to_sql_checked(ty, out),
        }
    }

    fn accepts(_ty: &PgType) -> bool {
        true // each variant checks the column type when encoding
    }

    to_sql_checked!();
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_from_json_scalars() {
        assert_eq!(SqlValue::from_json(&json!(null)), SqlValue::Null);
        assert_eq!(SqlValue::from_json(&json!(true)), SqlValue::Bool(true));
        assert_eq!(SqlValue::from_json(&json!(42)), SqlValue::I64(42));
        assert_eq!(SqlValue::from_json(&json!("abc")), SqlValue::String("abc".to_string()));
        assert_eq!(
            SqlValue::from_json(&json!(1.25)),
            SqlValue::Decimal(Decimal::from_str("1.25").unwrap())
        );
    }

    #[test]
    fn test_from_json_nested_kept_as_json() {
        let value = json!({"a": [1, 2]});
        assert_eq!(SqlValue::from_json(&value), SqlValue::Json(value.clone()));
    }

    #[test]
    fn test_null_encodes_as_sql_null() {
        let mut out = BytesMut::new();
        let is_null = SqlValue::Null.to_sql(&PgType::INT8, &mut out).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
        assert!(out.is_empty());
    }

    #[test]
    fn test_integer_narrowed_to_column_type() {
        let mut out = BytesMut::new();
        SqlValue::I64(7).to_sql(&PgType::INT4, &mut out).unwrap();
        assert_eq!(out.len(), 4);

        let mut out = BytesMut::new();
        assert!(SqlValue::I64(i64::MAX).to_sql(&PgType::INT2, &mut out).is_err());
    }

    fn encode(value: &SqlValue, ty: &PgType) -> Result<BytesMut, String> {
        let mut out = BytesMut::new();
        value.to_sql_checked(ty, &mut out).map(|_| out).map_err(|e| e.to_string())
    }

    fn encode_native<T: ToSql>(value: T, ty: &PgType) -> BytesMut {
        let mut out = BytesMut::new();
        value.to_sql(ty, &mut out).unwrap();
        out
    }

    #[test]
    fn test_mismatched_types_are_rejected() {
        assert!(encode(&SqlValue::I64(42), &PgType::TEXT).is_err());
        assert!(encode(&SqlValue::Bool(true), &PgType::INT4).is_err());
        assert!(encode(&SqlValue::Json(json!({"a": 1})), &PgType::INT8).is_err());
        assert!(encode(&SqlValue::from("not a number"), &PgType::INT8).is_err());
        assert!(encode(&SqlValue::from("yesterday"), &PgType::TIMESTAMPTZ).is_err());
    }

    #[test]
    fn test_text_parsed_into_integer_columns() {
        assert_eq!(
            encode(&SqlValue::from("12345678"), &PgType::INT8).unwrap(),
            encode_native(12345678i64, &PgType::INT8)
        );
        assert_eq!(
            encode(&SqlValue::from(" 7 "), &PgType::INT2).unwrap(),
            encode_native(7i16, &PgType::INT2)
        );
    }

    #[test]
    fn test_text_parsed_into_numeric_and_bool_columns() {
        assert_eq!(
            encode(&SqlValue::from("19.99"), &PgType::NUMERIC).unwrap(),
            encode_native(Decimal::from_str("19.99").unwrap(), &PgType::NUMERIC)
        );
        assert_eq!(
            encode(&SqlValue::from("true"), &PgType::BOOL).unwrap(),
            encode_native(true, &PgType::BOOL)
        );
    }

    #[test]
    fn test_text_parsed_into_timestamp_columns() {
        let expected = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(
            encode(&SqlValue::from("2024-03-01T14:30:00+02:00"), &PgType::TIMESTAMPTZ).unwrap(),
            encode_native(expected, &PgType::TIMESTAMPTZ)
        );
        assert_eq!(
            encode(&SqlValue::from("2024-03-01 12:30:00"), &PgType::TIMESTAMP).unwrap(),
            encode_native(expected.naive_utc(), &PgType::TIMESTAMP)
        );
        assert_eq!(
            encode(&SqlValue::DateTime(expected), &PgType::TIMESTAMP).unwrap(),
            encode_native(expected.naive_utc(), &PgType::TIMESTAMP)
        );
    }

    #[test]
    fn test_text_and_integers_keep_native_encoding() {
        assert_eq!(encode(&SqlValue::from("bob"), &PgType::TEXT).unwrap().as_ref(), b"bob");
        assert_eq!(
            encode(&SqlValue::I32(5), &PgType::NUMERIC).unwrap(),
            encode_native(Decimal::from(5), &PgType::NUMERIC)
        );
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some("x")), SqlValue::String("x".to_string()));
    }

    #[test]
    fn test_display() {
        assert_eq!(SqlValue::Null.to_string(), "NULL");
        assert_eq!(SqlValue::from("bob").to_string(), "'bob'");
        assert_eq!(SqlValue::Bytes(vec![0xde, 0xad]).to_string(), "0xdead");
    }
}
