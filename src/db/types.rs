//! Row-to-text conversion.
//!
//! Every cell of a case row is rendered as a string so the JSON output has
//! one uniform value type. This is lossy on purpose: numbers, booleans and
//! timestamps all arrive at the caller as text.
//!
//! # Architecture
//!
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies column types into logical categories
//! 2. Database-specific decoders extract the value and render it
//!
//! NULL is checked once up front from the raw value, so the decoders only
//! ever see non-null cells. PostgreSQL types without a native decoder here
//! are selected through a `::text` cast (see [`needs_text_cast`]), so the
//! server renders them. A non-null cell that still cannot be decoded is an
//! error, never `None`.

use crate::error::{HandlerError, HandlerResult};
use crate::models::{CaseRecord, DatabaseType, NULL_TEXT};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::postgres::PgRow;
use sqlx::{Column, Decode, Row, Type, TypeInfo, ValueRef};

// =============================================================================
// Type Classification
// =============================================================================

/// Logical category for database column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Integer,
    Float,
    Decimal,
    Boolean,
    Binary,
    Json,
    Uuid,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    Text,
}

const INTEGER_TYPES: &[&str] = &[
    "tinyint",
    "smallint",
    "mediumint",
    "int",
    "integer",
    "bigint",
    "int2",
    "int4",
    "int8",
    "serial",
    "smallserial",
    "bigserial",
    "year",
];

/// Classify a database type name into a logical category.
pub fn categorize_type(type_name: &str, db: DatabaseType) -> TypeCategory {
    let lower = type_name.to_lowercase();
    let base = lower.trim_end_matches(" unsigned");

    if base.contains("decimal") || base.contains("numeric") {
        return TypeCategory::Decimal;
    }

    if INTEGER_TYPES.contains(&base) {
        return TypeCategory::Integer;
    }

    if base == "bool" || base == "boolean" {
        return TypeCategory::Boolean;
    }

    if base.contains("float") || base.contains("double") || base == "real" {
        return TypeCategory::Float;
    }

    if base == "json" || base == "jsonb" {
        return TypeCategory::Json;
    }

    if base == "uuid" {
        return TypeCategory::Uuid;
    }

    if base.contains("blob") || base.contains("binary") || base == "bytea" {
        return TypeCategory::Binary;
    }

    match (base, db) {
        ("timestamptz", DatabaseType::Postgres) => TypeCategory::TimestampTz,
        ("timestamp", _) | ("datetime", DatabaseType::MySql) => TypeCategory::Timestamp,
        ("date", _) => TypeCategory::Date,
        ("time", _) => TypeCategory::Time,
        // varchar, text, char, enum, set, interval, ...
        _ => TypeCategory::Text,
    }
}

/// PostgreSQL text types that decode as `String` directly.
const POSTGRES_TEXT_TYPES: &[&str] = &["text", "varchar", "bpchar", "name"];

/// Whether a column must be selected as `col::text` to be rendered.
///
/// Applies to PostgreSQL only: NUMERIC (the binary form loses the declared
/// scale and cannot carry `NaN`), arrays, and every type the decoders
/// below do not handle, such as interval, inet, money and enums.
pub fn needs_text_cast(type_name: &str, db: DatabaseType) -> bool {
    if db != DatabaseType::Postgres {
        return false;
    }
    let lower = type_name.to_lowercase();
    // Array udt names carry a leading underscore, e.g. `_text`.
    if lower.starts_with('_') {
        return true;
    }
    match categorize_type(&lower, db) {
        TypeCategory::Decimal => true,
        TypeCategory::Text => !POSTGRES_TEXT_TYPES.contains(&lower.as_str()),
        _ => false,
    }
}

// =============================================================================
// Decimal Type Support
// =============================================================================

/// Wrapper type for raw MySQL DECIMAL values as strings.
/// This preserves the exact database representation.
#[derive(Debug)]
pub struct RawDecimal(pub String);

impl Type<sqlx::MySql> for RawDecimal {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<sqlx::MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        let name = ty.name().to_lowercase();
        name.contains("decimal") || name.contains("numeric")
    }
}

impl<'r> Decode<'r, sqlx::MySql> for RawDecimal {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as Decode<sqlx::MySql>>::decode(value)?;
        Ok(RawDecimal(s.to_string()))
    }
}

// =============================================================================
// Text Rendering
// =============================================================================

/// Render binary data as UTF-8 text when possible, base64 otherwise.
pub fn binary_to_text(bytes: &[u8]) -> String {
    use base64::{Engine as _, engine::general_purpose::STANDARD};

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => STANDARD.encode(bytes),
    }
}

pub fn bool_to_text(value: bool) -> String {
    if value { "True" } else { "False" }.to_string()
}

/// Floats always keep a decimal point (`1.0`, not `1`).
pub fn float_to_text(value: f64) -> String {
    format!("{:?}", value)
}

/// Single precision keeps its own shortest form (`0.1`, not `0.10000000149011612`).
pub fn float4_to_text(value: f32) -> String {
    format!("{:?}", value)
}

pub fn timestamp_to_text(value: &NaiveDateTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S%.6f").to_string()
    }
}

pub fn timestamp_tz_to_text(value: &DateTime<Utc>) -> String {
    format!("{}+00:00", timestamp_to_text(&value.naive_utc()))
}

pub fn date_to_text(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

pub fn time_to_text(value: &NaiveTime) -> String {
    if value.nanosecond() == 0 {
        value.format("%H:%M:%S").to_string()
    } else {
        value.format("%H:%M:%S%.6f").to_string()
    }
}

// =============================================================================
// Row to Text Trait
// =============================================================================

/// Trait for converting database rows to text-only JSON records.
pub trait RowToText {
    fn to_text_record(&self) -> HandlerResult<CaseRecord>;
}

impl RowToText for MySqlRow {
    fn to_text_record(&self) -> HandlerResult<CaseRecord> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| -> HandlerResult<(String, JsonValue)> {
                let text = if is_null(self, idx) {
                    NULL_TEXT.to_string()
                } else {
                    let type_name = col.type_info().name();
                    let category = categorize_type(type_name, DatabaseType::MySql);
                    mysql::decode_column(self, idx, category)
                        .ok_or_else(|| undecodable(col.name(), type_name))?
                };
                Ok((col.name().to_string(), JsonValue::String(text)))
            })
            .collect()
    }
}

impl RowToText for PgRow {
    fn to_text_record(&self) -> HandlerResult<CaseRecord> {
        self.columns()
            .iter()
            .enumerate()
            .map(|(idx, col)| -> HandlerResult<(String, JsonValue)> {
                let text = if is_null(self, idx) {
                    NULL_TEXT.to_string()
                } else {
                    let type_name = col.type_info().name();
                    let category = categorize_type(type_name, DatabaseType::Postgres);
                    postgres::decode_column(self, idx, category)
                        .ok_or_else(|| undecodable(col.name(), type_name))?
                };
                Ok((col.name().to_string(), JsonValue::String(text)))
            })
            .collect()
    }
}

fn is_null<R>(row: &R, idx: usize) -> bool
where
    R: Row,
    usize: sqlx::ColumnIndex<R>,
{
    row.try_get_raw(idx).map(|v| v.is_null()).unwrap_or(true)
}

fn undecodable(column: &str, type_name: &str) -> HandlerError {
    HandlerError::internal(format!(
        "Cannot render column '{}' of type {} as text",
        column, type_name
    ))
}

// =============================================================================
// Database-Specific Decoders
// =============================================================================

mod mysql {
    use super::*;

    pub fn decode_column(row: &MySqlRow, idx: usize, category: TypeCategory) -> Option<String> {
        let decoded = match category {
            TypeCategory::Decimal => row.try_get::<RawDecimal, _>(idx).ok().map(|v| v.0),
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(bool_to_text),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            TypeCategory::Json => row
                .try_get::<JsonValue, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            // MySQL TIMESTAMP values are stored in UTC; both forms render alike.
            TypeCategory::Timestamp | TypeCategory::TimestampTz => decode_timestamp(row, idx),
            TypeCategory::Date => row
                .try_get::<NaiveDate, _>(idx)
                .ok()
                .map(|v| date_to_text(&v)),
            TypeCategory::Time => row
                .try_get::<NaiveTime, _>(idx)
                .ok()
                .map(|v| time_to_text(&v)),
            TypeCategory::Uuid | TypeCategory::Text => decode_text(row, idx),
        };
        decoded.or_else(|| decode_text(row, idx))
    }

    fn decode_integer(row: &MySqlRow, idx: usize) -> Option<String> {
        // Signed types
        if let Ok(v) = row.try_get::<i64, _>(idx) {
            return Some(v.to_string());
        }
        // Unsigned types
        if let Ok(v) = row.try_get::<u64, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<u16, _>(idx) {
            return Some(v.to_string());
        }
        None
    }

    fn decode_float(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_to_text(v));
        }
        row.try_get::<f32, _>(idx).ok().map(float4_to_text)
    }

    fn decode_timestamp(row: &MySqlRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<NaiveDateTime, _>(idx) {
            return Some(timestamp_to_text(&v));
        }
        row.try_get::<DateTime<Utc>, _>(idx)
            .ok()
            .map(|v| timestamp_tz_to_text(&v))
    }

    /// MySQL may return VARBINARY instead of VARCHAR depending on charset
    /// configuration, so fall back to the raw bytes.
    fn decode_text(row: &MySqlRow, idx: usize) -> Option<String> {
        row.try_get::<String, _>(idx)
            .ok()
            .or_else(|| row.try_get_unchecked::<String, _>(idx).ok())
            .or_else(|| {
                row.try_get_unchecked::<Vec<u8>, _>(idx)
                    .ok()
                    .map(|bytes| binary_to_text(&bytes))
            })
    }
}

mod postgres {
    use super::*;
    use sqlx::types::Uuid;

    pub fn decode_column(row: &PgRow, idx: usize, category: TypeCategory) -> Option<String> {
        match category {
            TypeCategory::Integer => decode_integer(row, idx),
            TypeCategory::Boolean => row.try_get::<bool, _>(idx).ok().map(bool_to_text),
            TypeCategory::Float => decode_float(row, idx),
            TypeCategory::Binary => row
                .try_get::<Vec<u8>, _>(idx)
                .ok()
                .map(|v| binary_to_text(&v)),
            TypeCategory::Json => row
                .try_get::<JsonValue, _>(idx)
                .ok()
                .map(|v| v.to_string()),
            TypeCategory::Uuid => row.try_get::<Uuid, _>(idx).ok().map(|v| v.to_string()),
            TypeCategory::Timestamp => row
                .try_get::<NaiveDateTime, _>(idx)
                .ok()
                .map(|v| timestamp_to_text(&v)),
            TypeCategory::TimestampTz => row
                .try_get::<DateTime<Utc>, _>(idx)
                .ok()
                .map(|v| timestamp_tz_to_text(&v)),
            TypeCategory::Date => row
                .try_get::<NaiveDate, _>(idx)
                .ok()
                .map(|v| date_to_text(&v)),
            TypeCategory::Time => row
                .try_get::<NaiveTime, _>(idx)
                .ok()
                .map(|v| time_to_text(&v)),
            // NUMERIC is only ever seen here when it escaped the text cast.
            TypeCategory::Decimal | TypeCategory::Text => row.try_get::<String, _>(idx).ok(),
        }
    }

    fn decode_integer(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<i16, _>(idx) {
            return Some(v.to_string());
        }
        if let Ok(v) = row.try_get::<i32, _>(idx) {
            return Some(v.to_string());
        }
        row.try_get::<i64, _>(idx).ok().map(|v| v.to_string())
    }

    fn decode_float(row: &PgRow, idx: usize) -> Option<String> {
        if let Ok(v) = row.try_get::<f64, _>(idx) {
            return Some(float_to_text(v));
        }
        row.try_get::<f32, _>(idx).ok().map(float4_to_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_type_integer() {
        assert_eq!(
            categorize_type("INT", DatabaseType::MySql),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("BIGINT UNSIGNED", DatabaseType::MySql),
            TypeCategory::Integer
        );
        assert_eq!(
            categorize_type("INT8", DatabaseType::Postgres),
            TypeCategory::Integer
        );
    }

    #[test]
    fn test_categorize_type_does_not_confuse_int_substrings() {
        assert_eq!(
            categorize_type("INTERVAL", DatabaseType::Postgres),
            TypeCategory::Text
        );
        assert_eq!(
            categorize_type("POINT", DatabaseType::Postgres),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_categorize_type_temporal() {
        assert_eq!(
            categorize_type("DATETIME", DatabaseType::MySql),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::MySql),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMP", DatabaseType::Postgres),
            TypeCategory::Timestamp
        );
        assert_eq!(
            categorize_type("TIMESTAMPTZ", DatabaseType::Postgres),
            TypeCategory::TimestampTz
        );
        assert_eq!(
            categorize_type("DATE", DatabaseType::Postgres),
            TypeCategory::Date
        );
        assert_eq!(
            categorize_type("TIME", DatabaseType::MySql),
            TypeCategory::Time
        );
    }

    #[test]
    fn test_categorize_type_misc() {
        assert_eq!(
            categorize_type("DECIMAL", DatabaseType::MySql),
            TypeCategory::Decimal
        );
        assert_eq!(
            categorize_type("BOOLEAN", DatabaseType::MySql),
            TypeCategory::Boolean
        );
        assert_eq!(
            categorize_type("FLOAT8", DatabaseType::Postgres),
            TypeCategory::Float
        );
        assert_eq!(
            categorize_type("JSONB", DatabaseType::Postgres),
            TypeCategory::Json
        );
        assert_eq!(
            categorize_type("BYTEA", DatabaseType::Postgres),
            TypeCategory::Binary
        );
        assert_eq!(
            categorize_type("VARCHAR", DatabaseType::MySql),
            TypeCategory::Text
        );
    }

    #[test]
    fn test_postgres_text_cast_for_numeric_and_unknown_types() {
        for type_name in ["NUMERIC", "numeric", "INTERVAL", "INET", "MONEY", "TIMETZ", "mood"] {
            assert!(
                needs_text_cast(type_name, DatabaseType::Postgres),
                "{} should be cast",
                type_name
            );
        }
        for array in ["_text", "_int4", "_float8", "_numeric"] {
            assert!(needs_text_cast(array, DatabaseType::Postgres), "{}", array);
        }
    }

    #[test]
    fn test_postgres_native_types_are_not_cast() {
        for type_name in [
            "int4", "int8", "float8", "bool", "text", "varchar", "bpchar", "jsonb", "uuid",
            "bytea", "timestamp", "timestamptz", "date", "time",
        ] {
            assert!(
                !needs_text_cast(type_name, DatabaseType::Postgres),
                "{} should decode natively",
                type_name
            );
        }
    }

    #[test]
    fn test_mysql_columns_are_never_cast() {
        assert!(!needs_text_cast("decimal", DatabaseType::MySql));
        assert!(!needs_text_cast("geometry", DatabaseType::MySql));
    }

    #[test]
    fn test_undecodable_is_an_error() {
        let err = undecodable("amount", "MONEY");
        assert!(matches!(err, HandlerError::Internal { .. }));
        assert!(err.to_string().contains("'amount'"));
        assert!(err.to_string().contains("MONEY"));
    }

    #[test]
    fn test_binary_to_text() {
        assert_eq!(binary_to_text(b"hello world"), "hello world");
        assert_eq!(binary_to_text(&[0xFF, 0xFE, 0x00, 0x01]), "//4AAQ==");
        assert_eq!(binary_to_text(&[]), "");
    }

    #[test]
    fn test_scalar_rendering() {
        assert_eq!(bool_to_text(true), "True");
        assert_eq!(bool_to_text(false), "False");
        assert_eq!(float_to_text(1.0), "1.0");
        assert_eq!(float_to_text(2.5), "2.5");
        assert_eq!(float4_to_text(0.1), "0.1");
    }

    #[test]
    fn test_temporal_rendering() {
        let ts = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(timestamp_to_text(&ts), "2023-01-15 08:30:00");
        assert_eq!(
            timestamp_tz_to_text(&ts.and_utc()),
            "2023-01-15 08:30:00+00:00"
        );

        let precise = NaiveDate::from_ymd_opt(2023, 1, 15)
            .unwrap()
            .and_hms_micro_opt(8, 30, 0, 250)
            .unwrap();
        assert_eq!(timestamp_to_text(&precise), "2023-01-15 08:30:00.000250");

        assert_eq!(date_to_text(&ts.date()), "2023-01-15");
        assert_eq!(time_to_text(&ts.time()), "08:30:00");
    }
}
