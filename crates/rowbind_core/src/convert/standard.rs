//! Standard converter covering every built-in scalar kind.
//!
//! # Responsibility
//! - Map raw storage values to typed values per semantic kind, and back.
//! - Keep coercion in line with SQLite driver defaults: range-checked integer
//!   narrowing, integer-to-float widening, text parsing; no float-to-integer
//!   rounding.
//!
//! # Invariants
//! - Identifier-like kinds (`Uuid`, `Uri`, `Version`) and `Decimal` /
//!   `DateTime` / `Char` are stored as text; enumerations as their underlying
//!   integer.
//! - Non-null input never converts to null, and conversion failures carry the
//!   offending value.

use super::{ConvertError, ConvertResult, ValueConverter};
use crate::value::{FieldValue, ScalarType, SqlValue};
use chrono::{DateTime, NaiveDateTime};
use rust_decimal::Decimal;
use semver::Version;
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

/// Text form used for `DateTime` storage; fractional seconds optional.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
/// Accepted on read for ISO-8601-style text with a `T` separator.
const DATETIME_FORMAT_T: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Built-in converter; accepts every [`ScalarType`].
pub struct StandardConverter;

impl ValueConverter for StandardConverter {
    fn can_convert(&self, _semantic: ScalarType) -> bool {
        true
    }

    fn read_value(&self, semantic: ScalarType, raw: SqlValue) -> ConvertResult<FieldValue> {
        if raw.is_null() {
            return Ok(FieldValue::Null);
        }
        match semantic {
            ScalarType::Bool => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::Bool(value != 0)),
                SqlValue::Text(text) => read_bool_text(&text),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::I8 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::I8(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::I8(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::I16 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::I16(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::I16(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::I32 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::I32(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::I32(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::I64 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::I64(value)),
                SqlValue::Text(text) => Ok(FieldValue::I64(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::U8 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::U8(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::U8(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::U16 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::U16(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::U16(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::U32 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::U32(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::U32(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::U64 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::U64(narrow_integer(semantic, value)?)),
                SqlValue::Text(text) => Ok(FieldValue::U64(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::F32 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::F32(value as f32)),
                SqlValue::Real(value) => Ok(FieldValue::F32(value as f32)),
                SqlValue::Text(text) => Ok(FieldValue::F32(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::F64 => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::F64(value as f64)),
                SqlValue::Real(value) => Ok(FieldValue::F64(value)),
                SqlValue::Text(text) => Ok(FieldValue::F64(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Decimal => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::Decimal(Decimal::from(value))),
                SqlValue::Real(value) => Decimal::from_f64_retain(value)
                    .map(FieldValue::Decimal)
                    .ok_or(ConvertError::OutOfRange {
                        semantic,
                        value: value.to_string(),
                    }),
                SqlValue::Text(text) => Ok(FieldValue::Decimal(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Char => match raw {
                SqlValue::Text(text) => read_char_text(&text),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Text => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::Text(value.to_string())),
                SqlValue::Real(value) => Ok(FieldValue::Text(value.to_string())),
                SqlValue::Text(text) => Ok(FieldValue::Text(text)),
                SqlValue::Blob(bytes) => String::from_utf8(bytes)
                    .map(FieldValue::Text)
                    .map_err(|err| ConvertError::Malformed {
                        semantic,
                        value: String::from_utf8_lossy(err.as_bytes()).into_owned(),
                    }),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Uuid => match raw {
                SqlValue::Text(text) => Uuid::parse_str(text.trim())
                    .map(FieldValue::Uuid)
                    .map_err(|_| ConvertError::Malformed {
                        semantic,
                        value: text,
                    }),
                SqlValue::Blob(bytes) => Uuid::from_slice(&bytes)
                    .map(FieldValue::Uuid)
                    .map_err(|_| ConvertError::Malformed {
                        semantic,
                        value: format!("{}-byte blob", bytes.len()),
                    }),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::DateTime => match raw {
                SqlValue::Text(text) => read_datetime_text(&text),
                SqlValue::Integer(value) => DateTime::from_timestamp(value, 0)
                    .map(|moment| FieldValue::DateTime(moment.naive_utc()))
                    .ok_or(ConvertError::OutOfRange {
                        semantic,
                        value: value.to_string(),
                    }),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Uri => match raw {
                SqlValue::Text(text) => read_uri_text(&text),
                SqlValue::Blob(bytes) => read_uri_text(&utf8_text(semantic, bytes)?),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Version => match raw {
                SqlValue::Text(text) => read_version_text(&text),
                SqlValue::Blob(bytes) => read_version_text(&utf8_text(semantic, bytes)?),
                other => Err(unsupported(semantic, &other)),
            },
            ScalarType::Enum => match raw {
                SqlValue::Integer(value) => Ok(FieldValue::I64(value)),
                SqlValue::Text(text) => Ok(FieldValue::I64(parse_text(semantic, &text)?)),
                other => Err(unsupported(semantic, &other)),
            },
        }
    }

    fn write_value(&self, semantic: ScalarType, value: FieldValue) -> ConvertResult<SqlValue> {
        if value.is_null() {
            return Ok(SqlValue::Null);
        }
        match semantic {
            ScalarType::Bool => match value {
                FieldValue::Bool(flag) => Ok(SqlValue::Integer(i64::from(flag))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::I8 => match value {
                FieldValue::I8(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::I16 => match value {
                FieldValue::I16(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::I32 => match value {
                FieldValue::I32(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::I64 => match value {
                FieldValue::I64(number) => Ok(SqlValue::Integer(number)),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::U8 => match value {
                FieldValue::U8(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::U16 => match value {
                FieldValue::U16(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::U32 => match value {
                FieldValue::U32(number) => Ok(SqlValue::Integer(i64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::U64 => match value {
                // SQLite integers are signed 64-bit; larger magnitudes fail.
                FieldValue::U64(number) => i64::try_from(number)
                    .map(SqlValue::Integer)
                    .map_err(|_| ConvertError::OutOfRange {
                        semantic,
                        value: number.to_string(),
                    }),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::F32 => match value {
                FieldValue::F32(number) => Ok(SqlValue::Real(f64::from(number))),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::F64 => match value {
                FieldValue::F64(number) => Ok(SqlValue::Real(number)),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Decimal => match value {
                FieldValue::Decimal(number) => Ok(SqlValue::Text(number.to_string())),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Char => match value {
                FieldValue::Char(symbol) => Ok(SqlValue::Text(symbol.to_string())),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Text => match value {
                FieldValue::Text(text) => Ok(SqlValue::Text(text)),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Uuid => match value {
                FieldValue::Uuid(id) => Ok(SqlValue::Text(id.to_string())),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::DateTime => match value {
                FieldValue::DateTime(moment) => {
                    Ok(SqlValue::Text(moment.format(DATETIME_FORMAT).to_string()))
                }
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Uri => match value {
                FieldValue::Uri(uri) => Ok(SqlValue::Text(uri.to_string())),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Version => match value {
                FieldValue::Version(version) => Ok(SqlValue::Text(version.to_string())),
                other => Err(mismatch(semantic, &other)),
            },
            ScalarType::Enum => match value {
                FieldValue::I64(discriminant) => Ok(SqlValue::Integer(discriminant)),
                other => Err(mismatch(semantic, &other)),
            },
        }
    }
}

fn unsupported(semantic: ScalarType, raw: &SqlValue) -> ConvertError {
    ConvertError::UnsupportedStorage {
        semantic,
        storage: raw.storage_class(),
    }
}

fn mismatch(semantic: ScalarType, value: &FieldValue) -> ConvertError {
    ConvertError::TypeMismatch {
        semantic,
        found: value.kind_name(),
    }
}

fn narrow_integer<T: TryFrom<i64>>(semantic: ScalarType, value: i64) -> ConvertResult<T> {
    T::try_from(value).map_err(|_| ConvertError::OutOfRange {
        semantic,
        value: value.to_string(),
    })
}

fn parse_text<T: FromStr>(semantic: ScalarType, text: &str) -> ConvertResult<T> {
    text.trim()
        .parse::<T>()
        .map_err(|_| ConvertError::Malformed {
            semantic,
            value: text.to_string(),
        })
}

fn read_bool_text(text: &str) -> ConvertResult<FieldValue> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("true") || trimmed == "1" {
        return Ok(FieldValue::Bool(true));
    }
    if trimmed.eq_ignore_ascii_case("false") || trimmed == "0" {
        return Ok(FieldValue::Bool(false));
    }
    Err(ConvertError::Malformed {
        semantic: ScalarType::Bool,
        value: text.to_string(),
    })
}

fn read_char_text(text: &str) -> ConvertResult<FieldValue> {
    let mut symbols = text.chars();
    match (symbols.next(), symbols.next()) {
        (Some(only), None) => Ok(FieldValue::Char(only)),
        _ => Err(ConvertError::Malformed {
            semantic: ScalarType::Char,
            value: text.to_string(),
        }),
    }
}

fn read_datetime_text(text: &str) -> ConvertResult<FieldValue> {
    let trimmed = text.trim();
    NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT_T))
        .map(FieldValue::DateTime)
        .map_err(|_| ConvertError::Malformed {
            semantic: ScalarType::DateTime,
            value: text.to_string(),
        })
}

fn read_uri_text(text: &str) -> ConvertResult<FieldValue> {
    Url::parse(text.trim())
        .map(FieldValue::Uri)
        .map_err(|_| ConvertError::Malformed {
            semantic: ScalarType::Uri,
            value: text.to_string(),
        })
}

fn read_version_text(text: &str) -> ConvertResult<FieldValue> {
    Version::parse(text.trim())
        .map(FieldValue::Version)
        .map_err(|_| ConvertError::Malformed {
            semantic: ScalarType::Version,
            value: text.to_string(),
        })
}

fn utf8_text(semantic: ScalarType, bytes: Vec<u8>) -> ConvertResult<String> {
    String::from_utf8(bytes).map_err(|err| ConvertError::Malformed {
        semantic,
        value: String::from_utf8_lossy(err.as_bytes()).into_owned(),
    })
}
