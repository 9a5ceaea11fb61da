//! Raw and typed value currencies shared by converters, binders and drivers.
//!
//! # Responsibility
//! - Define the driver-side raw value (`SqlValue`) and its storage class.
//! - Define the model-side typed value (`FieldValue`) and its scalar kind tag.
//! - Provide ergonomic `From` constructors for parameter building.
//!
//! # Invariants
//! - `SqlValue::Null` / `FieldValue::Null` are the only "no value" sentinels.
//! - Enumeration values travel as `FieldValue::I64` (their underlying
//!   representation); `ScalarType::Enum` exists only as a semantic tag.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use url::Url;
use uuid::Uuid;

/// SQLite-style storage class of a raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageClass {
    Null,
    Integer,
    Real,
    Text,
    Blob,
}

impl StorageClass {
    /// Stable lowercase identifier used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Text => "text",
            Self::Blob => "blob",
        }
    }
}

impl Display for StorageClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw storage value exchanged with a database driver.
///
/// `Null` is the SQL NULL sentinel on both the parameter and the row side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl SqlValue {
    pub fn storage_class(&self) -> StorageClass {
        match self {
            Self::Null => StorageClass::Null,
            Self::Integer(_) => StorageClass::Integer,
            Self::Real(_) => StorageClass::Real,
            Self::Text(_) => StorageClass::Text,
            Self::Blob(_) => StorageClass::Blob,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Blob(value)
    }
}

/// Semantic kind of a bindable field, resolved at declaration time.
///
/// A Rust type is database-compatible iff it maps to one of these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    Decimal,
    Char,
    Text,
    Uuid,
    DateTime,
    Uri,
    Version,
    /// Integral-backed unit enumeration; values travel as `FieldValue::I64`.
    Enum,
}

impl ScalarType {
    /// Stable lowercase identifier used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::I8 => "i8",
            Self::I16 => "i16",
            Self::I32 => "i32",
            Self::I64 => "i64",
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::U64 => "u64",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::Decimal => "decimal",
            Self::Char => "char",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::DateTime => "datetime",
            Self::Uri => "uri",
            Self::Version => "version",
            Self::Enum => "enum",
        }
    }
}

impl Display for ScalarType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed in-memory value carried between models and converters.
///
/// `Null` is the explicit "unset" sentinel: the materializer never assigns it
/// to a field, and the write path turns it into `SqlValue::Null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
    Decimal(Decimal),
    Char(char),
    Text(String),
    Uuid(Uuid),
    DateTime(NaiveDateTime),
    Uri(Url),
    Version(Version),
}

impl FieldValue {
    /// Scalar kind of a non-null value. `None` for `Null`.
    ///
    /// An `I64` produced from an enumeration is indistinguishable from a plain
    /// `I64`; the semantic tag lives on the field, not the value.
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ScalarType::Bool),
            Self::I8(_) => Some(ScalarType::I8),
            Self::I16(_) => Some(ScalarType::I16),
            Self::I32(_) => Some(ScalarType::I32),
            Self::I64(_) => Some(ScalarType::I64),
            Self::U8(_) => Some(ScalarType::U8),
            Self::U16(_) => Some(ScalarType::U16),
            Self::U32(_) => Some(ScalarType::U32),
            Self::U64(_) => Some(ScalarType::U64),
            Self::F32(_) => Some(ScalarType::F32),
            Self::F64(_) => Some(ScalarType::F64),
            Self::Decimal(_) => Some(ScalarType::Decimal),
            Self::Char(_) => Some(ScalarType::Char),
            Self::Text(_) => Some(ScalarType::Text),
            Self::Uuid(_) => Some(ScalarType::Uuid),
            Self::DateTime(_) => Some(ScalarType::DateTime),
            Self::Uri(_) => Some(ScalarType::Uri),
            Self::Version(_) => Some(ScalarType::Version),
        }
    }

    /// Short name for error messages, including `"null"`.
    pub fn kind_name(&self) -> &'static str {
        match self.scalar_type() {
            Some(kind) => kind.as_str(),
            None => "null",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i8> for FieldValue {
    fn from(value: i8) -> Self {
        Self::I8(value)
    }
}

impl From<i16> for FieldValue {
    fn from(value: i16) -> Self {
        Self::I16(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::I32(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<u8> for FieldValue {
    fn from(value: u8) -> Self {
        Self::U8(value)
    }
}

impl From<u16> for FieldValue {
    fn from(value: u16) -> Self {
        Self::U16(value)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::U32(value)
    }
}

impl From<u64> for FieldValue {
    fn from(value: u64) -> Self {
        Self::U64(value)
    }
}

impl From<f32> for FieldValue {
    fn from(value: f32) -> Self {
        Self::F32(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Decimal(value)
    }
}

impl From<char> for FieldValue {
    fn from(value: char) -> Self {
        Self::Char(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Url> for FieldValue {
    fn from(value: Url) -> Self {
        Self::Uri(value)
    }
}

impl From<Version> for FieldValue {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self::Null,
        }
    }
}
