//! Pluggable value conversion between raw storage values and typed values.
//!
//! # Responsibility
//! - Define the converter contract (`can_convert` / `read_value` / `write_value`).
//! - Hold converters in an ordered set; selection is first-match in
//!   registration order.
//! - Own the process-default converter set with init-once install semantics.
//!
//! # Invariants
//! - Converters are stateless and shared; a set is never mutated after it
//!   becomes the process default.
//! - `read_value` maps raw NULL to `FieldValue::Null` before any semantic
//!   dispatch; `write_value` maps `FieldValue::Null` to `SqlValue::Null`.

pub mod standard;

pub use standard::StandardConverter;

use crate::value::{FieldValue, ScalarType, SqlValue, StorageClass};
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for single-value conversions.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Typed failure for one value conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum ConvertError {
    /// The raw value's storage class cannot represent the semantic kind.
    UnsupportedStorage {
        semantic: ScalarType,
        storage: StorageClass,
    },
    /// The value is representable in principle but falls outside the target
    /// range (integer narrowing, non-finite floats, epoch overflow).
    OutOfRange { semantic: ScalarType, value: String },
    /// Text (or blob) input that does not parse as the semantic kind.
    Malformed { semantic: ScalarType, value: String },
    /// A typed value whose variant does not match the field's semantic kind.
    TypeMismatch {
        semantic: ScalarType,
        found: &'static str,
    },
    /// No enumeration variant carries this discriminant.
    UnknownVariant {
        enum_name: &'static str,
        discriminant: i64,
    },
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedStorage { semantic, storage } => {
                write!(f, "cannot read {storage} storage as {semantic}")
            }
            Self::OutOfRange { semantic, value } => {
                write!(f, "value `{value}` is out of range for {semantic}")
            }
            Self::Malformed { semantic, value } => {
                write!(f, "value `{value}` does not parse as {semantic}")
            }
            Self::TypeMismatch { semantic, found } => {
                write!(f, "expected a {semantic} value, found {found}")
            }
            Self::UnknownVariant {
                enum_name,
                discriminant,
            } => {
                write!(f, "no variant of {enum_name} has discriminant {discriminant}")
            }
        }
    }
}

impl Error for ConvertError {}

/// Capability-tested converter between `SqlValue` and `FieldValue`.
///
/// Implementations are stateless. A converter only receives semantics its
/// `can_convert` accepted, but must still fail cleanly (never panic) on
/// unexpected input values.
pub trait ValueConverter: Send + Sync {
    /// Whether this converter handles the given semantic kind.
    fn can_convert(&self, semantic: ScalarType) -> bool;

    /// Raw storage value to typed value. Raw NULL yields `FieldValue::Null`.
    fn read_value(&self, semantic: ScalarType, raw: SqlValue) -> ConvertResult<FieldValue>;

    /// Typed value to storage-safe value. `FieldValue::Null` yields
    /// `SqlValue::Null`.
    fn write_value(&self, semantic: ScalarType, value: FieldValue) -> ConvertResult<SqlValue>;
}

/// Ordered converter collection; selection is first-match.
///
/// To override a standard kind, build an empty set and register the custom
/// converter before [`StandardConverter`].
pub struct ConverterSet {
    converters: Vec<Box<dyn ValueConverter>>,
}

impl ConverterSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Creates the standard set: one [`StandardConverter`] covering every
    /// scalar kind.
    pub fn standard() -> Self {
        let mut set = Self::new();
        set.register(Box::new(StandardConverter));
        set
    }

    /// Appends a converter; earlier registrations win on overlap.
    pub fn register(&mut self, converter: Box<dyn ValueConverter>) {
        self.converters.push(converter);
    }

    /// First registered converter accepting `semantic`, if any.
    pub fn find(&self, semantic: ScalarType) -> Option<&dyn ValueConverter> {
        self.converters
            .iter()
            .map(AsRef::as_ref)
            .find(|converter| converter.can_convert(semantic))
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl Default for ConverterSet {
    fn default() -> Self {
        Self::standard()
    }
}

static DEFAULT_SET: OnceCell<ConverterSet> = OnceCell::new();

/// Error from [`install_converters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallError {
    /// A default set is already in place (installed or first-used).
    AlreadyInstalled,
}

impl Display for InstallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInstalled => {
                write!(f, "a default converter set is already installed")
            }
        }
    }
}

impl Error for InstallError {}

/// Process-default converter set; initializes to [`ConverterSet::standard`]
/// on first use.
pub fn default_converters() -> &'static ConverterSet {
    DEFAULT_SET.get_or_init(|| {
        info!("event=converters_default status=ok converters=1 kind=standard");
        ConverterSet::standard()
    })
}

/// Replaces the process-default converter set. First call wins; any call
/// after an install or a first use fails with `AlreadyInstalled`.
pub fn install_converters(set: ConverterSet) -> Result<(), InstallError> {
    let count = set.len();
    DEFAULT_SET
        .set(set)
        .map_err(|_| InstallError::AlreadyInstalled)?;
    info!("event=converters_install status=ok converters={count}");
    Ok(())
}
