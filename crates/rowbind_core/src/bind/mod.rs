//! Binder: model instances to parameterized commands, rows to instances.
//!
//! # Responsibility
//! - Own the binding error taxonomy shared by both directions.
//! - Re-export the write path (`command`) and read path (`materialize`).
//!
//! # Invariants
//! - Mapping failures always name the model, field and semantic kind.
//! - Contract violations are detected before any driver work.

pub mod command;
pub mod materialize;

pub use command::{bind_map, bind_map_with, bind_model, bind_model_with, bind_none};
pub use command::{BoundCommand, Parameter};
pub use materialize::{materialize, materialize_with};

use crate::convert::ConvertError;
use crate::value::ScalarType;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for binding operations.
pub type BindResult<T> = Result<T, BindError>;

/// Failure raised while binding parameters or materializing a row.
#[derive(Debug)]
pub enum BindError {
    /// The SQL statement text is empty.
    MissingStatement,
    /// A single command was requested from a batch parameter argument.
    BatchCommand,
    /// A map parameter name that is not a plain identifier.
    InvalidParameterName(String),
    /// A declared bindable field that no registered converter accepts.
    UnsupportedFieldType {
        model: &'static str,
        field: String,
        semantic: ScalarType,
    },
    /// A field value that failed conversion, in either direction.
    FieldConversion {
        model: &'static str,
        field: String,
        semantic: ScalarType,
        source: ConvertError,
    },
}

impl Display for BindError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingStatement => write!(f, "sql statement text is empty"),
            Self::BatchCommand => {
                write!(f, "a single command cannot be built from a parameter sequence")
            }
            Self::InvalidParameterName(name) => {
                write!(f, "parameter name `{name}` is not a plain identifier")
            }
            Self::UnsupportedFieldType {
                model,
                field,
                semantic,
            } => {
                write!(f, "no converter accepts field `{model}.{field}` of kind {semantic}")
            }
            Self::FieldConversion {
                model,
                field,
                semantic,
                source,
            } => {
                write!(f, "cannot convert field `{model}.{field}` as {semantic}: {source}")
            }
        }
    }
}

impl Error for BindError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::FieldConversion { source, .. } => Some(source),
            _ => None,
        }
    }
}
