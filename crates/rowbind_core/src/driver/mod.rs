//! Database driver abstraction consumed by the binder and dispatcher.
//!
//! # Responsibility
//! - Define the object-safe connection, row and cursor contracts.
//! - Carry native driver failures unchanged for caller inspection.
//!
//! # Invariants
//! - Commands are raw SQL text; parameters are matched to placeholders by
//!   name. Parameters the statement does not reference are ignored, and
//!   placeholders with no bound parameter read as SQL NULL.
//! - A row stream starts positioned before the first row and releases its
//!   cursor resources on drop.
//!
//! # See also
//! - `driver::sqlite` for the in-tree rusqlite implementation.

pub mod sqlite;

pub use sqlite::{open_file, open_memory};

use crate::bind::BoundCommand;
use crate::value::SqlValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result type for driver calls.
pub type DriverResult<T> = Result<T, DriverError>;

/// Native driver failure, surfaced unchanged.
///
/// `Display` defers to the wrapped error and [`DriverError::downcast_ref`]
/// recovers it, so callers can inspect driver-specific detail such as
/// constraint violation codes.
#[derive(Debug)]
pub struct DriverError(Box<dyn Error + Send + Sync + 'static>);

impl DriverError {
    pub fn new(inner: impl Error + Send + Sync + 'static) -> Self {
        Self(Box::new(inner))
    }

    /// The native error, if it is of type `E`.
    pub fn downcast_ref<E: Error + 'static>(&self) -> Option<&E> {
        self.0.downcast_ref::<E>()
    }

    pub fn inner(&self) -> &(dyn Error + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for DriverError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

/// Read access to one fetched row.
pub trait Row {
    fn field_count(&self) -> usize;

    /// Column name at `position`; `None` when out of range.
    fn field_name(&self, position: usize) -> Option<&str>;

    /// Raw value at `position`; `Some(SqlValue::Null)` for SQL NULL, `None`
    /// when out of range or not positioned on a row.
    fn value(&self, position: usize) -> Option<SqlValue>;
}

/// Forward-only cursor over a result set.
pub trait RowStream: Row {
    /// Moves to the next row; `Ok(false)` once the set is exhausted.
    fn advance(&mut self) -> DriverResult<bool>;

    /// View of the current row for materialization.
    fn as_row(&self) -> &dyn Row;
}

/// An open connection, or transaction handle, able to run bound commands.
///
/// Implementing this for a driver's transaction type is what gives commands
/// their optional transaction association.
pub trait DriverConnection {
    /// Runs a non-query command, returning the affected-row count.
    fn execute_command(&self, command: &BoundCommand) -> DriverResult<usize>;

    /// Runs a row-returning command.
    fn query_command<'conn>(
        &'conn self,
        command: &BoundCommand,
    ) -> DriverResult<Box<dyn RowStream + 'conn>>;
}
