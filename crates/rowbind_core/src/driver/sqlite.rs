//! SQLite implementation of the driver contracts, over rusqlite.
//!
//! # Responsibility
//! - Run bound commands on `rusqlite::Connection` and `rusqlite::Transaction`.
//! - Bind named `@` parameters, skipping ones the statement does not use.
//! - Open file or in-memory connections with the pragmas core behavior needs.
//!
//! # Invariants
//! - Result sets are buffered at query time; the handed-out stream borrows
//!   nothing from the connection. Laziness is the materializer's concern.
//! - Returned connections have `foreign_keys=ON` and a busy timeout applied.

use super::{DriverConnection, DriverError, DriverResult, Row, RowStream};
use crate::bind::BoundCommand;
use crate::value::SqlValue;
use log::{error, info};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, Statement, Transaction};
use std::path::Path;
use std::time::{Duration, Instant};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens an in-memory SQLite database ready for command execution.
///
/// # Side effects
/// - Emits `sqlite_open` logging events with duration and status.
pub fn open_memory() -> DriverResult<Connection> {
    let started_at = Instant::now();
    let conn = match Connection::open_in_memory() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=sqlite_open module=driver status=error mode=memory error={err}"
            );
            return Err(DriverError::new(err));
        }
    };

    match bootstrap_connection(&conn, false) {
        Ok(()) => {
            info!(
                "event=sqlite_open module=driver status=ok mode=memory duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=sqlite_open module=driver status=error mode=memory error_code=bootstrap_failed error={err}"
            );
            Err(DriverError::new(err))
        }
    }
}

/// Opens a SQLite database file ready for command execution.
///
/// # Side effects
/// - Creates the file if it does not exist.
/// - Emits `sqlite_open` logging events with duration and status.
pub fn open_file(path: impl AsRef<Path>) -> DriverResult<Connection> {
    let started_at = Instant::now();
    let conn = match Connection::open(path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=sqlite_open module=driver status=error mode=file error={err}");
            return Err(DriverError::new(err));
        }
    };

    match bootstrap_connection(&conn, true) {
        Ok(()) => {
            info!(
                "event=sqlite_open module=driver status=ok mode=file duration_ms={}",
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=sqlite_open module=driver status=error mode=file error_code=bootstrap_failed error={err}"
            );
            Err(DriverError::new(err))
        }
    }
}

fn bootstrap_connection(conn: &Connection, file_backed: bool) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    if file_backed {
        // journal_mode returns its new value as a one-row result.
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
    }
    Ok(())
}

impl DriverConnection for Connection {
    fn execute_command(&self, command: &BoundCommand) -> DriverResult<usize> {
        let mut statement = self.prepare(command.sql()).map_err(DriverError::new)?;
        bind_parameters(&mut statement, command).map_err(DriverError::new)?;
        statement.raw_execute().map_err(DriverError::new)
    }

    fn query_command<'conn>(
        &'conn self,
        command: &BoundCommand,
    ) -> DriverResult<Box<dyn RowStream + 'conn>> {
        let stream = BufferedRows::fetch(self, command).map_err(DriverError::new)?;
        Ok(Box::new(stream))
    }
}

impl DriverConnection for Transaction<'_> {
    fn execute_command(&self, command: &BoundCommand) -> DriverResult<usize> {
        (**self).execute_command(command)
    }

    fn query_command<'conn>(
        &'conn self,
        command: &BoundCommand,
    ) -> DriverResult<Box<dyn RowStream + 'conn>> {
        (**self).query_command(command)
    }
}

fn bind_parameters(statement: &mut Statement<'_>, command: &BoundCommand) -> rusqlite::Result<()> {
    for parameter in command.parameters() {
        // Skip parameters the statement text never references.
        let Some(index) = statement.parameter_index(parameter.name())? else {
            continue;
        };
        statement.raw_bind_parameter(index, to_native(parameter.value()))?;
    }
    Ok(())
}

fn to_native(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(number) => Value::Integer(*number),
        SqlValue::Real(number) => Value::Real(*number),
        SqlValue::Text(text) => Value::Text(text.clone()),
        SqlValue::Blob(bytes) => Value::Blob(bytes.clone()),
    }
}

fn from_native(value: ValueRef<'_>) -> SqlValue {
    match value {
        ValueRef::Null => SqlValue::Null,
        ValueRef::Integer(number) => SqlValue::Integer(number),
        ValueRef::Real(number) => SqlValue::Real(number),
        ValueRef::Text(bytes) => SqlValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => SqlValue::Blob(bytes.to_vec()),
    }
}

/// Result set buffered out of rusqlite's borrowing cursor.
struct BufferedRows {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    /// `None` before the first `advance`; clamped to `rows.len()` at the end.
    position: Option<usize>,
}

impl BufferedRows {
    fn fetch(conn: &Connection, command: &BoundCommand) -> rusqlite::Result<Self> {
        let mut statement = conn.prepare(command.sql())?;
        bind_parameters(&mut statement, command)?;
        let columns: Vec<String> = statement
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let column_count = columns.len();

        let mut rows = Vec::new();
        let mut cursor = statement.raw_query();
        while let Some(row) = cursor.next()? {
            let mut values = Vec::with_capacity(column_count);
            for position in 0..column_count {
                values.push(from_native(row.get_ref(position)?));
            }
            rows.push(values);
        }
        Ok(Self {
            columns,
            rows,
            position: None,
        })
    }
}

impl Row for BufferedRows {
    fn field_count(&self) -> usize {
        self.columns.len()
    }

    fn field_name(&self, position: usize) -> Option<&str> {
        self.columns.get(position).map(String::as_str)
    }

    fn value(&self, position: usize) -> Option<SqlValue> {
        let row = self.position.and_then(|current| self.rows.get(current))?;
        row.get(position).cloned()
    }
}

impl RowStream for BufferedRows {
    fn advance(&mut self) -> DriverResult<bool> {
        let next = match self.position {
            None => 0,
            Some(current) => current.saturating_add(1).min(self.rows.len()),
        };
        self.position = Some(next);
        Ok(next < self.rows.len())
    }

    fn as_row(&self) -> &dyn Row {
        self
    }
}
