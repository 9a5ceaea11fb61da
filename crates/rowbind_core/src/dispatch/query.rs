//! Lazy single-pass query sequences.
//!
//! # Responsibility
//! - Pull-based materialization: each advance converts exactly one row.
//! - Fan a batch out across elements, concatenating rows in element order.
//! - Invoke the optional per-row callback right after each row is produced.
//!
//! # Invariants
//! - The sequence is single-pass and non-rewindable; it fuses after the
//!   first error and after exhaustion.
//! - Each batch element's statement binds and opens only when the previous
//!   element's rows are exhausted.
//! - The underlying stream is released on completion, on failure, and on
//!   drop.

use super::{DataError, DataResult, ParameterSource, Params};
use crate::bind::command::ensure_statement;
use crate::bind::materialize_with;
use crate::convert::{default_converters, ConverterSet};
use crate::driver::{DriverConnection, RowStream};
use crate::model::Bindable;
use log::debug;
use std::collections::VecDeque;
use std::fmt::{Debug, Formatter};

/// Per-row callback: batch element index plus the materialized row.
pub type RowCallback<'q, T> = Box<dyn FnMut(usize, &T) + 'q>;

/// Runs a query and returns the lazy row sequence.
///
/// The statement is validated and classified eagerly; rows bind, execute
/// and materialize only as the sequence is advanced.
pub fn query<'q, T: Bindable>(
    conn: &'q dyn DriverConnection,
    sql: &str,
    params: Params<'q>,
) -> DataResult<Query<'q, T>> {
    build(conn, sql, params, None)
}

/// Same as [`query`], with a callback observing each row as it streams by.
pub fn query_with<'q, T, F>(
    conn: &'q dyn DriverConnection,
    sql: &str,
    params: Params<'q>,
    on_row: F,
) -> DataResult<Query<'q, T>>
where
    T: Bindable,
    F: FnMut(usize, &T) + 'q,
{
    build(conn, sql, params, Some(Box::new(on_row)))
}

fn build<'q, T: Bindable>(
    conn: &'q dyn DriverConnection,
    sql: &str,
    params: Params<'q>,
    on_row: Option<RowCallback<'q, T>>,
) -> DataResult<Query<'q, T>> {
    ensure_statement(sql)?;
    let pending: VecDeque<Box<dyn ParameterSource + 'q>> = params.into_sources().into();
    debug!(
        "event=query model={} elements={}",
        T::model_name(),
        pending.len()
    );
    Ok(Query {
        conn,
        sql: sql.to_string(),
        converters: default_converters(),
        pending,
        stream: None,
        on_row,
        opened: 0,
        produced: 0,
        done: false,
    })
}

/// Lazy sequence of materialized rows, one query per batch element.
pub struct Query<'q, T: Bindable> {
    conn: &'q dyn DriverConnection,
    sql: String,
    converters: &'static ConverterSet,
    pending: VecDeque<Box<dyn ParameterSource + 'q>>,
    stream: Option<Box<dyn RowStream + 'q>>,
    on_row: Option<RowCallback<'q, T>>,
    /// Batch elements whose streams have been opened so far.
    opened: usize,
    produced: usize,
    done: bool,
}

impl<'q, T: Bindable> Debug for Query<'q, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Query")
            .field("sql", &self.sql)
            .field("opened", &self.opened)
            .field("produced", &self.produced)
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

enum Step<T> {
    Row(T),
    Fail(DataError),
    ElementDone,
    OpenNext,
}

impl<'q, T: Bindable> Iterator for Query<'q, T> {
    type Item = DataResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let step = match self.stream.as_mut() {
                Some(stream) => match stream.advance() {
                    Ok(true) => match materialize_with::<T>(stream.as_row(), self.converters) {
                        Ok(instance) => Step::Row(instance),
                        Err(err) => Step::Fail(err.into()),
                    },
                    Ok(false) => Step::ElementDone,
                    Err(err) => Step::Fail(err.into()),
                },
                None => Step::OpenNext,
            };

            match step {
                Step::Row(instance) => {
                    self.produced += 1;
                    if let Some(on_row) = self.on_row.as_mut() {
                        on_row(self.opened - 1, &instance);
                    }
                    return Some(Ok(instance));
                }
                Step::Fail(err) => {
                    self.done = true;
                    self.stream = None;
                    return Some(Err(err));
                }
                Step::ElementDone => {
                    self.stream = None;
                }
                Step::OpenNext => {
                    let Some(source) = self.pending.pop_front() else {
                        self.done = true;
                        debug!(
                            "event=query_done model={} elements={} rows={}",
                            T::model_name(),
                            self.opened,
                            self.produced
                        );
                        return None;
                    };
                    let command = match source.bind(&self.sql, self.converters) {
                        Ok(command) => command,
                        Err(err) => {
                            self.done = true;
                            return Some(Err(err.into()));
                        }
                    };
                    match self.conn.query_command(&command) {
                        Ok(stream) => {
                            self.stream = Some(stream);
                            self.opened += 1;
                        }
                        Err(err) => {
                            self.done = true;
                            return Some(Err(err.into()));
                        }
                    }
                }
            }
        }
    }
}
