//! Batch-aware dispatch: the execute/query entry points.
//!
//! # Responsibility
//! - Classify the parameter argument (single object vs sequence) and issue
//!   one command per element against the same SQL text and handle.
//! - Aggregate results: summed affected counts, concatenated row sequences.
//!
//! # Invariants
//! - Elements run strictly in caller order; the first failure stops the
//!   batch, and earlier elements are not rolled back here.
//! - No implicit transaction wrapping; atomicity comes from executing on a
//!   transaction handle.
//! - Contract violations surface before any driver work.

pub mod query;

pub use query::{query, query_with, Query};

use crate::bind::command::ensure_statement;
use crate::bind::{bind_map_with, bind_model_with, bind_none, BindError, BindResult, BoundCommand};
use crate::convert::{default_converters, ConverterSet};
use crate::driver::{DriverConnection, DriverError};
use crate::model::{Bindable, ParamMap};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Result type for dispatch operations.
pub type DataResult<T> = Result<T, DataError>;

/// Dispatch-level failure: a binding problem or a driver problem.
#[derive(Debug)]
pub enum DataError {
    Bind(BindError),
    Driver(DriverError),
}

impl Display for DataError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bind(err) => write!(f, "{err}"),
            Self::Driver(err) => write!(f, "{err}"),
        }
    }
}

impl Error for DataError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Bind(err) => Some(err),
            Self::Driver(err) => Some(err),
        }
    }
}

impl From<BindError> for DataError {
    fn from(value: BindError) -> Self {
        Self::Bind(value)
    }
}

impl From<DriverError> for DataError {
    fn from(value: DriverError) -> Self {
        Self::Driver(value)
    }
}

/// One logical parameter object able to bind itself into a command.
///
/// Implementations exist for "no parameters", model instances and parameter
/// maps; [`Params`] carries them through dispatch.
pub trait ParameterSource {
    fn bind(&self, sql: &str, converters: &ConverterSet) -> BindResult<BoundCommand>;
}

struct NoParams;

impl ParameterSource for NoParams {
    fn bind(&self, sql: &str, _converters: &ConverterSet) -> BindResult<BoundCommand> {
        bind_none(sql)
    }
}

struct ModelParams<'a, T: Bindable>(&'a T);

impl<T: Bindable> ParameterSource for ModelParams<'_, T> {
    fn bind(&self, sql: &str, converters: &ConverterSet) -> BindResult<BoundCommand> {
        bind_model_with(sql, self.0, converters)
    }
}

struct MapParams(ParamMap);

impl ParameterSource for MapParams {
    fn bind(&self, sql: &str, converters: &ConverterSet) -> BindResult<BoundCommand> {
        bind_map_with(sql, &self.0, converters)
    }
}

/// Parameter argument for execute/query: absent, one object, or a sequence.
///
/// Classification is fixed at construction, so strings and other scalars can
/// never be mistaken for sequences.
pub enum Params<'a> {
    Single(Box<dyn ParameterSource + 'a>),
    Batch(Vec<Box<dyn ParameterSource + 'a>>),
}

impl<'a> Params<'a> {
    /// No parameter object; the command binds no parameters.
    pub fn none() -> Self {
        Self::Single(Box::new(NoParams))
    }

    /// A single model instance.
    pub fn model<T: Bindable>(model: &'a T) -> Self {
        Self::Single(Box::new(ModelParams(model)))
    }

    /// A single name-to-value map.
    pub fn map(map: ParamMap) -> Self {
        Self::Single(Box::new(MapParams(map)))
    }

    /// A sequence of model instances; one command per element.
    pub fn batch<T: Bindable>(models: &'a [T]) -> Self {
        Self::Batch(
            models
                .iter()
                .map(|model| Box::new(ModelParams(model)) as Box<dyn ParameterSource + 'a>)
                .collect(),
        )
    }

    /// A sequence of maps; one command per element.
    pub fn map_batch(maps: Vec<ParamMap>) -> Self {
        Self::Batch(
            maps.into_iter()
                .map(|map| Box::new(MapParams(map)) as Box<dyn ParameterSource + 'a>)
                .collect(),
        )
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    pub(crate) fn into_sources(self) -> Vec<Box<dyn ParameterSource + 'a>> {
        match self {
            Self::Single(source) => vec![source],
            Self::Batch(sources) => sources,
        }
    }
}

/// Builds one parameterized command without executing it.
///
/// Only single-mode parameters are accepted; a batch cannot collapse into
/// one command.
pub fn create_command(sql: &str, params: &Params<'_>) -> DataResult<BoundCommand> {
    match params {
        Params::Single(source) => Ok(source.bind(sql, default_converters())?),
        Params::Batch(_) => Err(BindError::BatchCommand.into()),
    }
}

/// Runs a non-query statement once per parameter element and returns the
/// summed affected-row count.
///
/// Binding happens per element, interleaved with execution; the first
/// failing element stops the batch.
pub fn execute(conn: &dyn DriverConnection, sql: &str, params: Params<'_>) -> DataResult<usize> {
    ensure_statement(sql)?;
    let started_at = Instant::now();
    let mode = if params.is_batch() { "batch" } else { "single" };
    let sources = params.into_sources();
    let elements = sources.len();
    let converters = default_converters();

    let mut affected = 0usize;
    for source in &sources {
        let command = source.bind(sql, converters)?;
        affected += conn.execute_command(&command)?;
    }
    debug!(
        "event=execute mode={mode} elements={elements} rows={affected} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    Ok(affected)
}
