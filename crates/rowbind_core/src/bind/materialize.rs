//! Read path: a fetched row into a fresh model instance.
//!
//! # Responsibility
//! - Match row columns to writable fields case-insensitively and assign
//!   converted values.
//! - Read scalar targets from column 0.
//!
//! # Invariants
//! - Fields with no matching column, or a NULL column value, keep their
//!   default; an explicit null is never assigned.
//! - Name matching is exact after case-folding; duplicates resolve to the
//!   first occurrence.
//! - A failed conversion discards the whole instance.

use super::{BindError, BindResult};
use crate::convert::{default_converters, ConvertError, ConverterSet};
use crate::descriptor::{descriptor_of, FieldDescriptor};
use crate::driver::Row;
use crate::model::{Bindable, ScalarBinding};
use crate::value::ScalarType;
use std::collections::HashMap;

/// Materializes a model instance from a row using the process-default
/// converter set.
pub fn materialize<T: Bindable>(row: &dyn Row) -> BindResult<T> {
    materialize_with(row, default_converters())
}

/// Materializes a model instance from a row using an explicit converter set.
pub fn materialize_with<T: Bindable>(row: &dyn Row, converters: &ConverterSet) -> BindResult<T> {
    let descriptor = descriptor_of::<T>();
    if let Some(binding) = descriptor.scalar_binding() {
        return materialize_scalar(row, converters, descriptor.model_name(), binding);
    }

    let mut instance = T::default();
    let columns = column_index(row);
    for field in descriptor.fields() {
        let Some(setter) = field.setter() else {
            continue;
        };
        let Some(&position) = columns.get(field.upper_name()) else {
            continue;
        };
        let Some(raw) = row.value(position) else {
            continue;
        };
        if raw.is_null() {
            continue;
        }
        let converter = converters
            .find(field.semantic())
            .ok_or_else(|| unsupported(descriptor.model_name(), field))?;
        let value = converter
            .read_value(field.semantic(), raw)
            .map_err(|source| conversion(descriptor.model_name(), field, source))?;
        setter(&mut instance, value)
            .map_err(|source| conversion(descriptor.model_name(), field, source))?;
    }
    Ok(instance)
}

fn materialize_scalar<T: Bindable>(
    row: &dyn Row,
    converters: &ConverterSet,
    model: &'static str,
    binding: ScalarBinding<T>,
) -> BindResult<T> {
    if row.field_count() == 0 {
        return Ok(T::default());
    }
    let Some(raw) = row.value(0) else {
        return Ok(T::default());
    };
    let converter = converters
        .find(binding.kind)
        .ok_or_else(|| BindError::UnsupportedFieldType {
            model,
            field: "0".to_string(),
            semantic: binding.kind,
        })?;
    let value = converter
        .read_value(binding.kind, raw)
        .map_err(|source| scalar_conversion(model, binding.kind, source))?;
    // A NULL column leaves the target at its default; optional targets
    // construct `None` from the sentinel themselves.
    if value.is_null() {
        return (binding.from_value)(value).or_else(|_| Ok(T::default()));
    }
    (binding.from_value)(value).map_err(|source| scalar_conversion(model, binding.kind, source))
}

fn column_index(row: &dyn Row) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(row.field_count());
    for position in 0..row.field_count() {
        let Some(name) = row.field_name(position) else {
            continue;
        };
        // First occurrence wins for duplicated column names.
        index.entry(name.to_uppercase()).or_insert(position);
    }
    index
}

fn unsupported<T>(model: &'static str, field: &FieldDescriptor<T>) -> BindError {
    BindError::UnsupportedFieldType {
        model,
        field: field.name().to_string(),
        semantic: field.semantic(),
    }
}

fn conversion<T>(model: &'static str, field: &FieldDescriptor<T>, source: ConvertError) -> BindError {
    BindError::FieldConversion {
        model,
        field: field.name().to_string(),
        semantic: field.semantic(),
        source,
    }
}

fn scalar_conversion(model: &'static str, semantic: ScalarType, source: ConvertError) -> BindError {
    BindError::FieldConversion {
        model,
        field: "0".to_string(),
        semantic,
        source,
    }
}
