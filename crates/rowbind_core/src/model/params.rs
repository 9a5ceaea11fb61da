//! Name-to-value parameter maps, the mapping form of a parameter object.
//!
//! # Responsibility
//! - Keep named parameters in insertion order for deterministic binding.
//! - Normalize names so `"@Id"` and `"Id"` address the same entry.
//!
//! # Invariants
//! - Entries are stored under the bare name (no `@`); the binder adds the
//!   placeholder prefix.
//! - Re-inserting an existing name replaces its value in place, preserving
//!   the original position.

use crate::value::FieldValue;

/// Ordered named-parameter collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap {
    entries: Vec<(String, FieldValue)>,
}

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one parameter. Leading `@` characters are stripped
    /// from the name before storage.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> &mut Self {
        let name = normalize_name(&name.into());
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((name, value)),
        }
        self
    }

    /// Looks up a parameter by name, with or without the `@` prefix.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        let name = normalize_name(name);
        self.entries
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| value)
    }

    /// Entries in insertion order, bare names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('@').to_string()
}
