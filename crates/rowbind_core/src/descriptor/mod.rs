//! Cached, immutable per-type binding metadata.
//!
//! # Responsibility
//! - Build one `ModelDescriptor` per model type from its declared fields.
//! - Serve descriptors from a process-wide cache keyed by full type identity.
//!
//! # Invariants
//! - At most one descriptor is ever built per concrete type; concurrent
//!   first-access resolves to the single instance the winner created.
//! - The check-and-insert step runs under the cache's one exclusive section;
//!   lookups of present entries take only the shared side.
//! - Descriptors are immutable after construction and never evicted.

use crate::convert::ConvertResult;
use crate::model::{Bindable, FieldSpec, ScalarBinding};
use crate::value::{FieldValue, ScalarType};
use log::debug;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// One field of a built descriptor: the declared spec plus the uppercase
/// name precomputed for case-insensitive row matching.
pub struct FieldDescriptor<T> {
    spec: FieldSpec<T>,
    upper_name: String,
}

impl<T> FieldDescriptor<T> {
    pub fn name(&self) -> &'static str {
        self.spec.name()
    }

    /// Uppercased name used for read-path column matching.
    pub fn upper_name(&self) -> &str {
        &self.upper_name
    }

    pub fn semantic(&self) -> ScalarType {
        self.spec.semantic()
    }

    pub fn getter(&self) -> Option<fn(&T) -> FieldValue> {
        self.spec.getter()
    }

    pub fn setter(&self) -> Option<fn(&mut T, FieldValue) -> ConvertResult<()>> {
        self.spec.setter()
    }

    pub fn is_readable(&self) -> bool {
        self.spec.is_readable()
    }

    pub fn is_writable(&self) -> bool {
        self.spec.is_writable()
    }
}

/// Immutable binding metadata for one model type.
pub struct ModelDescriptor<T> {
    model_name: &'static str,
    scalar: Option<ScalarBinding<T>>,
    fields: Vec<FieldDescriptor<T>>,
}

impl<T: Bindable> ModelDescriptor<T> {
    fn build() -> Self {
        let fields = T::fields()
            .into_iter()
            .map(|spec| FieldDescriptor {
                upper_name: spec.name().to_uppercase(),
                spec,
            })
            .collect();
        Self {
            model_name: T::model_name(),
            scalar: T::scalar_binding(),
            fields,
        }
    }

    pub fn model_name(&self) -> &'static str {
        self.model_name
    }

    /// Scalar construction rule; `Some` for single-value models.
    pub fn scalar_binding(&self) -> Option<ScalarBinding<T>> {
        self.scalar
    }

    pub fn is_scalar(&self) -> bool {
        self.scalar.is_some()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[FieldDescriptor<T>] {
        &self.fields
    }
}

type DescriptorMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

static DESCRIPTORS: Lazy<RwLock<DescriptorMap>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Returns the process-wide descriptor for `T`, building it on first access.
///
/// Poisoning is survived: entries are immutable, so a map poisoned by a
/// panicking builder thread is still consistent for readers.
pub fn descriptor_of<T: Bindable>() -> Arc<ModelDescriptor<T>> {
    let key = TypeId::of::<T>();
    {
        let map = DESCRIPTORS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(entry) = map.get(&key) {
            return downcast_entry::<T>(entry);
        }
    }

    let mut map = DESCRIPTORS.write().unwrap_or_else(PoisonError::into_inner);
    let entry = map.entry(key).or_insert_with(|| {
        let descriptor = ModelDescriptor::<T>::build();
        debug!(
            "event=descriptor_build model={} fields={} scalar={}",
            descriptor.model_name,
            descriptor.fields.len(),
            descriptor.is_scalar()
        );
        Arc::new(descriptor)
    });
    downcast_entry::<T>(entry)
}

fn downcast_entry<T: Bindable>(entry: &Arc<dyn Any + Send + Sync>) -> Arc<ModelDescriptor<T>> {
    Arc::clone(entry)
        .downcast::<ModelDescriptor<T>>()
        .expect("cache entries are keyed by the exact descriptor type")
}

#[cfg(test)]
mod tests {
    use super::descriptor_of;
    use crate::model::{Bindable, FieldSpec, FieldType};
    use crate::value::ScalarType;
    use std::sync::Arc;

    #[derive(Debug, Default)]
    struct CachedPerson {
        first_name: String,
        age: Option<i32>,
    }

    crate::bind_fields!(CachedPerson {
        first_name: String,
        age: Option<i32>,
    });

    #[test]
    fn repeated_lookups_share_one_descriptor() {
        let first = descriptor_of::<CachedPerson>();
        let second = descriptor_of::<CachedPerson>();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.model_name(), "CachedPerson");
        assert!(!first.is_scalar());
    }

    #[test]
    fn upper_names_are_precomputed() {
        let descriptor = descriptor_of::<CachedPerson>();
        let upper: Vec<&str> = descriptor
            .fields()
            .iter()
            .map(|field| field.upper_name())
            .collect();
        assert_eq!(upper, vec!["FIRST_NAME", "AGE"]);
        assert_eq!(descriptor.fields()[1].semantic(), ScalarType::I32);
    }

    #[test]
    fn scalar_types_get_scalar_descriptors() {
        let descriptor = descriptor_of::<i64>();
        assert!(descriptor.is_scalar());
        assert!(descriptor.fields().is_empty());
        let binding = descriptor.scalar_binding().expect("scalar binding");
        assert_eq!(binding.kind, ScalarType::I64);
    }

    #[derive(Debug, Default)]
    struct OneWayTally {
        total: i64,
    }

    impl Bindable for OneWayTally {
        fn model_name() -> &'static str {
            "OneWayTally"
        }

        fn fields() -> Vec<FieldSpec<Self>> {
            vec![FieldSpec::read_only("total", ScalarType::I64, |model| {
                model.total.to_value()
            })]
        }
    }

    #[test]
    fn hand_written_one_way_fields_survive_descriptor_build() {
        let descriptor = descriptor_of::<OneWayTally>();
        assert!(descriptor.fields()[0].is_readable());
        assert!(!descriptor.fields()[0].is_writable());
    }
}
