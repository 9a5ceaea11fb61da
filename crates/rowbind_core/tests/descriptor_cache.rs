use rowbind_core::{descriptor_of, ScalarType};
use std::sync::Arc;
use std::thread;

mod alpha {
    #[derive(Debug, Default)]
    pub struct Sensor {
        pub serial: i64,
    }

    rowbind_core::bind_fields!(Sensor { serial: i64 });
}

mod beta {
    #[derive(Debug, Default)]
    pub struct Sensor {
        pub serial: i64,
        pub label: String,
    }

    rowbind_core::bind_fields!(Sensor {
        serial: i64,
        label: String,
    });
}

#[test]
fn concurrent_first_access_shares_one_descriptor() {
    let descriptors: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| descriptor_of::<alpha::Sensor>()))
            .collect();
        handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect()
    });

    let first = &descriptors[0];
    assert!(descriptors
        .iter()
        .all(|descriptor| Arc::ptr_eq(descriptor, first)));
}

#[test]
fn repeated_access_returns_the_cached_instance() {
    let first = descriptor_of::<beta::Sensor>();
    let second = descriptor_of::<beta::Sensor>();
    assert!(Arc::ptr_eq(&first, &second));
}

#[test]
fn type_identity_keys_the_cache_not_the_name() {
    let a = descriptor_of::<alpha::Sensor>();
    let b = descriptor_of::<beta::Sensor>();

    // Same display name, different types, separate descriptors.
    assert_eq!(a.model_name(), "Sensor");
    assert_eq!(b.model_name(), "Sensor");
    assert_eq!(a.fields().len(), 1);
    assert_eq!(b.fields().len(), 2);
}

#[test]
fn field_descriptors_carry_precomputed_fold_names() {
    let descriptor = descriptor_of::<beta::Sensor>();
    let upper: Vec<&str> = descriptor
        .fields()
        .iter()
        .map(|field| field.upper_name())
        .collect();
    assert_eq!(upper, vec!["SERIAL", "LABEL"]);
}

#[test]
fn scalar_descriptors_report_their_binding() {
    let descriptor = descriptor_of::<Option<i64>>();
    assert!(descriptor.is_scalar());
    assert_eq!(descriptor.model_name(), "Option<i64>");
    assert_eq!(
        descriptor.scalar_binding().map(|binding| binding.kind),
        Some(ScalarType::I64)
    );
    assert!(descriptor.fields().is_empty());
}
