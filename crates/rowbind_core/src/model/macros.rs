//! Declaration macros for bindable models and integral-backed enumerations.
//!
//! # Responsibility
//! - `bind_fields!` turns a braced field list into a `Bindable` impl with
//!   generated accessors; unlisted fields stay invisible to the engine.
//! - `bind_enum!` defines a unit enumeration with explicit discriminants and
//!   wires it up as an `Enum`-kind `FieldType`.

/// Implements [`Bindable`] for a struct from a braced field list.
///
/// Each listed field must name its Rust type exactly as declared on the
/// struct (including `Option<..>` wrappers); the type must implement
/// [`FieldType`]. Fields left off the list are simply skipped by binding and
/// materialization, which is how non-scalar members (collections, nested
/// structs) stay out of the engine's reach.
///
/// The struct itself must implement `Default` so the read path can allocate a
/// blank instance.
///
/// [`Bindable`]: crate::model::Bindable
/// [`FieldType`]: crate::model::FieldType
#[macro_export]
macro_rules! bind_fields {
    ($model:ty { $($field:ident: $fty:ty),+ $(,)? }) => {
        impl $crate::model::Bindable for $model {
            fn model_name() -> &'static str {
                stringify!($model)
            }

            fn fields() -> ::std::vec::Vec<$crate::model::FieldSpec<Self>> {
                ::std::vec![
                    $(
                        $crate::model::FieldSpec::new(
                            stringify!($field),
                            <$fty as $crate::model::FieldType>::SCALAR,
                            |model: &Self| {
                                $crate::model::FieldType::to_value(&model.$field)
                            },
                            |model: &mut Self, value: $crate::value::FieldValue| {
                                model.$field =
                                    <$fty as $crate::model::FieldType>::from_value(value)?;
                                ::std::result::Result::Ok(())
                            },
                        )
                    ),+
                ]
            }
        }
    };
}

/// Defines a unit enumeration with explicit `i64` discriminants and
/// implements [`FieldType`] for it with the `Enum` scalar kind.
///
/// Values travel as their discriminant; reading an unknown discriminant fails
/// with `ConvertError::UnknownVariant`. Extra attributes (doc comments,
/// further derives such as `Default`) pass through to the generated enum.
///
/// [`FieldType`]: crate::model::FieldType
#[macro_export]
macro_rules! bind_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i64)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value),+
        }

        impl $crate::model::FieldType for $name {
            const SCALAR: $crate::value::ScalarType = $crate::value::ScalarType::Enum;

            fn to_value(&self) -> $crate::value::FieldValue {
                $crate::value::FieldValue::I64(*self as i64)
            }

            fn from_value(
                value: $crate::value::FieldValue,
            ) -> $crate::convert::ConvertResult<Self> {
                let discriminant = match value {
                    $crate::value::FieldValue::I64(number) => number,
                    other => {
                        return ::std::result::Result::Err(
                            $crate::convert::ConvertError::TypeMismatch {
                                semantic: $crate::value::ScalarType::Enum,
                                found: other.kind_name(),
                            },
                        )
                    }
                };
                $(
                    if discriminant == $value {
                        return ::std::result::Result::Ok(Self::$variant);
                    }
                )+
                ::std::result::Result::Err($crate::convert::ConvertError::UnknownVariant {
                    enum_name: stringify!($name),
                    discriminant,
                })
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::convert::ConvertError;
    use crate::model::{Bindable, FieldType};
    use crate::value::{FieldValue, ScalarType};

    crate::bind_enum! {
        /// Processing states for the test widget.
        #[derive(Default)]
        pub enum WidgetState {
            #[default]
            Draft = 1,
            Active = 2,
            Retired = 9,
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Widget {
        id: i64,
        label: String,
        score: Option<f64>,
        state: WidgetState,
        notes: Vec<String>,
    }

    crate::bind_fields!(Widget {
        id: i64,
        label: String,
        score: Option<f64>,
        state: WidgetState,
    });

    #[test]
    fn listed_fields_are_registered_in_order() {
        let fields = Widget::fields();
        let names: Vec<&str> = fields.iter().map(|field| field.name()).collect();
        assert_eq!(names, vec!["id", "label", "score", "state"]);
        assert_eq!(fields[2].semantic(), ScalarType::F64);
        assert_eq!(fields[3].semantic(), ScalarType::Enum);
        assert_eq!(Widget::model_name(), "Widget");
        assert!(Widget::scalar_binding().is_none());
    }

    #[test]
    fn generated_accessors_read_and_write_fields() {
        let mut widget = Widget {
            id: 7,
            label: "gasket".to_string(),
            score: None,
            state: WidgetState::Active,
            notes: vec!["unlisted".to_string()],
        };
        let fields = Widget::fields();

        let getter = fields[1].getter().expect("label is readable");
        assert_eq!(getter(&widget), FieldValue::Text("gasket".to_string()));
        let getter = fields[2].getter().expect("score is readable");
        assert_eq!(getter(&widget), FieldValue::Null);

        let setter = fields[0].setter().expect("id is writable");
        setter(&mut widget, FieldValue::I64(11)).expect("should assign");
        assert_eq!(widget.id, 11);
        // The unlisted collection is untouched by the registry.
        assert_eq!(widget.notes.len(), 1);
    }

    #[test]
    fn enum_values_travel_as_discriminants() {
        assert_eq!(WidgetState::Retired.to_value(), FieldValue::I64(9));
        assert_eq!(
            WidgetState::from_value(FieldValue::I64(2)).expect("known discriminant"),
            WidgetState::Active
        );
        let err = WidgetState::from_value(FieldValue::I64(3)).expect_err("unknown");
        assert!(matches!(
            err,
            ConvertError::UnknownVariant {
                enum_name: "WidgetState",
                discriminant: 3
            }
        ));
        let err = WidgetState::from_value(FieldValue::Text("Active".to_string()))
            .expect_err("names are not accepted");
        assert!(matches!(err, ConvertError::TypeMismatch { .. }));
    }
}
