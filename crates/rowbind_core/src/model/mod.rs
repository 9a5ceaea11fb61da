//! Bindable model contracts: field registries and per-scalar typed access.
//!
//! # Responsibility
//! - Define `Bindable`, the declared-field registry a descriptor is built from.
//! - Define `FieldType`, the per-scalar bridge between Rust types and
//!   `FieldValue`, including the `Option` nullable form.
//! - Provide scalar `Bindable` impls so plain values work as query targets.
//!
//! # Invariants
//! - Field declaration order is preserved end to end; it fixes parameter order.
//! - A scalar model reports no fields and carries a `ScalarBinding` instead.
//! - `Option<T>` unwraps to `T`'s scalar kind; absence travels as
//!   `FieldValue::Null`.

mod macros;
pub mod params;

pub use params::ParamMap;

use crate::convert::{ConvertError, ConvertResult};
use crate::value::{FieldValue, ScalarType};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use semver::Version;
use url::Url;
use uuid::Uuid;

/// A model type the engine can bind to parameters and materialize from rows.
///
/// Composite models declare their fields through [`bind_fields!`]; scalar
/// kinds (integers, text, identifiers and their `Option` forms) have built-in
/// impls and report a [`ScalarBinding`] instead of fields.
///
/// [`bind_fields!`]: crate::bind_fields
pub trait Bindable: Default + Sized + 'static {
    /// Name used in descriptors, logs and error messages.
    fn model_name() -> &'static str;

    /// Declared bindable fields, in declaration order.
    fn fields() -> Vec<FieldSpec<Self>>;

    /// Scalar construction rule for single-value models; `None` for
    /// composites.
    fn scalar_binding() -> Option<ScalarBinding<Self>> {
        None
    }
}

/// Read-path rule for a scalar model: its kind plus a fallible constructor
/// from a converted value.
pub struct ScalarBinding<T> {
    pub kind: ScalarType,
    pub from_value: fn(FieldValue) -> ConvertResult<T>,
}

impl<T> Clone for ScalarBinding<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ScalarBinding<T> {}

/// One declared field: name, semantic kind, and its accessors.
///
/// A field with no getter is skipped by the write path; one with no setter is
/// skipped by the read path.
pub struct FieldSpec<T> {
    name: &'static str,
    semantic: ScalarType,
    get: Option<fn(&T) -> FieldValue>,
    set: Option<fn(&mut T, FieldValue) -> ConvertResult<()>>,
}

impl<T> FieldSpec<T> {
    /// Field readable and writable through the given accessors.
    pub fn new(
        name: &'static str,
        semantic: ScalarType,
        get: fn(&T) -> FieldValue,
        set: fn(&mut T, FieldValue) -> ConvertResult<()>,
    ) -> Self {
        Self {
            name,
            semantic,
            get: Some(get),
            set: Some(set),
        }
    }

    /// Field bound as a parameter but never materialized.
    pub fn read_only(name: &'static str, semantic: ScalarType, get: fn(&T) -> FieldValue) -> Self {
        Self {
            name,
            semantic,
            get: Some(get),
            set: None,
        }
    }

    /// Field materialized from rows but never bound as a parameter.
    pub fn write_only(
        name: &'static str,
        semantic: ScalarType,
        set: fn(&mut T, FieldValue) -> ConvertResult<()>,
    ) -> Self {
        Self {
            name,
            semantic,
            get: None,
            set: Some(set),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn semantic(&self) -> ScalarType {
        self.semantic
    }

    pub fn getter(&self) -> Option<fn(&T) -> FieldValue> {
        self.get
    }

    pub fn setter(&self) -> Option<fn(&mut T, FieldValue) -> ConvertResult<()>> {
        self.set
    }

    pub fn is_readable(&self) -> bool {
        self.get.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }
}

/// Per-scalar bridge between a Rust type and `FieldValue`.
pub trait FieldType: Sized {
    /// Semantic kind declared for fields of this type.
    const SCALAR: ScalarType;

    fn to_value(&self) -> FieldValue;

    fn from_value(value: FieldValue) -> ConvertResult<Self>;
}

macro_rules! impl_field_type_copy {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl FieldType for $ty {
            const SCALAR: ScalarType = ScalarType::$kind;

            fn to_value(&self) -> FieldValue {
                FieldValue::$kind(*self)
            }

            fn from_value(value: FieldValue) -> ConvertResult<Self> {
                match value {
                    FieldValue::$kind(inner) => Ok(inner),
                    other => Err(ConvertError::TypeMismatch {
                        semantic: Self::SCALAR,
                        found: other.kind_name(),
                    }),
                }
            }
        }
    )*};
}

impl_field_type_copy!(
    bool => Bool,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    f32 => F32,
    f64 => F64,
    Decimal => Decimal,
    char => Char,
    Uuid => Uuid,
    NaiveDateTime => DateTime,
);

impl FieldType for String {
    const SCALAR: ScalarType = ScalarType::Text;

    fn to_value(&self) -> FieldValue {
        FieldValue::Text(self.clone())
    }

    fn from_value(value: FieldValue) -> ConvertResult<Self> {
        match value {
            FieldValue::Text(inner) => Ok(inner),
            other => Err(ConvertError::TypeMismatch {
                semantic: Self::SCALAR,
                found: other.kind_name(),
            }),
        }
    }
}

impl FieldType for Url {
    const SCALAR: ScalarType = ScalarType::Uri;

    fn to_value(&self) -> FieldValue {
        FieldValue::Uri(self.clone())
    }

    fn from_value(value: FieldValue) -> ConvertResult<Self> {
        match value {
            FieldValue::Uri(inner) => Ok(inner),
            other => Err(ConvertError::TypeMismatch {
                semantic: Self::SCALAR,
                found: other.kind_name(),
            }),
        }
    }
}

impl FieldType for Version {
    const SCALAR: ScalarType = ScalarType::Version;

    fn to_value(&self) -> FieldValue {
        FieldValue::Version(self.clone())
    }

    fn from_value(value: FieldValue) -> ConvertResult<Self> {
        match value {
            FieldValue::Version(inner) => Ok(inner),
            other => Err(ConvertError::TypeMismatch {
                semantic: Self::SCALAR,
                found: other.kind_name(),
            }),
        }
    }
}

impl<T: FieldType> FieldType for Option<T> {
    const SCALAR: ScalarType = T::SCALAR;

    fn to_value(&self) -> FieldValue {
        match self {
            Some(inner) => inner.to_value(),
            None => FieldValue::Null,
        }
    }

    fn from_value(value: FieldValue) -> ConvertResult<Self> {
        if value.is_null() {
            return Ok(None);
        }
        T::from_value(value).map(Some)
    }
}

macro_rules! impl_scalar_bindable {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl Bindable for $ty {
            fn model_name() -> &'static str {
                $name
            }

            fn fields() -> Vec<FieldSpec<Self>> {
                Vec::new()
            }

            fn scalar_binding() -> Option<ScalarBinding<Self>> {
                Some(ScalarBinding {
                    kind: <$ty as FieldType>::SCALAR,
                    from_value: <$ty as FieldType>::from_value,
                })
            }
        }

        impl Bindable for Option<$ty> {
            fn model_name() -> &'static str {
                concat!("Option<", $name, ">")
            }

            fn fields() -> Vec<FieldSpec<Self>> {
                Vec::new()
            }

            fn scalar_binding() -> Option<ScalarBinding<Self>> {
                Some(ScalarBinding {
                    kind: <$ty as FieldType>::SCALAR,
                    from_value: <Option<$ty> as FieldType>::from_value,
                })
            }
        }
    )*};
}

impl_scalar_bindable!(
    bool => "bool",
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
    f32 => "f32",
    f64 => "f64",
    Decimal => "Decimal",
    char => "char",
    String => "String",
    Uuid => "Uuid",
    NaiveDateTime => "NaiveDateTime",
);

// `Url` and `Version` carry no default value, so only their `Option` forms
// act as scalar query targets.
macro_rules! impl_optional_scalar_bindable {
    ($($ty:ty => $name:literal),* $(,)?) => {$(
        impl Bindable for Option<$ty> {
            fn model_name() -> &'static str {
                concat!("Option<", $name, ">")
            }

            fn fields() -> Vec<FieldSpec<Self>> {
                Vec::new()
            }

            fn scalar_binding() -> Option<ScalarBinding<Self>> {
                Some(ScalarBinding {
                    kind: <$ty as FieldType>::SCALAR,
                    from_value: <Option<$ty> as FieldType>::from_value,
                })
            }
        }
    )*};
}

impl_optional_scalar_bindable!(
    Url => "Url",
    Version => "Version",
);

#[cfg(test)]
mod tests {
    use super::{Bindable, FieldSpec, FieldType, FieldValue, ScalarType};
    use crate::convert::ConvertError;
    use semver::Version;
    use url::Url;
    use uuid::Uuid;

    #[test]
    fn field_type_round_trips_exact_variants() {
        let id = Uuid::new_v4();
        assert_eq!(id.to_value(), FieldValue::Uuid(id));
        assert_eq!(Uuid::from_value(FieldValue::Uuid(id)).expect("same variant"), id);
        let err = i32::from_value(FieldValue::I64(1)).expect_err("wrong width");
        assert!(matches!(
            err,
            ConvertError::TypeMismatch {
                semantic: ScalarType::I32,
                found: "i64"
            }
        ));
    }

    #[test]
    fn option_field_type_maps_null_to_none() {
        assert_eq!(Option::<i64>::from_value(FieldValue::Null).expect("null"), None);
        assert_eq!(
            Option::<i64>::from_value(FieldValue::I64(9)).expect("value"),
            Some(9)
        );
        assert_eq!(Some(9i64).to_value(), FieldValue::I64(9));
        assert_eq!(Option::<i64>::None.to_value(), FieldValue::Null);
    }

    #[test]
    fn one_way_fields_report_their_direction() {
        let readable: FieldSpec<(i64,)> =
            FieldSpec::read_only("total", ScalarType::I64, |model| model.0.to_value());
        assert!(readable.is_readable());
        assert!(!readable.is_writable());

        let writable: FieldSpec<(i64,)> =
            FieldSpec::write_only("total", ScalarType::I64, |model, value| {
                model.0 = i64::from_value(value)?;
                Ok(())
            });
        assert!(!writable.is_readable());
        assert!(writable.is_writable());
    }

    #[test]
    fn scalar_bindables_carry_a_binding_and_no_fields() {
        assert!(i64::fields().is_empty());
        let binding = i64::scalar_binding().expect("scalar kind");
        assert_eq!(binding.kind, ScalarType::I64);
        assert_eq!((binding.from_value)(FieldValue::I64(5)).expect("construct"), 5);

        let optional = Option::<String>::scalar_binding().expect("scalar kind");
        assert_eq!(optional.kind, ScalarType::Text);
        assert_eq!(Option::<String>::model_name(), "Option<String>");
        assert_eq!(
            (optional.from_value)(FieldValue::Null).expect("null maps to none"),
            None
        );
    }

    #[test]
    fn identifier_types_bridge_their_variants() {
        let manual = Url::parse("https://example.org/manual").expect("literal url");
        assert_eq!(manual.to_value(), FieldValue::Uri(manual.clone()));
        assert_eq!(
            Url::from_value(FieldValue::Uri(manual.clone())).expect("same variant"),
            manual
        );

        let firmware = Version::new(1, 4, 2);
        assert_eq!(firmware.to_value(), FieldValue::Version(firmware.clone()));
        let err = Version::from_value(FieldValue::Text("1.4.2".to_string()))
            .expect_err("text is not a parsed version");
        assert!(matches!(
            err,
            ConvertError::TypeMismatch {
                semantic: ScalarType::Version,
                found: "text"
            }
        ));

        let optional = Option::<Url>::scalar_binding().expect("scalar kind");
        assert_eq!(optional.kind, ScalarType::Uri);
        assert_eq!(Option::<Url>::model_name(), "Option<Url>");
        assert_eq!(
            (optional.from_value)(FieldValue::Null).expect("null maps to none"),
            None
        );
        let built = Option::<Version>::scalar_binding().expect("scalar kind");
        assert_eq!(built.kind, ScalarType::Version);
    }
}
