//! Reflective data binding between plain Rust models and SQL commands.
//! This crate is the single source of truth for binding and conversion rules.

pub mod bind;
pub mod convert;
pub mod descriptor;
pub mod dispatch;
pub mod driver;
pub mod logging;
pub mod model;
pub mod value;

pub use bind::{
    bind_map, bind_map_with, bind_model, bind_model_with, bind_none, materialize, materialize_with,
    BindError, BindResult, BoundCommand, Parameter,
};
pub use convert::{
    default_converters, install_converters, ConvertError, ConvertResult, ConverterSet,
    InstallError, ValueConverter,
};
pub use descriptor::{descriptor_of, FieldDescriptor, ModelDescriptor};
pub use dispatch::{
    create_command, execute, query, query_with, DataError, DataResult, Params, Query,
};
pub use driver::{open_file, open_memory};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::{Bindable, FieldSpec, FieldType, ParamMap, ScalarBinding};
pub use value::{FieldValue, ScalarType, SqlValue, StorageClass};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
