//! Write path: a model instance or parameter map into a bound command.
//!
//! # Responsibility
//! - Turn every readable bindable field into one named `@` parameter, in
//!   descriptor order.
//! - Turn map entries into parameters after identifier validation.
//!
//! # Invariants
//! - Parameter order is deterministic; callers reference parameters by name.
//! - Scalar models bind no parameters at all.
//! - An empty statement text never reaches a driver.

use super::{BindError, BindResult};
use crate::convert::{default_converters, ConverterSet};
use crate::descriptor::descriptor_of;
use crate::model::{Bindable, ParamMap};
use crate::value::SqlValue;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

/// Bare identifier rule for map-supplied parameter names.
static PARAM_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid parameter name regex"));

/// Model name used in errors for map-bound parameters.
const MAP_MODEL_NAME: &str = "ParamMap";

/// One named command parameter carrying a storage-safe value.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    value: SqlValue,
}

impl Parameter {
    /// Placeholder name including the `@` prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &SqlValue {
        &self.value
    }
}

/// Ephemeral parameterized command: SQL text plus named parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCommand {
    sql: String,
    parameters: Vec<Parameter>,
}

impl BoundCommand {
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters in binding order.
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Looks up a parameter value by name, with or without the `@` prefix.
    pub fn parameter(&self, name: &str) -> Option<&SqlValue> {
        let bare = name.trim_start_matches('@');
        self.parameters
            .iter()
            .find(|parameter| &parameter.name[1..] == bare)
            .map(|parameter| &parameter.value)
    }
}

pub(crate) fn ensure_statement(sql: &str) -> BindResult<()> {
    if sql.is_empty() {
        return Err(BindError::MissingStatement);
    }
    Ok(())
}

/// Binds a parameterless command.
pub fn bind_none(sql: &str) -> BindResult<BoundCommand> {
    ensure_statement(sql)?;
    Ok(BoundCommand {
        sql: sql.to_string(),
        parameters: Vec::new(),
    })
}

/// Binds a command from a model instance using the process-default
/// converter set.
pub fn bind_model<T: Bindable>(sql: &str, model: &T) -> BindResult<BoundCommand> {
    bind_model_with(sql, model, default_converters())
}

/// Binds a command from a model instance using an explicit converter set.
///
/// Every readable field becomes one parameter named `@` + field name, in
/// declaration order. Scalar models short-circuit to a parameterless command;
/// they are meaningful on the read path only.
pub fn bind_model_with<T: Bindable>(
    sql: &str,
    model: &T,
    converters: &ConverterSet,
) -> BindResult<BoundCommand> {
    ensure_statement(sql)?;
    let descriptor = descriptor_of::<T>();
    if descriptor.is_scalar() {
        return Ok(BoundCommand {
            sql: sql.to_string(),
            parameters: Vec::new(),
        });
    }

    let mut parameters = Vec::with_capacity(descriptor.fields().len());
    for field in descriptor.fields() {
        let Some(getter) = field.getter() else {
            continue;
        };
        let converter =
            converters
                .find(field.semantic())
                .ok_or_else(|| BindError::UnsupportedFieldType {
                    model: descriptor.model_name(),
                    field: field.name().to_string(),
                    semantic: field.semantic(),
                })?;
        let value = converter
            .write_value(field.semantic(), getter(model))
            .map_err(|source| BindError::FieldConversion {
                model: descriptor.model_name(),
                field: field.name().to_string(),
                semantic: field.semantic(),
                source,
            })?;
        parameters.push(Parameter {
            name: format!("@{}", field.name()),
            value,
        });
    }
    debug!(
        "event=bind_model model={} parameters={}",
        descriptor.model_name(),
        parameters.len()
    );
    Ok(BoundCommand {
        sql: sql.to_string(),
        parameters,
    })
}

/// Binds a command from a parameter map using the process-default
/// converter set.
pub fn bind_map(sql: &str, params: &ParamMap) -> BindResult<BoundCommand> {
    bind_map_with(sql, params, default_converters())
}

/// Binds a command from a parameter map using an explicit converter set.
///
/// Each entry's semantic kind is taken from its value; null entries bind as
/// SQL NULL directly.
pub fn bind_map_with(
    sql: &str,
    params: &ParamMap,
    converters: &ConverterSet,
) -> BindResult<BoundCommand> {
    ensure_statement(sql)?;
    let mut parameters = Vec::with_capacity(params.len());
    for (name, value) in params.iter() {
        if !PARAM_NAME_RE.is_match(name) {
            return Err(BindError::InvalidParameterName(name.to_string()));
        }
        let converted = match value.scalar_type() {
            None => SqlValue::Null,
            Some(semantic) => {
                let converter =
                    converters
                        .find(semantic)
                        .ok_or_else(|| BindError::UnsupportedFieldType {
                            model: MAP_MODEL_NAME,
                            field: name.to_string(),
                            semantic,
                        })?;
                converter
                    .write_value(semantic, value.clone())
                    .map_err(|source| BindError::FieldConversion {
                        model: MAP_MODEL_NAME,
                        field: name.to_string(),
                        semantic,
                        source,
                    })?
            }
        };
        parameters.push(Parameter {
            name: format!("@{name}"),
            value: converted,
        });
    }
    Ok(BoundCommand {
        sql: sql.to_string(),
        parameters,
    })
}

#[cfg(test)]
mod tests {
    use super::{bind_map, bind_map_with, bind_model, bind_model_with, bind_none};
    use crate::bind::BindError;
    use crate::convert::ConverterSet;
    use crate::model::ParamMap;
    use crate::value::{ScalarType, SqlValue};
    use uuid::Uuid;

    #[derive(Debug, Default)]
    struct Invoice {
        id: Uuid,
        total_cents: i64,
        reference: Option<String>,
        paid: bool,
    }

    crate::bind_fields!(Invoice {
        id: Uuid,
        total_cents: i64,
        reference: Option<String>,
        paid: bool,
    });

    #[test]
    fn model_fields_bind_in_declaration_order() {
        let invoice = Invoice {
            id: Uuid::nil(),
            total_cents: 1250,
            reference: None,
            paid: true,
        };
        let command = bind_model("INSERT INTO invoices VALUES (@id, @total_cents, @reference, @paid)", &invoice)
            .expect("should bind");

        let names: Vec<&str> = command
            .parameters()
            .iter()
            .map(|parameter| parameter.name())
            .collect();
        assert_eq!(names, vec!["@id", "@total_cents", "@reference", "@paid"]);
        assert_eq!(
            command.parameter("@id"),
            Some(&SqlValue::Text(Uuid::nil().to_string()))
        );
        assert_eq!(command.parameter("total_cents"), Some(&SqlValue::Integer(1250)));
        assert_eq!(command.parameter("reference"), Some(&SqlValue::Null));
        assert_eq!(command.parameter("paid"), Some(&SqlValue::Integer(1)));
        assert_eq!(command.parameter("missing"), None);
    }

    #[test]
    fn scalar_models_bind_no_parameters() {
        let command = bind_model("SELECT COUNT(*) FROM invoices", &0i64).expect("should bind");
        assert!(command.parameters().is_empty());
    }

    #[test]
    fn empty_statement_is_a_contract_violation() {
        let err = bind_none("").expect_err("empty sql should fail");
        assert!(matches!(err, BindError::MissingStatement));
        // A bare semicolon is still a statement.
        assert!(bind_none(";").is_ok());
    }

    #[test]
    fn map_binding_produces_exactly_the_given_parameters() {
        let key = Uuid::new_v4();
        let mut params = ParamMap::new();
        params.insert("@Id", key);
        let command =
            bind_map("SELECT * FROM invoices WHERE id = @Id", &params).expect("should bind");
        assert_eq!(command.parameters().len(), 1);
        assert_eq!(command.parameters()[0].name(), "@Id");
        assert_eq!(
            command.parameter("Id"),
            Some(&SqlValue::Text(key.to_string()))
        );
    }

    #[test]
    fn map_names_must_be_identifiers() {
        let mut params = ParamMap::new();
        params.insert("bad name", 1i64);
        let err = bind_map("SELECT @bad", &params).expect_err("space should fail");
        assert!(matches!(err, BindError::InvalidParameterName(name) if name == "bad name"));
    }

    #[test]
    fn missing_converter_is_a_programming_error() {
        let empty = ConverterSet::new();
        let invoice = Invoice::default();
        let err = bind_model_with("INSERT", &invoice, &empty).expect_err("no converters");
        assert!(matches!(
            err,
            BindError::UnsupportedFieldType {
                model: "Invoice",
                semantic: ScalarType::Uuid,
                ..
            }
        ));

        let mut params = ParamMap::new();
        params.insert("flag", true);
        let err = bind_map_with("SELECT @flag", &params, &empty).expect_err("no converters");
        assert!(matches!(err, BindError::UnsupportedFieldType { .. }));
    }

    #[test]
    fn map_null_entries_bind_as_sql_null() {
        let mut params = ParamMap::new();
        params.insert("gone", Option::<i64>::None);
        let command = bind_map("UPDATE invoices SET reference = @gone", &params)
            .expect("should bind");
        assert_eq!(command.parameter("gone"), Some(&SqlValue::Null));
    }
}
