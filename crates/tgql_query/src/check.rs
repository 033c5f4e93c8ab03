//! Checking selections against the schema.
//!
//! Selections are built from strings, so a typo only shows up here. The
//! checks mirror what a GraphQL server would reject: unknown fields, objects
//! without sub-selections, scalars with them, and missing or unknown
//! arguments.

use serde_json::Value;
use tgql_schema::{FieldDefinition, SchemaError, SchemaResult, TypeRegistry};

use crate::node::QueryNode;

/// Checks `nodes` as the selection of `parent.field`, whose type is `type_expr`.
///
/// For an operation, `parent` is the section name and `field` the operation
/// name, e.g. `check_selection(registry, "Query", "user", "User", &nodes)`.
pub fn check_selection(
    registry: &TypeRegistry,
    parent: &str,
    field: &str,
    type_expr: &str,
    nodes: &[QueryNode],
) -> SchemaResult<()> {
    let location = format!("{parent}.{field}");
    let resolved = registry.resolve(type_expr, &location)?;
    match resolved.object_name() {
        Some(_) if nodes.is_empty() => Err(SchemaError::MissingSelection {
            type_name: parent.into(),
            field: field.into(),
        }),
        Some(object) => check_object(registry, object, nodes),
        None if nodes.is_empty() => Ok(()),
        None => Err(SchemaError::UnexpectedSelection {
            type_name: parent.into(),
            field: field.into(),
        }),
    }
}

fn check_object(registry: &TypeRegistry, type_name: &str, nodes: &[QueryNode]) -> SchemaResult<()> {
    let object = registry
        .object(type_name)
        .ok_or_else(|| SchemaError::NotAnObject {
            type_name: type_name.into(),
        })?;

    for node in nodes {
        let definition = object
            .get(&node.key)
            .ok_or_else(|| SchemaError::UnknownField {
                type_name: type_name.into(),
                field: node.key.clone(),
            })?;
        check_arguments(type_name, node, definition)?;

        match &node.children {
            Some(children) => {
                check_selection(registry, type_name, &node.key, definition.output(), children)?;
            }
            None => {
                let location = format!("{type_name}.{}", node.key);
                if !registry.resolve(definition.output(), &location)?.is_terminal() {
                    return Err(SchemaError::MissingSelection {
                        type_name: type_name.into(),
                        field: node.key.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

fn check_arguments(
    type_name: &str,
    node: &QueryNode,
    definition: &FieldDefinition,
) -> SchemaResult<()> {
    let invalid = |message: String| SchemaError::InvalidArguments {
        type_name: type_name.into(),
        field: node.key.clone(),
        message,
    };

    let declared = match (definition.arguments(), &node.arguments) {
        (None, None) => return Ok(()),
        (None, Some(_)) => return Err(invalid("the field takes no arguments".into())),
        (Some(declared), _) => declared,
    };

    let empty = serde_json::Map::new();
    let given = match &node.arguments {
        None => &empty,
        Some(Value::Object(given)) => given,
        Some(other) => {
            return Err(invalid(format!(
                "arguments must be a JSON object, found {other}"
            )))
        }
    };

    for name in given.keys() {
        if declared.get(name).is_none() {
            return Err(invalid(format!("unknown argument '{name}'")));
        }
    }
    if let Some(missing) = declared.required().find(|name| !given.contains_key(*name)) {
        return Err(SchemaError::MissingArgument {
            type_name: type_name.into(),
            field: node.key.clone(),
            argument: missing.into(),
        });
    }
    Ok(())
}
