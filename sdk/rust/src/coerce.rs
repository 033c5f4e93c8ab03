//! Applying custom scalar codecs to variables and results.
//!
//! Values are walked alongside their declared type: lists item by item,
//! objects field by field using the registry's field types. Wherever the
//! type resolves through a custom scalar with a codec, the codec converts the
//! value. Keys the schema does not know pass through untouched.

use serde_json::{Map, Value};
use tgql_schema::{OperationDescriptor, Target, TypeRegistry};

use crate::error::{ErrorCode, SdkError, SdkResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Caller value to wire value.
    Serialize,
    /// Wire value to caller value.
    Parse,
}

/// Serializes an operation's input variables.
pub fn serialize_variables(
    registry: &TypeRegistry,
    descriptor: &OperationDescriptor,
    variables: Map<String, Value>,
) -> SdkResult<Map<String, Value>> {
    variables
        .into_iter()
        .map(|(name, value)| {
            let value = match descriptor.input_type(&name) {
                Some(expr) => walk(registry, expr, value, Direction::Serialize)?,
                None => value,
            };
            Ok((name, value))
        })
        .collect()
}

/// Parses a response value of type `expr`.
pub fn parse_output(registry: &TypeRegistry, expr: &str, value: Value) -> SdkResult<Value> {
    walk(registry, expr, value, Direction::Parse)
}

fn walk(registry: &TypeRegistry, expr: &str, value: Value, direction: Direction) -> SdkResult<Value> {
    if value.is_null() {
        return Ok(value);
    }
    let resolved = registry.resolve(expr, expr)?;

    let value = match (resolved.element.as_deref(), value) {
        (Some(element), Value::Array(items)) => {
            return items
                .into_iter()
                .map(|item| walk(registry, element, item, direction))
                .collect::<SdkResult<Vec<_>>>()
                .map(Value::Array);
        }
        (_, value) => value,
    };

    match (&resolved.target, value) {
        (Target::Object(name), Value::Object(fields)) => {
            let Some(object) = registry.object(name) else {
                return Ok(Value::Object(fields));
            };
            fields
                .into_iter()
                .map(|(key, value)| {
                    let value = match object.get(&key) {
                        Some(field) => walk(registry, field.output(), value, direction)?,
                        None => value,
                    };
                    Ok((key, value))
                })
                .collect::<SdkResult<Map<_, _>>>()
                .map(Value::Object)
        }
        (_, value) => match registry.codec_for(&resolved) {
            Some(codec) => {
                let converted = match direction {
                    Direction::Serialize => codec.serialize_value(value),
                    Direction::Parse => codec.parse_value(value),
                };
                converted.map_err(|message| {
                    let verb = match direction {
                        Direction::Serialize => "serialize",
                        Direction::Parse => "parse",
                    };
                    SdkError::new(
                        ErrorCode::ScalarError,
                        format!("Cannot {verb} '{}': {message}", resolved.declared.core),
                    )
                })
            }
            None => Ok(value),
        },
    }
}
