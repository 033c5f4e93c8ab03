//! Loading the JSON literal form of a schema.
//!
//! The literal mirrors how schemas are written by hand:
//!
//! - a string value declares a custom scalar aliasing that type expression;
//! - `{"__graphQLType": "enum", "values": [...]}` declares an enum;
//! - any other object declares an object type. A field is either a type
//!   expression or an `[input, output]` pair for fields taking arguments;
//! - `Query`, `Mutation` and `Subscription` hold operations, each shaped
//!   `["=>", T]` or `[input, "=>", T]`.

use serde_json::{Map, Value};

use crate::error::SchemaError;
use crate::schema::SchemaBuilder;
use crate::types::{
    EnumDefinition, FieldDefinition, InputDefinition, ObjectDefinition, OperationDefinition,
    OperationKind, ScalarDefinition, TypeDefinition,
};

/// Marker key distinguishing enum declarations from object types.
pub const GRAPHQL_TYPE_KEY: &str = "__graphQLType";

const ARROW: &str = "=>";

impl SchemaBuilder {
    /// Reads declarations from the JSON literal form. Shape problems are
    /// recorded and reported by [`SchemaBuilder::build`].
    #[must_use]
    pub fn from_json(document: &Value) -> Self {
        let mut builder = Self::default();
        let Value::Object(entries) = document else {
            builder.errors.push(SchemaError::InvalidDefinition {
                name: "<schema>".into(),
                message: format!("expected an object, found {}", describe(document)),
            });
            return builder;
        };

        for (name, value) in entries {
            if let Some(kind) = OperationKind::from_section(name) {
                builder.read_section(kind, value);
                continue;
            }
            match read_type(name, value) {
                Ok(definition) => builder.declare(name.clone(), definition),
                Err(err) => builder.errors.push(err),
            }
        }
        builder
    }

    fn read_section(&mut self, kind: OperationKind, value: &Value) {
        let Value::Object(operations) = value else {
            self.errors.push(SchemaError::InvalidDefinition {
                name: kind.section().into(),
                message: format!("expected an object of operations, found {}", describe(value)),
            });
            return;
        };
        for (name, signature) in operations {
            match read_operation(kind, name, signature) {
                Ok(definition) => self.declare_operation(kind, name.clone(), definition),
                Err(err) => self.errors.push(err),
            }
        }
    }
}

fn read_type(name: &str, value: &Value) -> Result<TypeDefinition, SchemaError> {
    match value {
        Value::String(alias) => Ok(TypeDefinition::Scalar(ScalarDefinition {
            alias: alias.clone(),
            codec: None,
        })),
        Value::Object(fields) if fields.contains_key(GRAPHQL_TYPE_KEY) => read_enum(name, fields),
        Value::Object(fields) => read_object(name, fields).map(TypeDefinition::Object),
        other => Err(SchemaError::InvalidDefinition {
            name: name.into(),
            message: format!(
                "type definitions must be strings or objects, found {}",
                describe(other)
            ),
        }),
    }
}

fn read_enum(name: &str, fields: &Map<String, Value>) -> Result<TypeDefinition, SchemaError> {
    let invalid = |message: &str| SchemaError::InvalidDefinition {
        name: name.into(),
        message: message.into(),
    };
    if fields.get(GRAPHQL_TYPE_KEY).and_then(Value::as_str) != Some("enum") {
        return Err(invalid("only \"enum\" is supported as __graphQLType"));
    }
    let Some(Value::Array(values)) = fields.get("values") else {
        return Err(invalid("an enum needs a \"values\" array"));
    };
    let values = values
        .iter()
        .map(|v| v.as_str().map(str::to_owned))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| invalid("enum values must be strings"))?;
    Ok(TypeDefinition::Enum(EnumDefinition { values }))
}

fn read_object(name: &str, fields: &Map<String, Value>) -> Result<ObjectDefinition, SchemaError> {
    let mut object = ObjectDefinition::new();
    for (field, value) in fields {
        let definition = match value {
            Value::String(expr) => FieldDefinition::Plain(expr.clone()),
            Value::Array(pair) => match pair.as_slice() {
                [input, Value::String(output)] => FieldDefinition::WithArguments {
                    input: read_input(&format!("{name}.{field}"), input)?,
                    output: output.clone(),
                },
                _ => {
                    return Err(SchemaError::InvalidDefinition {
                        name: format!("{name}.{field}"),
                        message: "a field with arguments must be an [input, output] pair".into(),
                    })
                }
            },
            other => {
                return Err(SchemaError::InvalidDefinition {
                    name: format!("{name}.{field}"),
                    message: format!(
                        "expected a type expression or an [input, output] pair, found {}",
                        describe(other)
                    ),
                })
            }
        };
        object.insert(field.clone(), definition);
    }
    Ok(object)
}

fn read_input(location: &str, value: &Value) -> Result<InputDefinition, SchemaError> {
    let invalid = |message: String| SchemaError::InvalidDefinition {
        name: location.into(),
        message,
    };
    let Value::Object(fields) = value else {
        return Err(invalid(format!(
            "input must be an object of type expressions, found {}",
            describe(value)
        )));
    };
    fields
        .iter()
        .map(|(field, expr)| match expr {
            Value::String(expr) => Ok((field.clone(), expr.clone())),
            other => Err(invalid(format!(
                "input field '{field}' must be a type expression, found {}",
                describe(other)
            ))),
        })
        .collect()
}

fn read_operation(
    kind: OperationKind,
    name: &str,
    signature: &Value,
) -> Result<OperationDefinition, SchemaError> {
    let shape_error = || SchemaError::InvalidOperation {
        section: kind.section().into(),
        name: name.into(),
        message: "must be `['=>', T]` or `[I, '=>', T]`".into(),
    };
    let Value::Array(parts) = signature else {
        return Err(shape_error());
    };
    match parts.as_slice() {
        [Value::String(arrow), Value::String(output)] if arrow == ARROW => {
            Ok(OperationDefinition::returns(output.clone()))
        }
        [input @ Value::Object(_), Value::String(arrow), Value::String(output)] if arrow == ARROW => {
            let location = format!("{}.{name}", kind.section());
            let input = read_input(&location, input)?;
            Ok(OperationDefinition {
                input: Some(input),
                output: output.clone(),
            })
        }
        _ => Err(shape_error()),
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
