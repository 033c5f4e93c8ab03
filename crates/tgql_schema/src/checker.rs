//! Schema checker.
//!
//! Walks every declaration once and records every problem it finds, so a
//! broken schema is reported in one go rather than one error per attempt.

use crate::error::{SchemaError, SchemaErrors};
use crate::registry::{Target, TypeRegistry};
use crate::types::{
    split_optional, FieldDefinition, InputDefinition, OperationCollection, ScalarKind,
    TypeDefinition, VOID,
};

/// Checks declared types and operations against each other.
pub struct SchemaChecker<'a> {
    registry: &'a TypeRegistry,
    operations: &'a OperationCollection,
    errors: Vec<SchemaError>,
}

impl<'a> SchemaChecker<'a> {
    #[must_use]
    pub fn new(registry: &'a TypeRegistry, operations: &'a OperationCollection) -> Self {
        Self {
            registry,
            operations,
            errors: Vec::new(),
        }
    }

    /// Runs every check and returns all errors found.
    pub fn check(mut self) -> Result<(), SchemaErrors> {
        let registry = self.registry;
        for (name, definition) in registry.types() {
            self.check_type_name(name);
            match definition {
                TypeDefinition::Object(object) => {
                    for (field, definition) in object.iter() {
                        self.check_field(name, field, definition);
                    }
                }
                TypeDefinition::Scalar(_) => {
                    // Resolving the scalar's own name walks its alias chain,
                    // which surfaces both bad aliases and cycles.
                    self.check_expr(name, &format!("scalar {name}"), false);
                }
                TypeDefinition::Enum(values) => self.check_enum(name, &values.values),
            }
        }

        let operations = self.operations;
        for (kind, name, definition) in operations.iter() {
            let location = format!("{}.{name}", kind.section());
            self.check_field_name(&location, name);
            if let Some(input) = &definition.input {
                self.check_input(&location, input);
            }
            self.check_expr(&definition.output, &location, true);
        }

        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(SchemaErrors::new(self.errors))
        }
    }

    fn check_type_name(&mut self, name: &str) {
        if ScalarKind::from_name(name).is_some() || name == VOID {
            self.errors.push(SchemaError::DuplicateType { name: name.into() });
        } else if matches!(name, "Query" | "Mutation" | "Subscription") {
            self.errors
                .push(SchemaError::ReservedTypeName { name: name.into() });
        } else if !is_name(name) {
            self.errors.push(SchemaError::InvalidDefinition {
                name: name.into(),
                message: "type names must match [_A-Za-z][_0-9A-Za-z]*".into(),
            });
        }
    }

    fn check_field(&mut self, type_name: &str, field: &str, definition: &FieldDefinition) {
        let location = format!("{type_name}.{}", split_optional(field).0);
        self.check_field_name(&location, field);
        match definition {
            FieldDefinition::Plain(expr) => self.check_expr(expr, &location, false),
            FieldDefinition::WithArguments { input, output } => {
                self.check_input(&location, input);
                self.check_expr(output, &location, false);
            }
        }
    }

    fn check_input(&mut self, location: &str, input: &InputDefinition) {
        for field in input.fields() {
            let location = format!("{location}({})", field.name);
            if !is_name(field.name) {
                self.invalid_field_name(&location, field.name);
            }
            self.check_expr(field.expr, &location, false);
        }
    }

    fn check_field_name(&mut self, location: &str, declared: &str) {
        let (name, _) = split_optional(declared);
        if !is_name(name) {
            self.invalid_field_name(location, name);
        }
    }

    fn invalid_field_name(&mut self, location: &str, name: &str) {
        self.errors.push(SchemaError::InvalidDefinition {
            name: location.into(),
            message: format!("'{name}' is not a valid field name"),
        });
    }

    fn check_expr(&mut self, expr: &str, location: &str, allow_void: bool) {
        match self.registry.resolve(expr, location) {
            Ok(resolved) if resolved.target == Target::Void && !allow_void => {
                self.errors.push(SchemaError::InvalidDefinition {
                    name: location.into(),
                    message: format!("'{VOID}' is only allowed as an operation return type"),
                });
            }
            Ok(_) => {}
            Err(err) => self.errors.push(err),
        }
    }

    fn check_enum(&mut self, name: &str, values: &[String]) {
        if values.is_empty() {
            self.errors.push(SchemaError::InvalidDefinition {
                name: name.into(),
                message: "an enum needs at least one value".into(),
            });
        }
        for (index, value) in values.iter().enumerate() {
            if !is_name(value) {
                self.errors.push(SchemaError::InvalidDefinition {
                    name: name.into(),
                    message: format!("'{value}' is not a valid enum value"),
                });
            } else if values[..index].contains(value) {
                self.errors.push(SchemaError::InvalidDefinition {
                    name: name.into(),
                    message: format!("enum value '{value}' is declared twice"),
                });
            }
        }
    }
}

/// GraphQL name rule: `[_A-Za-z][_0-9A-Za-z]*`.
fn is_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(b'_' | b'a'..=b'z' | b'A'..=b'Z'))
        && bytes.all(|b| b == b'_' || b.is_ascii_alphanumeric())
}

/// Checks a registry and its operations, collecting every error.
pub fn check(registry: &TypeRegistry, operations: &OperationCollection) -> Result<(), SchemaErrors> {
    SchemaChecker::new(registry, operations).check()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        enum_of, ObjectDefinition, OperationDefinition, ScalarDefinition, TypeCollection,
    };

    fn registry(types: Vec<(&str, TypeDefinition)>) -> TypeRegistry {
        let types: TypeCollection = types
            .into_iter()
            .map(|(name, def)| (name.to_owned(), def))
            .collect();
        TypeRegistry::new(types)
    }

    fn object(fields: &[(&str, &str)]) -> TypeDefinition {
        TypeDefinition::Object(fields.iter().copied().collect::<ObjectDefinition>())
    }

    #[test]
    fn test_valid_schema() {
        let reg = registry(vec![
            ("User", object(&[("id", "Int!"), ("posts", "[Post!]!"), ("role", "Role")])),
            ("Post", object(&[("id", "Int!"), ("author", "User!")])),
            ("Role", TypeDefinition::Enum(enum_of(["ADMIN", "USER"]))),
        ]);
        let mut ops = OperationCollection::default();
        ops.query.insert(
            "user".into(),
            OperationDefinition::with_input([("id", "Int!")], "User"),
        );
        ops.mutation
            .insert("logout".into(), OperationDefinition::returns("void"));
        assert!(check(&reg, &ops).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let reg = registry(vec![
            ("Int", object(&[("id", "Int!")])),
            ("User", object(&[("id", "Int!!"), ("posts", "[Post!]!")])),
        ]);
        let mut ops = OperationCollection::default();
        ops.query
            .insert("users".into(), OperationDefinition::returns("[User!"));
        let errors = check(&reg, &ops).unwrap_err();
        let messages: Vec<String> = errors.errors().iter().map(ToString::to_string).collect();
        assert_eq!(
            messages,
            vec![
                "Type 'Int' is already defined",
                "Unexpected character '!' (in User.id)",
                "'Post' is unresolvable (in User.posts)",
                "Missing expected ']' (in Query.users)",
            ]
        );
    }

    #[test]
    fn test_reserved_and_void() {
        let reg = registry(vec![
            ("Query", object(&[("id", "Int!")])),
            ("User", object(&[("nothing", "void")])),
        ]);
        let errors = check(&reg, &OperationCollection::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains(|e| matches!(e, SchemaError::ReservedTypeName { .. })));
        assert!(errors.contains(|e| matches!(
            e,
            SchemaError::InvalidDefinition { name, .. } if name == "User.nothing"
        )));
    }

    #[test]
    fn test_alias_cycle_reported() {
        let alias = |target: &str| {
            TypeDefinition::Scalar(ScalarDefinition {
                alias: target.into(),
                codec: None,
            })
        };
        let reg = registry(vec![("A", alias("B")), ("B", alias("A"))]);
        let errors = check(&reg, &OperationCollection::default()).unwrap_err();
        assert!(errors
            .errors()
            .iter()
            .all(|e| matches!(e, SchemaError::ResolutionDepthExceeded { .. })));
    }

    #[test]
    fn test_field_arguments_checked() {
        let reg = registry(vec![(
            "User",
            TypeDefinition::Object(ObjectDefinition::new().field_with_args(
                "friends",
                [("first?", "Int!"), ("after", "Cursor")].into_iter().collect(),
                "[User!]!",
            )),
        )]);
        let errors = check(&reg, &OperationCollection::default()).unwrap_err();
        assert_eq!(
            errors.errors()[0].to_string(),
            "'Cursor' is unresolvable (in User.friends(after))"
        );
    }

    #[test]
    fn test_enum_values() {
        let reg = registry(vec![("Role", TypeDefinition::Enum(enum_of(["A", "A", "b-c"])))]);
        let errors = check(&reg, &OperationCollection::default()).unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
