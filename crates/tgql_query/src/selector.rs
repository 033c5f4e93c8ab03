//! Building selection trees.
//!
//! A selector is a closure that receives a [`SelectorBuilder`] and returns
//! the fields it picks:
//!
//! ```
//! use tgql_query::{parse_selector, SelectorBuilder};
//!
//! let nodes = parse_selector(|user: &SelectorBuilder| {
//!     vec![
//!         user.field("id"),
//!         user.nested("posts", |post| vec![post.field("title")]),
//!     ]
//! });
//! assert_eq!(nodes.len(), 2);
//! ```

use serde_json::Value;
use tgql_schema::types::split_optional;
use tgql_schema::{SchemaError, SchemaResult, TypeRegistry};

use crate::node::QueryNode;

/// Hands out field nodes to a selector closure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectorBuilder {
    _private: (),
}

impl SelectorBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }

    /// Picks a leaf field.
    #[must_use]
    pub fn field(&self, key: &str) -> QueryNode {
        QueryNode::leaf(key)
    }

    /// Picks a leaf field with arguments.
    #[must_use]
    pub fn field_with(&self, key: &str, arguments: Value) -> QueryNode {
        QueryNode::leaf(key).with_arguments(arguments)
    }

    /// Picks an object field; `selector` chooses its sub-fields.
    pub fn nested<F>(&self, key: &str, selector: F) -> QueryNode
    where
        F: FnOnce(&SelectorBuilder) -> Vec<QueryNode>,
    {
        QueryNode::object(key, parse_selector(selector))
    }

    /// Picks an object field with arguments.
    pub fn nested_with<F>(&self, key: &str, arguments: Value, selector: F) -> QueryNode
    where
        F: FnOnce(&SelectorBuilder) -> Vec<QueryNode>,
    {
        self.nested(key, selector).with_arguments(arguments)
    }
}

/// Runs a selector against a fresh builder.
pub fn parse_selector<F>(selector: F) -> Vec<QueryNode>
where
    F: FnOnce(&SelectorBuilder) -> Vec<QueryNode>,
{
    selector(&SelectorBuilder::new())
}

/// Selects every field reachable from `type_expr`.
///
/// Terminal types yield an empty selection. Object fields are expanded
/// recursively. Fields that take arguments are included without arguments
/// when all of them are optional; a required argument makes the whole
/// selection fail, as does a type that refers back to itself.
pub fn all_fields(registry: &TypeRegistry, type_expr: &str) -> SchemaResult<Vec<QueryNode>> {
    let resolved = registry.resolve(type_expr, type_expr)?;
    match resolved.object_name() {
        Some(name) => {
            let mut walker = AllFields {
                registry,
                types: vec![name.to_owned()],
                path: vec![name.to_owned()],
            };
            walker.select(name)
        }
        None => Ok(Vec::new()),
    }
}

/// Like [`all_fields`], packaged as a reusable selector.
pub fn all_selector(
    registry: &TypeRegistry,
    type_expr: &str,
) -> SchemaResult<impl Fn(&SelectorBuilder) -> Vec<QueryNode>> {
    let nodes = all_fields(registry, type_expr)?;
    Ok(move |_: &SelectorBuilder| nodes.clone())
}

struct AllFields<'a> {
    registry: &'a TypeRegistry,
    /// Object types on the current path, for cycle detection.
    types: Vec<String>,
    /// Root type followed by field names, for messages.
    path: Vec<String>,
}

impl AllFields<'_> {
    fn select(&mut self, type_name: &str) -> SchemaResult<Vec<QueryNode>> {
        let registry = self.registry;
        let object = registry
            .object(type_name)
            .ok_or_else(|| SchemaError::NotAnObject {
                type_name: type_name.into(),
            })?;

        let mut nodes = Vec::with_capacity(object.len());
        for (declared, definition) in object.iter() {
            let (field, _) = split_optional(declared);
            if let Some(arguments) = definition.arguments() {
                if arguments.required().next().is_some() {
                    return Err(SchemaError::AutoSelectRequiresArguments {
                        type_name: type_name.into(),
                        field: field.into(),
                    });
                }
            }

            let location = format!("{type_name}.{field}");
            let resolved = registry.resolve(definition.output(), &location)?;
            let Some(child) = resolved.object_name() else {
                nodes.push(QueryNode::leaf(field));
                continue;
            };

            self.path.push(field.to_owned());
            if self.types.iter().any(|t| t == child) {
                return Err(SchemaError::AutoSelectCycle {
                    type_name: child.into(),
                    path: self.path.join("."),
                });
            }
            self.types.push(child.to_owned());
            let children = self.select(child)?;
            self.types.pop();
            self.path.pop();

            nodes.push(QueryNode::object(field, children));
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tgql_schema::{InputDefinition, ObjectDefinition, Schema};

    fn keys(nodes: &[QueryNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.key.as_str()).collect()
    }

    fn blog() -> Schema {
        Schema::builder()
            .object(
                "User",
                ObjectDefinition::new()
                    .field("id", "Int!")
                    .field("username", "String!")
                    .field("posts", "[Post!]!")
                    .field("registeredAt", "DateTime!"),
            )
            .object(
                "Post",
                ObjectDefinition::new()
                    .field("id", "Int!")
                    .field("title", "String!")
                    .field_with_args(
                        "comments",
                        InputDefinition::new().field("first?", "Int!"),
                        "[String!]!",
                    ),
            )
            .scalar("DateTime", "String")
            .build()
            .unwrap()
    }

    #[test]
    fn test_builder_nodes() {
        let nodes = parse_selector(|user| {
            vec![
                user.field("id"),
                user.field_with("avatar", json!({ "size": 64 })),
                user.nested_with("posts", json!({ "first": 2 }), |post| {
                    vec![post.field("title")]
                }),
            ]
        });
        assert_eq!(keys(&nodes), vec!["id", "avatar", "posts"]);
        assert!(nodes[1].is_leaf());
        assert_eq!(nodes[1].arguments, Some(json!({ "size": 64 })));
        assert_eq!(keys(nodes[2].children.as_deref().unwrap()), vec!["title"]);
    }

    #[test]
    fn test_duplicates_kept_in_order() {
        let nodes = parse_selector(|user| {
            vec![
                user.nested("posts", |p| vec![p.field("id")]),
                user.nested("posts", |p| vec![p.field("title")]),
            ]
        });
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].children.as_ref().unwrap()[0].key, "title");
    }

    #[test]
    fn test_all_fields() {
        let schema = blog();
        let nodes = all_fields(schema.registry(), "User").unwrap();
        assert_eq!(keys(&nodes), vec!["id", "username", "posts", "registeredAt"]);
        let posts = nodes[2].children.as_deref().unwrap();
        assert_eq!(keys(posts), vec!["id", "title", "comments"]);
        assert!(posts[2].arguments.is_none());
    }

    #[test]
    fn test_all_fields_of_terminal_is_empty() {
        let schema = blog();
        assert!(all_fields(schema.registry(), "[DateTime!]!").unwrap().is_empty());
    }

    #[test]
    fn test_all_selector_is_reusable() {
        let schema = blog();
        let selector = all_selector(schema.registry(), "[Post!]!").unwrap();
        assert_eq!(parse_selector(&selector), parse_selector(&selector));
    }

    #[test]
    fn test_required_arguments_rejected() {
        let schema = Schema::builder()
            .object(
                "User",
                ObjectDefinition::new().field("id", "Int!").field_with_args(
                    "friends",
                    InputDefinition::new().field("first", "Int!"),
                    "[User!]!",
                ),
            )
            .build()
            .unwrap();
        let err = all_fields(schema.registry(), "User").unwrap_err();
        assert_eq!(
            err,
            SchemaError::AutoSelectRequiresArguments {
                type_name: "User".into(),
                field: "friends".into(),
            }
        );
    }

    #[test]
    fn test_cycle_rejected() {
        let schema = Schema::builder()
            .object("User", ObjectDefinition::new().field("posts", "[Post!]!"))
            .object("Post", ObjectDefinition::new().field("author", "User!"))
            .build()
            .unwrap();
        let err = all_fields(schema.registry(), "User").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot auto-select 'User.posts.author': type 'User' refers back to itself"
        );
    }
}
