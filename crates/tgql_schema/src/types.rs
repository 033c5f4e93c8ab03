//! Schema declarations: object types, enums, scalar aliases and operations.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::scalar::ScalarCodec;

/// Return type for operations that produce nothing.
pub const VOID: &str = "void";

/// The five built-in GraphQL scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Id,
    Int,
    Float,
    String,
    Boolean,
}

impl ScalarKind {
    pub const ALL: [Self; 5] = [Self::Id, Self::Int, Self::Float, Self::String, Self::Boolean];

    /// Looks a built-in up by its GraphQL name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ID" => Some(Self::Id),
            "Int" => Some(Self::Int),
            "Float" => Some(Self::Float),
            "String" => Some(Self::String),
            "Boolean" => Some(Self::Boolean),
            _ => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Int => "Int",
            Self::Float => "Float",
            Self::String => "String",
            Self::Boolean => "Boolean",
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The kind of operation section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    pub const ALL: [Self; 3] = [Self::Query, Self::Mutation, Self::Subscription];

    /// Keyword used in the document header (`query`, `mutation`, `subscription`).
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }

    /// Section name in a schema declaration (`Query`, ...).
    #[must_use]
    pub const fn section(self) -> &'static str {
        match self {
            Self::Query => "Query",
            Self::Mutation => "Mutation",
            Self::Subscription => "Subscription",
        }
    }

    #[must_use]
    pub fn from_section(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.section() == name)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A field name with its optional marker removed.
///
/// `"username?"` declares an optional field named `username`.
#[must_use]
pub fn split_optional(name: &str) -> (&str, bool) {
    match name.strip_suffix('?') {
        Some(stripped) => (stripped, true),
        None => (name, false),
    }
}

/// An input map: field name (possibly with a trailing `?`) to type expression.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputDefinition {
    fields: IndexMap<String, String>,
}

impl InputDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. Use a trailing `?` on the name to mark it optional.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.fields.insert(name.into(), expr.into());
        self
    }

    /// Iterates over `(declared name, type expression)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Looks a field up by its name without the `?` marker.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<InputField<'_>> {
        self.fields().find(|field| field.name == name)
    }

    /// Iterates over fields with optional markers split off.
    pub fn fields(&self) -> impl Iterator<Item = InputField<'_>> {
        self.fields.iter().map(|(declared, expr)| {
            let (name, optional) = split_optional(declared);
            InputField {
                name,
                optional,
                expr,
            }
        })
    }

    /// Field names without a `?` marker.
    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.fields().filter(|f| !f.optional).map(|f| f.name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for InputDefinition
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// One field of an [`InputDefinition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputField<'a> {
    pub name: &'a str,
    pub optional: bool,
    pub expr: &'a str,
}

/// The type of an object field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDefinition {
    /// `name: "Type"`
    Plain(String),
    /// `name: [{ arg: "Type" }, "Output"]`
    WithArguments {
        input: InputDefinition,
        output: String,
    },
}

impl FieldDefinition {
    /// The type expression of the field's value.
    #[must_use]
    pub fn output(&self) -> &str {
        match self {
            Self::Plain(expr) => expr,
            Self::WithArguments { output, .. } => output,
        }
    }

    #[must_use]
    pub fn arguments(&self) -> Option<&InputDefinition> {
        match self {
            Self::Plain(_) => None,
            Self::WithArguments { input, .. } => Some(input),
        }
    }
}

/// An object (or input object) type: ordered field declarations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectDefinition {
    fields: IndexMap<String, FieldDefinition>,
}

impl ObjectDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field of type `expr`.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, expr: impl Into<String>) -> Self {
        self.fields
            .insert(name.into(), FieldDefinition::Plain(expr.into()));
        self
    }

    /// Adds a field that takes arguments.
    #[must_use]
    pub fn field_with_args(
        mut self,
        name: impl Into<String>,
        input: InputDefinition,
        output: impl Into<String>,
    ) -> Self {
        self.fields.insert(
            name.into(),
            FieldDefinition::WithArguments {
                input,
                output: output.into(),
            },
        );
        self
    }

    pub(crate) fn insert(&mut self, name: String, field: FieldDefinition) {
        self.fields.insert(name, field);
    }

    /// Iterates over `(declared name, definition)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldDefinition)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Looks a field up by name, ignoring a `?` marker on the declaration.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.get(name).or_else(|| {
            self.fields
                .iter()
                .find(|(declared, _)| split_optional(declared).0 == name)
                .map(|(_, field)| field)
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for ObjectDefinition
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), FieldDefinition::Plain(v.into())))
                .collect(),
        }
    }
}

/// A custom scalar: an alias expression and an optional value codec.
#[derive(Debug, Clone)]
pub struct ScalarDefinition {
    pub alias: String,
    pub codec: Option<Arc<ScalarCodec>>,
}

impl PartialEq for ScalarDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.alias == other.alias
            && match (&self.codec, &other.codec) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            }
    }
}

/// A closed set of enum values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumDefinition {
    pub values: Vec<String>,
}

/// Declares an enum from its values.
pub fn enum_of<I, S>(values: I) -> EnumDefinition
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    EnumDefinition {
        values: values.into_iter().map(Into::into).collect(),
    }
}

/// A named type declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Object(ObjectDefinition),
    Scalar(ScalarDefinition),
    Enum(EnumDefinition),
}

impl TypeDefinition {
    /// Short description used in diagnostics.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Object(_) => "object",
            Self::Scalar(_) => "scalar",
            Self::Enum(_) => "enum",
        }
    }
}

/// All declared types, in declaration order.
pub type TypeCollection = IndexMap<String, TypeDefinition>;

/// An operation signature: `['=>', T]` or `[I, '=>', T]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDefinition {
    pub input: Option<InputDefinition>,
    pub output: String,
}

impl OperationDefinition {
    /// An operation without input.
    #[must_use]
    pub fn returns(output: impl Into<String>) -> Self {
        Self {
            input: None,
            output: output.into(),
        }
    }

    /// An operation taking the given input fields.
    pub fn with_input<I, K, V>(input: I, output: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            input: Some(input.into_iter().collect()),
            output: output.into(),
        }
    }
}

/// Operation declarations, one ordered map per section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationCollection {
    pub query: IndexMap<String, OperationDefinition>,
    pub mutation: IndexMap<String, OperationDefinition>,
    pub subscription: IndexMap<String, OperationDefinition>,
}

impl OperationCollection {
    #[must_use]
    pub fn section(&self, kind: OperationKind) -> &IndexMap<String, OperationDefinition> {
        match kind {
            OperationKind::Query => &self.query,
            OperationKind::Mutation => &self.mutation,
            OperationKind::Subscription => &self.subscription,
        }
    }

    pub fn section_mut(
        &mut self,
        kind: OperationKind,
    ) -> &mut IndexMap<String, OperationDefinition> {
        match kind {
            OperationKind::Query => &mut self.query,
            OperationKind::Mutation => &mut self.mutation,
            OperationKind::Subscription => &mut self.subscription,
        }
    }

    /// Iterates over every operation with its kind.
    pub fn iter(&self) -> impl Iterator<Item = (OperationKind, &str, &OperationDefinition)> {
        OperationKind::ALL.into_iter().flat_map(move |kind| {
            self.section(kind)
                .iter()
                .map(move |(name, def)| (kind, name.as_str(), def))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kind_names() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ScalarKind::from_name("DateTime"), None);
    }

    #[test]
    fn test_input_required_fields() {
        let input: InputDefinition = [("id", "Int!"), ("username?", "String!"), ("email", "String")]
            .into_iter()
            .collect();
        let required: Vec<_> = input.required().collect();
        assert_eq!(required, vec!["id", "email"]);
        let username = input.get("username").unwrap();
        assert!(username.optional);
        assert_eq!(username.expr, "String!");
    }

    #[test]
    fn test_object_lookup_ignores_optional_marker() {
        let object = ObjectDefinition::new()
            .field("id", "Int!")
            .field("nickname?", "String!");
        assert_eq!(object.get("id").map(FieldDefinition::output), Some("Int!"));
        assert_eq!(object.get("nickname").map(FieldDefinition::output), Some("String!"));
        assert!(object.get("missing").is_none());
    }

    #[test]
    fn test_operation_collection_iter_order() {
        let mut ops = OperationCollection::default();
        ops.mutation
            .insert("createUser".into(), OperationDefinition::returns("Int!"));
        ops.query
            .insert("users".into(), OperationDefinition::returns("[Int!]!"));
        let names: Vec<_> = ops.iter().map(|(kind, name, _)| (kind, name)).collect();
        assert_eq!(
            names,
            vec![
                (OperationKind::Query, "users"),
                (OperationKind::Mutation, "createUser")
            ]
        );
    }
}
