//! Compiled operation descriptors.
//!
//! Everything the call surface needs to know about an operation is computed
//! once, when the schema is built: the variable declarations as they appear
//! on the wire, which input fields are required, whether the result needs a
//! selection, and which `by<Field>` shortcuts exist.

use indexmap::IndexMap;
use tgql_core::capitalize_first;

use crate::error::SchemaResult;
use crate::registry::TypeRegistry;
use crate::type_expr::TypeRef;
use crate::types::{InputDefinition, OperationDefinition, OperationKind};

/// Immutable per-operation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDescriptor {
    pub kind: OperationKind,
    pub name: String,
    /// Variable name to wire type, in declaration order. Optional fields are
    /// declared nullable so the variable may be omitted.
    pub variables: IndexMap<String, String>,
    /// Return type expression as declared.
    pub return_type: String,
    pub has_input: bool,
    /// Required input field names, in declaration order.
    pub required: Vec<String>,
    /// Optional input field names, in declaration order.
    pub optional: Vec<String>,
    /// True when the return type needs no selection.
    pub terminal: bool,
    /// Shortcut name (`byId`) to input field name (`id`).
    pub abbreviations: IndexMap<String, String>,
    input: InputDefinition,
}

impl OperationDescriptor {
    /// Compiles a checked operation definition.
    pub fn compile(
        kind: OperationKind,
        name: &str,
        definition: &OperationDefinition,
        registry: &TypeRegistry,
    ) -> SchemaResult<Self> {
        let location = format!("{}.{name}", kind.section());
        let input = definition.input.clone().unwrap_or_default();

        let mut variables = IndexMap::with_capacity(input.len());
        let mut required = Vec::new();
        let mut optional = Vec::new();
        for field in input.fields() {
            let location = format!("{location}({})", field.name);
            let mut ty = TypeRef::parse(field.expr, &location)?;
            if field.optional {
                ty = ty.into_nullable();
                optional.push(field.name.to_owned());
            } else {
                required.push(field.name.to_owned());
            }
            variables.insert(field.name.to_owned(), ty.to_string());
        }

        let abbreviations = match required.as_slice() {
            [] => input
                .fields()
                .map(|field| (abbreviation(field.name), field.name.to_owned()))
                .collect(),
            [only] => IndexMap::from([(abbreviation(only), only.clone())]),
            _ => IndexMap::new(),
        };

        let terminal = registry.resolve(&definition.output, &location)?.is_terminal();

        Ok(Self {
            kind,
            name: name.to_owned(),
            variables,
            return_type: definition.output.clone(),
            has_input: !input.is_empty(),
            required,
            optional,
            terminal,
            abbreviations,
            input,
        })
    }

    /// Number of input fields without a `?` marker.
    #[must_use]
    pub fn required_count(&self) -> usize {
        self.required.len()
    }

    /// The input field behind a `by<Field>` shortcut.
    #[must_use]
    pub fn abbreviation(&self, shortcut: &str) -> Option<&str> {
        self.abbreviations.get(shortcut).map(String::as_str)
    }

    /// True if `field` may be passed through an abbreviated form.
    #[must_use]
    pub fn is_abbreviable(&self, field: &str) -> bool {
        self.abbreviations.values().any(|f| f == field)
    }

    /// The declared type expression of an input field.
    #[must_use]
    pub fn input_type(&self, field: &str) -> Option<&str> {
        self.input.get(field).map(|f| f.expr)
    }

    /// Section-qualified name for messages, e.g. `Query.user`.
    #[must_use]
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.kind.section(), self.name)
    }
}

/// The shortcut name for an input field: `id` becomes `byId`.
#[must_use]
pub fn abbreviation(field: &str) -> String {
    format!("by{}", capitalize_first(field))
}
