//! The registered schema and its builder.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::checker;
use crate::error::{SchemaError, SchemaErrors, SchemaResult};
use crate::operation::OperationDescriptor;
use crate::registry::TypeRegistry;
use crate::scalar::ScalarCodec;
use crate::types::{
    EnumDefinition, ObjectDefinition, OperationCollection, OperationDefinition, OperationKind,
    ScalarDefinition, TypeCollection, TypeDefinition,
};

/// A checked schema: the type registry plus compiled operation descriptors.
#[derive(Debug, Clone)]
pub struct Schema {
    registry: TypeRegistry,
    operations: OperationCollection,
    descriptors: IndexMap<(OperationKind, String), Arc<OperationDescriptor>>,
}

impl Schema {
    /// Starts declaring a schema in code.
    #[must_use]
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Loads a schema from its JSON literal form.
    ///
    /// ```json
    /// {
    ///   "User": { "id": "Int!", "posts": "[Post!]!" },
    ///   "Role": { "__graphQLType": "enum", "values": ["ADMIN", "USER"] },
    ///   "DateTime": "String",
    ///   "Query": { "user": [{ "id": "Int!" }, "=>", "User"] }
    /// }
    /// ```
    pub fn from_json(document: &serde_json::Value) -> Result<Self, SchemaErrors> {
        SchemaBuilder::from_json(document).build()
    }

    /// Parses `source` as JSON and loads it like [`Schema::from_json`].
    pub fn from_json_str(source: &str) -> Result<Self, SchemaErrors> {
        let document: serde_json::Value =
            serde_json::from_str(source).map_err(|e| SchemaError::InvalidDefinition {
                name: "<schema>".into(),
                message: format!("not valid JSON: {e}"),
            })?;
        Self::from_json(&document)
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The operation declarations as written.
    #[must_use]
    pub fn operation_definitions(&self) -> &OperationCollection {
        &self.operations
    }

    /// Looks up a compiled operation.
    pub fn operation(&self, kind: OperationKind, name: &str) -> SchemaResult<&Arc<OperationDescriptor>> {
        self.descriptors
            .get(&(kind, name.to_owned()))
            .ok_or_else(|| SchemaError::UnknownOperation {
                section: kind.section().into(),
                name: name.into(),
            })
    }

    /// Iterates over every compiled operation in declaration order.
    pub fn operations(&self) -> impl Iterator<Item = &Arc<OperationDescriptor>> {
        self.descriptors.values()
    }
}

/// Collects declarations and checks them on [`SchemaBuilder::build`].
///
/// Shape problems found while declaring (duplicate names, malformed JSON
/// entries) are kept and reported together with the checker's findings.
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    pub(crate) types: TypeCollection,
    pub(crate) operations: OperationCollection,
    pub(crate) errors: Vec<SchemaError>,
}

impl SchemaBuilder {
    /// Declares an object type.
    #[must_use]
    pub fn object(mut self, name: impl Into<String>, object: ObjectDefinition) -> Self {
        self.declare(name.into(), TypeDefinition::Object(object));
        self
    }

    /// Declares an enum.
    #[must_use]
    pub fn enumeration(mut self, name: impl Into<String>, values: EnumDefinition) -> Self {
        self.declare(name.into(), TypeDefinition::Enum(values));
        self
    }

    /// Declares a custom scalar aliasing `alias` on the wire.
    #[must_use]
    pub fn scalar(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.declare(
            name.into(),
            TypeDefinition::Scalar(ScalarDefinition {
                alias: alias.into(),
                codec: None,
            }),
        );
        self
    }

    /// Declares a custom scalar with a value codec.
    #[must_use]
    pub fn scalar_with_codec(
        mut self,
        name: impl Into<String>,
        alias: impl Into<String>,
        codec: ScalarCodec,
    ) -> Self {
        self.declare(
            name.into(),
            TypeDefinition::Scalar(ScalarDefinition {
                alias: alias.into(),
                codec: Some(Arc::new(codec)),
            }),
        );
        self
    }

    /// Attaches a codec to a scalar declared earlier, e.g. one loaded from JSON.
    #[must_use]
    pub fn codec(mut self, name: &str, codec: ScalarCodec) -> Self {
        match self.types.get_mut(name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.codec = Some(Arc::new(codec)),
            Some(other) => {
                let message = format!("a codec needs a scalar, found {}", other.describe());
                self.errors.push(SchemaError::InvalidDefinition {
                    name: name.into(),
                    message,
                });
            }
            None => self.errors.push(SchemaError::InvalidDefinition {
                name: name.into(),
                message: "a codec was given for an undeclared scalar".into(),
            }),
        }
        self
    }

    #[must_use]
    pub fn query(self, name: impl Into<String>, definition: OperationDefinition) -> Self {
        self.operation(OperationKind::Query, name, definition)
    }

    #[must_use]
    pub fn mutation(self, name: impl Into<String>, definition: OperationDefinition) -> Self {
        self.operation(OperationKind::Mutation, name, definition)
    }

    #[must_use]
    pub fn subscription(self, name: impl Into<String>, definition: OperationDefinition) -> Self {
        self.operation(OperationKind::Subscription, name, definition)
    }

    /// Declares an operation in the given section.
    #[must_use]
    pub fn operation(
        mut self,
        kind: OperationKind,
        name: impl Into<String>,
        definition: OperationDefinition,
    ) -> Self {
        self.declare_operation(kind, name.into(), definition);
        self
    }

    pub(crate) fn declare(&mut self, name: String, definition: TypeDefinition) {
        if self.types.contains_key(&name) {
            self.errors.push(SchemaError::DuplicateType { name });
        } else {
            self.types.insert(name, definition);
        }
    }

    pub(crate) fn declare_operation(
        &mut self,
        kind: OperationKind,
        name: String,
        definition: OperationDefinition,
    ) {
        let section = self.operations.section_mut(kind);
        if section.contains_key(&name) {
            self.errors.push(SchemaError::InvalidOperation {
                section: kind.section().into(),
                name,
                message: "is declared twice".into(),
            });
        } else {
            section.insert(name, definition);
        }
    }

    /// Checks every declaration and compiles the operation descriptors.
    pub fn build(self) -> Result<Schema, SchemaErrors> {
        let Self {
            types,
            operations,
            mut errors,
        } = self;

        let registry = TypeRegistry::new(types);
        if let Err(found) = checker::check(&registry, &operations) {
            errors.extend(found);
        }
        if !errors.is_empty() {
            return Err(SchemaErrors::new(errors));
        }

        let mut descriptors = IndexMap::new();
        for (kind, name, definition) in operations.iter() {
            let descriptor = OperationDescriptor::compile(kind, name, definition, &registry)?;
            descriptors.insert((kind, name.to_owned()), Arc::new(descriptor));
        }

        debug!(
            types = registry.types().len(),
            operations = descriptors.len(),
            "schema registered"
        );

        Ok(Schema {
            registry,
            operations,
            descriptors,
        })
    }
}
