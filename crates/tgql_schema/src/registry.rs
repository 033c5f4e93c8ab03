//! Type registry and alias resolution.

use rustc_hash::FxHashSet;

use crate::error::{SchemaError, SchemaResult};
use crate::scalar::ScalarCodec;
use crate::type_expr::{TypeRef, TypeVariant};
use crate::types::{ObjectDefinition, ScalarKind, TypeCollection, TypeDefinition, VOID};

/// Maximum number of scalar aliases followed while resolving one expression.
pub const MAX_RESOLUTION_DEPTH: usize = 50;

/// What a type expression ultimately refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Builtin(ScalarKind),
    Object(String),
    Enum(String),
    Void,
}

impl Target {
    /// True for everything except object types.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Object(_))
    }
}

/// A type expression resolved through the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedType {
    /// The expression as written.
    pub declared: TypeRef,
    /// Wrapping after folding in list aliases.
    pub variant: TypeVariant,
    pub target: Target,
    /// Item type name when `variant` is a list. For a list alias such as
    /// `Days = "[Day!]!"` this is the alias's item (`Day`), not `Days`.
    pub element: Option<String>,
    /// Custom scalars passed through on the way to `target`, outermost first.
    pub aliases: Vec<String>,
}

impl ResolvedType {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.target.is_terminal()
    }

    /// Name of the object type, if the expression resolves to one.
    #[must_use]
    pub fn object_name(&self) -> Option<&str> {
        match &self.target {
            Target::Object(name) => Some(name),
            _ => None,
        }
    }
}

/// Immutable lookup structure over the declared types.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    types: TypeCollection,
    enums: FxHashSet<String>,
}

impl TypeRegistry {
    #[must_use]
    pub fn new(types: TypeCollection) -> Self {
        let enums = types
            .iter()
            .filter(|(_, def)| matches!(def, TypeDefinition::Enum(_)))
            .map(|(name, _)| name.clone())
            .collect();
        Self { types, enums }
    }

    /// Returns the declared types.
    #[must_use]
    pub fn types(&self) -> &TypeCollection {
        &self.types
    }

    /// Returns a declared type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    /// Returns an object type by name.
    #[must_use]
    pub fn object(&self, name: &str) -> Option<&ObjectDefinition> {
        match self.types.get(name) {
            Some(TypeDefinition::Object(object)) => Some(object),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_enum(&self, name: &str) -> bool {
        self.enums.contains(name)
    }

    /// True if `name` is a built-in scalar or a declared type.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        ScalarKind::from_name(name).is_some() || self.types.contains_key(name)
    }

    /// Parses `expr` and follows scalar aliases until a built-in, object or enum.
    ///
    /// The outermost expression decides nullability. An alias may contribute a
    /// list wrapper only when the referring expression is not a list itself.
    pub fn resolve(&self, expr: &str, location: &str) -> SchemaResult<ResolvedType> {
        let declared = TypeRef::parse(expr, location)?;
        if declared.core == VOID {
            return Ok(ResolvedType {
                variant: declared.variant,
                element: None,
                declared,
                target: Target::Void,
                aliases: Vec::new(),
            });
        }

        let mut variant = declared.variant;
        let mut element = variant.is_list().then(|| declared.core.clone());
        let mut aliases = Vec::new();
        let mut current = declared.clone();
        let mut current_expr = expr.to_owned();
        let mut current_location = location.to_owned();

        for _ in 0..=MAX_RESOLUTION_DEPTH {
            if let Some(kind) = ScalarKind::from_name(&current.core) {
                return Ok(ResolvedType {
                    declared,
                    variant,
                    element,
                    target: Target::Builtin(kind),
                    aliases,
                });
            }

            let definition = self.types.get(&current.core).ok_or_else(|| {
                SchemaError::unresolvable(
                    &current.core,
                    &current_location,
                    &current_expr,
                    current.core_span,
                )
            })?;

            let alias = match definition {
                TypeDefinition::Object(_) => {
                    return Ok(ResolvedType {
                        declared,
                        variant,
                        element,
                        target: Target::Object(current.core),
                        aliases,
                    })
                }
                TypeDefinition::Enum(_) => {
                    return Ok(ResolvedType {
                        declared,
                        variant,
                        element,
                        target: Target::Enum(current.core),
                        aliases,
                    })
                }
                TypeDefinition::Scalar(scalar) => &scalar.alias,
            };

            let alias_location = format!("scalar {}", current.core);
            let next = TypeRef::parse(alias, &alias_location)?;
            if next.variant.is_list() {
                if variant.is_list() {
                    return Err(SchemaError::NestedList {
                        expr: expr.to_owned(),
                        location: location.to_owned(),
                    });
                }
                variant =
                    TypeVariant::from_parts(true, next.variant.items_nullable(), variant.is_nullable());
                element = Some(next.core.clone());
            }

            aliases.push(std::mem::replace(&mut current, next).core);
            current_expr.clone_from(alias);
            current_location = alias_location;
        }

        Err(SchemaError::ResolutionDepthExceeded {
            name: declared.core,
            limit: MAX_RESOLUTION_DEPTH,
        })
    }

    /// True when `expr` needs no field selection: built-ins, enums, custom
    /// scalars aliasing them, and `void`.
    pub fn is_terminal(&self, expr: &str) -> SchemaResult<bool> {
        Ok(self.resolve(expr, expr)?.is_terminal())
    }

    /// The codec of the first custom scalar on the alias chain that has one.
    #[must_use]
    pub fn codec_for(&self, resolved: &ResolvedType) -> Option<&ScalarCodec> {
        resolved.aliases.iter().find_map(|name| match self.types.get(name) {
            Some(TypeDefinition::Scalar(scalar)) => scalar.codec.as_deref(),
            _ => None,
        })
    }
}
