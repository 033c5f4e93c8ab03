//! Schema layer for tgql.
//!
//! This crate provides:
//! - `lexer`, `type_expr`: Type-expression scanning and parsing
//! - `types`: Declarations (objects, enums, scalars, operations)
//! - `registry`: Alias resolution and terminal-type classification
//! - `checker`: Registration-time schema checks
//! - `document`: The JSON literal form of a schema
//! - `operation`: Compiled operation descriptors
//! - `schema`: The registered schema and its builder

pub mod checker;
pub mod document;
pub mod error;
pub mod lexer;
pub mod operation;
pub mod registry;
pub mod scalar;
pub mod schema;
pub mod type_expr;
pub mod types;

pub use error::{SchemaError, SchemaErrors, SchemaResult};
pub use operation::{abbreviation, OperationDescriptor};
pub use registry::{ResolvedType, Target, TypeRegistry, MAX_RESOLUTION_DEPTH};
pub use scalar::ScalarCodec;
pub use schema::{Schema, SchemaBuilder};
pub use type_expr::{TypeRef, TypeVariant};
pub use types::{
    enum_of, EnumDefinition, FieldDefinition, InputDefinition, ObjectDefinition,
    OperationCollection, OperationDefinition, OperationKind, ScalarKind, TypeDefinition, VOID,
};
