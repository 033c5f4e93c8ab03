//! Schema errors.
//!
//! Everything that can go wrong while registering a schema or building a
//! selection against it. Errors that point into a type expression carry the
//! expression as source code plus a labelled span, so `miette` can render
//! them with a caret under the offending character.

use std::fmt;

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

/// A single schema problem.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SchemaError {
    /// A declared type shadows a built-in scalar, `void`, or another declaration.
    #[error("Type '{name}' is already defined")]
    #[diagnostic(code(tgql::schema::duplicate_type))]
    DuplicateType { name: String },

    /// `Query`, `Mutation` and `Subscription` are operation sections, not types.
    #[error("Type name '{name}' is reserved for an operation section")]
    #[diagnostic(code(tgql::schema::reserved_type_name))]
    ReservedTypeName { name: String },

    /// A type expression could not be scanned.
    #[error("{message} (in {location})")]
    #[diagnostic(code(tgql::schema::syntax))]
    Syntax {
        location: String,
        message: String,
        #[source_code]
        expr: String,
        #[label("here")]
        span: SourceSpan,
    },

    /// A type expression names a type that is neither declared nor built in.
    #[error("'{name}' is unresolvable (in {location})")]
    #[diagnostic(code(tgql::schema::unresolvable))]
    Unresolvable {
        name: String,
        location: String,
        #[source_code]
        expr: String,
        #[label("unknown type")]
        span: SourceSpan,
    },

    /// Alias resolution did not settle within the depth bound.
    #[error("Resolving '{name}' exceeded the maximum depth of {limit} aliases")]
    #[diagnostic(
        code(tgql::schema::resolution_depth),
        help("check for scalar aliases that refer to each other")
    )]
    ResolutionDepthExceeded { name: String, limit: usize },

    /// Alias composition produced a list of lists.
    #[error("Nested lists are not supported: '{expr}' (in {location})")]
    #[diagnostic(code(tgql::schema::nested_list))]
    NestedList { expr: String, location: String },

    /// A type definition has the wrong shape.
    #[error("Invalid definition of '{name}': {message}")]
    #[diagnostic(code(tgql::schema::invalid_definition))]
    InvalidDefinition { name: String, message: String },

    /// An operation entry has the wrong shape.
    #[error("Operation '{name}' in {section} {message}")]
    #[diagnostic(code(tgql::schema::invalid_operation))]
    InvalidOperation {
        section: String,
        name: String,
        message: String,
    },

    /// No operation with this name exists in the section.
    #[error("Unknown {section} operation '{name}'")]
    #[diagnostic(code(tgql::schema::unknown_operation))]
    UnknownOperation { section: String, name: String },

    /// The automatic all-fields selection hit a field with required arguments.
    #[error(
        "Cannot auto-select field '{field}' of type '{type_name}': it has required arguments"
    )]
    #[diagnostic(
        code(tgql::schema::auto_select_arguments),
        help("use `.select(...)` and pass the arguments explicitly")
    )]
    AutoSelectRequiresArguments { type_name: String, field: String },

    /// The automatic all-fields selection reached a type already on its path.
    #[error("Cannot auto-select '{path}': type '{type_name}' refers back to itself")]
    #[diagnostic(
        code(tgql::schema::auto_select_cycle),
        help("use `.select(...)` to cut the cycle")
    )]
    AutoSelectCycle { type_name: String, path: String },

    /// A selection picks a field the type does not declare.
    #[error("Field '{field}' does not exist on type '{type_name}'")]
    #[diagnostic(code(tgql::schema::unknown_field))]
    UnknownField { type_name: String, field: String },

    /// An object-typed field was picked without a sub-selection.
    #[error("Field '{field}' of type '{type_name}' returns an object and needs a sub-selection")]
    #[diagnostic(code(tgql::schema::missing_selection))]
    MissingSelection { type_name: String, field: String },

    /// A terminal field was given a sub-selection.
    #[error("Field '{field}' of type '{type_name}' is a scalar and cannot have a sub-selection")]
    #[diagnostic(code(tgql::schema::unexpected_selection))]
    UnexpectedSelection { type_name: String, field: String },

    /// A field with required arguments was picked without them.
    #[error("Field '{field}' of type '{type_name}' is missing required argument '{argument}'")]
    #[diagnostic(code(tgql::schema::missing_argument))]
    MissingArgument {
        type_name: String,
        field: String,
        argument: String,
    },

    /// Arguments were passed to a field that takes none, or are not a map.
    #[error("Invalid arguments for field '{field}' of type '{type_name}': {message}")]
    #[diagnostic(code(tgql::schema::invalid_arguments))]
    InvalidArguments {
        type_name: String,
        field: String,
        message: String,
    },

    /// A selection was requested on something that is not an object type.
    #[error("Type '{type_name}' is not an object type and has no fields to select")]
    #[diagnostic(code(tgql::schema::not_an_object))]
    NotAnObject { type_name: String },
}

impl SchemaError {
    /// Creates a syntax error pointing at `span` inside `expr`.
    pub fn syntax(
        location: impl Into<String>,
        expr: &str,
        span: tgql_core::Span,
        message: impl Into<String>,
    ) -> Self {
        Self::Syntax {
            location: location.into(),
            message: message.into(),
            expr: expr.to_owned(),
            span: span.into(),
        }
    }

    /// Creates an unresolvable-name error pointing at `span` inside `expr`.
    pub fn unresolvable(
        name: impl Into<String>,
        location: impl Into<String>,
        expr: &str,
        span: tgql_core::Span,
    ) -> Self {
        Self::Unresolvable {
            name: name.into(),
            location: location.into(),
            expr: expr.to_owned(),
            span: span.into(),
        }
    }
}

/// Every problem found while checking a schema.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[diagnostic(code(tgql::schema::invalid))]
pub struct SchemaErrors {
    #[related]
    errors: Vec<SchemaError>,
}

impl SchemaErrors {
    /// Wraps a non-empty list of errors.
    #[must_use]
    pub fn new(errors: Vec<SchemaError>) -> Self {
        Self { errors }
    }

    /// Returns the individual errors, in discovery order.
    #[must_use]
    pub fn errors(&self) -> &[SchemaError] {
        &self.errors
    }

    /// Returns the number of errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Returns true if no error was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns true if any recorded error matches the predicate.
    pub fn contains(&self, predicate: impl Fn(&SchemaError) -> bool) -> bool {
        self.errors.iter().any(predicate)
    }
}

impl fmt::Display for SchemaErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        write!(f, "Invalid schema: {}", messages.join("; "))
    }
}

impl From<SchemaError> for SchemaErrors {
    fn from(error: SchemaError) -> Self {
        Self::new(vec![error])
    }
}

impl IntoIterator for SchemaErrors {
    type Item = SchemaError;
    type IntoIter = std::vec::IntoIter<SchemaError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use tgql_core::Span;

    #[test]
    fn test_syntax_error_display() {
        let err = SchemaError::syntax("User.posts", "[Post!", Span::new(6, 6), "Missing expected ']'");
        assert_eq!(err.to_string(), "Missing expected ']' (in User.posts)");
    }

    #[test]
    fn test_errors_join_messages() {
        let errors = SchemaErrors::new(vec![
            SchemaError::DuplicateType { name: "Int".into() },
            SchemaError::ReservedTypeName {
                name: "Query".into(),
            },
        ]);
        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.to_string(),
            "Invalid schema: Type 'Int' is already defined; \
             Type name 'Query' is reserved for an operation section"
        );
        assert!(errors.contains(|e| matches!(e, SchemaError::DuplicateType { .. })));
    }

    #[test]
    fn test_diagnostic_code() {
        let err = SchemaError::AutoSelectRequiresArguments {
            type_name: "User".into(),
            field: "friends".into(),
        };
        let code = err.code().map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("tgql::schema::auto_select_arguments"));
    }
}
