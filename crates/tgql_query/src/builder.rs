//! Printing documents without a client or schema.
//!
//! ```
//! use tgql_query::query_string;
//!
//! let query = query_string("user")
//!     .variables([("id", "ID!")])
//!     .select(|user| vec![user.field("id"), user.field("username")])
//!     .build();
//! assert!(query.starts_with("query user($id: ID!) {"));
//! ```

use indexmap::IndexMap;
use tgql_schema::OperationKind;

use crate::node::QueryNode;
use crate::printer::build_query_string;
use crate::selector::{parse_selector, SelectorBuilder};

/// An operation document under construction.
#[derive(Debug, Clone)]
#[must_use]
pub struct QueryString {
    kind: OperationKind,
    name: String,
    variables: IndexMap<String, String>,
    ast: Vec<QueryNode>,
}

impl QueryString {
    pub fn new(kind: OperationKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            variables: IndexMap::new(),
            ast: Vec::new(),
        }
    }

    /// Declares variables as `(name, wire type)` pairs.
    pub fn variables<I, K, V>(mut self, variables: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.variables
            .extend(variables.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Sets the selection.
    pub fn select<F>(mut self, selector: F) -> Self
    where
        F: FnOnce(&SelectorBuilder) -> Vec<QueryNode>,
    {
        self.ast = parse_selector(selector);
        self
    }

    /// Sets an already built selection.
    pub fn nodes(mut self, nodes: Vec<QueryNode>) -> Self {
        self.ast = nodes;
        self
    }

    #[must_use]
    pub fn build(&self) -> String {
        build_query_string(self.kind, &self.name, &self.variables, &self.ast)
    }
}

/// Starts a `query` document.
pub fn query_string(name: impl Into<String>) -> QueryString {
    QueryString::new(OperationKind::Query, name)
}

/// Starts a `mutation` document.
pub fn mutation_string(name: impl Into<String>) -> QueryString {
    QueryString::new(OperationKind::Mutation, name)
}

/// Starts a `subscription` document.
pub fn subscription_string(name: impl Into<String>) -> QueryString {
    QueryString::new(OperationKind::Subscription, name)
}
