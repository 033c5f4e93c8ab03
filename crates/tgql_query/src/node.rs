//! Selection tree nodes.

use serde_json::Value;

/// One picked field.
///
/// `children` is `None` for a leaf and `Some` for a field with a
/// sub-selection. Sibling order is output order.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryNode {
    pub key: String,
    /// Field arguments. Expected to be a JSON object; anything else is
    /// rejected when the selection is checked.
    pub arguments: Option<Value>,
    pub children: Option<Vec<QueryNode>>,
}

impl QueryNode {
    /// A leaf field.
    #[must_use]
    pub fn leaf(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            arguments: None,
            children: None,
        }
    }

    /// A field with a sub-selection.
    #[must_use]
    pub fn object(key: impl Into<String>, children: Vec<QueryNode>) -> Self {
        Self {
            key: key.into(),
            arguments: None,
            children: Some(children),
        }
    }

    /// Attaches field arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Value) -> Self {
        self.arguments = Some(arguments);
        self
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}
