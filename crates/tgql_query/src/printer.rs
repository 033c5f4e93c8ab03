//! GraphQL document printing.
//!
//! Output is deterministic: the same operation, variables and selection
//! always print to the same bytes.
//!
//! ```text
//! query user($id: Int!) {
//!   user(id: $id) {
//!     id
//!     posts {
//!       title
//!     }
//!   }
//! }
//! ```

use indexmap::IndexMap;
use serde_json::Value;
use tgql_schema::OperationKind;

use crate::node::QueryNode;

/// Spaces per nesting level.
const INDENT_SIZE: usize = 2;

/// Prints an operation document.
///
/// `variables` maps variable names to their wire types; each one is declared
/// in the header and passed through to the operation field under the same
/// name. An empty `ast` prints the bare operation call, as used for terminal
/// return types.
#[must_use]
pub fn build_query_string(
    kind: OperationKind,
    name: &str,
    variables: &IndexMap<String, String>,
    ast: &[QueryNode],
) -> String {
    let mut printer = Printer::new();
    printer.print_operation(kind, name, variables, ast);
    printer.finish()
}

/// Prints a JSON value as a GraphQL input literal.
///
/// Strings starting with `$` are printed bare, as variable references.
#[must_use]
pub fn print_value(value: &Value) -> String {
    let mut printer = Printer::new();
    printer.print_value(value);
    printer.finish()
}

struct Printer {
    output: String,
    indent: usize,
}

impl Printer {
    fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    fn finish(self) -> String {
        self.output
    }

    fn print_operation(
        &mut self,
        kind: OperationKind,
        name: &str,
        variables: &IndexMap<String, String>,
        ast: &[QueryNode],
    ) {
        self.output.push_str(kind.keyword());
        self.output.push(' ');
        self.output.push_str(name);
        if !variables.is_empty() {
            self.output.push('(');
            for (i, (variable, ty)) in variables.iter().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.output.push('$');
                self.output.push_str(variable);
                self.output.push_str(": ");
                self.output.push_str(ty);
            }
            self.output.push(')');
        }
        self.output.push_str(" {\n");

        self.indent += 1;
        self.push_indent();
        self.output.push_str(name);
        if !variables.is_empty() {
            self.output.push('(');
            for (i, variable) in variables.keys().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.output.push_str(variable);
                self.output.push_str(": $");
                self.output.push_str(variable);
            }
            self.output.push(')');
        }
        if !ast.is_empty() {
            self.output.push(' ');
            self.print_selection_set(ast);
        }
        self.indent -= 1;

        self.output.push_str("\n}");
    }

    fn print_selection_set(&mut self, nodes: &[QueryNode]) {
        self.output.push('{');
        self.indent += 1;
        for node in nodes {
            self.output.push('\n');
            self.push_indent();
            self.print_node(node);
        }
        self.indent -= 1;
        self.output.push('\n');
        self.push_indent();
        self.output.push('}');
    }

    fn print_node(&mut self, node: &QueryNode) {
        self.output.push_str(&node.key);
        if let Some(arguments) = &node.arguments {
            self.print_arguments(arguments);
        }
        if let Some(children) = &node.children {
            self.output.push(' ');
            self.print_selection_set(children);
        }
    }

    fn print_arguments(&mut self, arguments: &Value) {
        match arguments {
            Value::Object(fields) if fields.is_empty() => {}
            Value::Object(fields) => {
                self.output.push('(');
                self.print_fields(fields);
                self.output.push(')');
            }
            // Rejected by selection checking; print something recognisable.
            other => {
                self.output.push('(');
                self.print_value(other);
                self.output.push(')');
            }
        }
    }

    fn print_fields(&mut self, fields: &serde_json::Map<String, Value>) {
        for (i, (name, value)) in fields.iter().enumerate() {
            if i > 0 {
                self.output.push_str(", ");
            }
            self.output.push_str(name);
            self.output.push_str(": ");
            self.print_value(value);
        }
    }

    fn print_value(&mut self, value: &Value) {
        match value {
            Value::Null => self.output.push_str("null"),
            Value::Bool(b) => self.output.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => self.output.push_str(&n.to_string()),
            Value::String(s) if is_variable(s) => self.output.push_str(s),
            // JSON string escapes are valid GraphQL string escapes.
            Value::String(s) => self.output.push_str(&Value::String(s.clone()).to_string()),
            Value::Array(items) => {
                self.output.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.output.push_str(", ");
                    }
                    self.print_value(item);
                }
                self.output.push(']');
            }
            Value::Object(fields) => {
                self.output.push('{');
                self.print_fields(fields);
                self.output.push('}');
            }
        }
    }

    fn push_indent(&mut self) {
        for _ in 0..(self.indent * INDENT_SIZE) {
            self.output.push(' ');
        }
    }
}

fn is_variable(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next() == Some('$')
        && chars
            .next()
            .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
