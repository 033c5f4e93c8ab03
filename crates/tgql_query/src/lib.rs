//! Selection trees and GraphQL document printing for tgql.
//!
//! This crate provides:
//! - `node`: The selection tree
//! - `selector`: Closure-based selection building and all-fields selection
//! - `check`: Checking a selection against a schema
//! - `printer`: Printing operation documents
//! - `builder`: Standalone document builders
//! - `selectable`: Selections derived from Rust types

pub mod builder;
pub mod check;
pub mod node;
pub mod printer;
pub mod selectable;
pub mod selector;

pub use builder::{mutation_string, query_string, subscription_string, QueryString};
pub use check::check_selection;
pub use node::QueryNode;
pub use printer::{build_query_string, print_value};
pub use selectable::{selection_of, SelectField, Selectable};
pub use selector::{all_fields, all_selector, parse_selector, SelectorBuilder};
