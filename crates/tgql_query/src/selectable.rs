//! Selections derived from Rust types.
//!
//! A struct implementing [`Selectable`] describes its own selection: each
//! field becomes a node, and fields whose type is itself `Selectable` become
//! nested selections. `#[derive(Selectable)]` from `tgql_macros` writes these
//! impls.

use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::sync::Arc;

use crate::node::QueryNode;

/// A type whose fields form a selection.
pub trait Selectable {
    fn selection() -> Vec<QueryNode>;
}

/// How a Rust field type is selected under `key`.
///
/// Scalars and containers of scalars select a leaf; `Selectable` types
/// select a nested block.
pub trait SelectField {
    fn select_field(key: &str) -> QueryNode;
}

macro_rules! leaf_fields {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SelectField for $ty {
                fn select_field(key: &str) -> QueryNode {
                    QueryNode::leaf(key)
                }
            }
        )*
    };
}

leaf_fields!(
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    String,
    serde_json::Value,
);

impl<K, V> SelectField for HashMap<K, V> {
    fn select_field(key: &str) -> QueryNode {
        QueryNode::leaf(key)
    }
}

impl<K, V> SelectField for BTreeMap<K, V> {
    fn select_field(key: &str) -> QueryNode {
        QueryNode::leaf(key)
    }
}

macro_rules! transparent_fields {
    ($($wrapper:ident),* $(,)?) => {
        $(
            impl<T: SelectField> SelectField for $wrapper<T> {
                fn select_field(key: &str) -> QueryNode {
                    T::select_field(key)
                }
            }
        )*
    };
}

transparent_fields!(Option, Vec, Box, Rc, Arc);

impl<T: SelectField, const N: usize> SelectField for [T; N] {
    fn select_field(key: &str) -> QueryNode {
        T::select_field(key)
    }
}

/// The selection of `T`.
#[must_use]
pub fn selection_of<T: Selectable>() -> Vec<QueryNode> {
    T::selection()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Post;

    impl Selectable for Post {
        fn selection() -> Vec<QueryNode> {
            vec![String::select_field("title")]
        }
    }

    impl SelectField for Post {
        fn select_field(key: &str) -> QueryNode {
            QueryNode::object(key, Post::selection())
        }
    }

    struct User;

    impl Selectable for User {
        fn selection() -> Vec<QueryNode> {
            vec![
                <i64 as SelectField>::select_field("id"),
                <Option<String> as SelectField>::select_field("nickname"),
                <Vec<Post> as SelectField>::select_field("posts"),
            ]
        }
    }

    #[test]
    fn test_wrappers_are_transparent() {
        let nodes = selection_of::<User>();
        assert!(nodes[0].is_leaf());
        assert!(nodes[1].is_leaf());
        assert_eq!(
            nodes[2],
            QueryNode::object("posts", vec![QueryNode::leaf("title")])
        );
    }

    #[test]
    fn test_nested_containers() {
        let node = <Option<Vec<Box<Post>>> as SelectField>::select_field("drafts");
        assert_eq!(node.children.map(|c| c.len()), Some(1));
    }
}
