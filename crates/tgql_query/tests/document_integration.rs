//! Integration tests for selecting and printing against a schema.

use serde_json::json;
use tgql_query::{all_fields, build_query_string, check_selection, parse_selector};
use tgql_schema::{OperationKind, Schema};

fn schema() -> Schema {
    Schema::from_json(&json!({
        "User": {
            "id": "Int!",
            "username": "String!",
            "email": "String!",
            "posts": "[Post!]!",
            "registeredAt": "DateTime!"
        },
        "Post": {
            "id": "Int!",
            "title": "String!",
            "content": "String!",
            "authorId": "Int!"
        },
        "DateTime": "String",
        "Query": {
            "user": [{ "id": "Int!" }, "=>", "User"],
            "userCount": ["=>", "Int!"]
        }
    }))
    .unwrap()
}

/// The default selection of an operation prints every field in declaration order.
#[test]
fn test_all_fields_document() {
    let schema = schema();
    let user = schema.operation(OperationKind::Query, "user").unwrap();
    let ast = all_fields(schema.registry(), &user.return_type).unwrap();
    check_selection(schema.registry(), "Query", "user", &user.return_type, &ast).unwrap();

    let query = build_query_string(user.kind, &user.name, &user.variables, &ast);
    insta::assert_snapshot!(query, @r"
    query user($id: Int!) {
      user(id: $id) {
        id
        username
        email
        posts {
          id
          title
          content
          authorId
        }
        registeredAt
      }
    }
    ");
}

/// A hand-written selection is checked and printed in pick order.
#[test]
fn test_selected_document() {
    let schema = schema();
    let user = schema.operation(OperationKind::Query, "user").unwrap();
    let ast = parse_selector(|u| {
        vec![
            u.field("username"),
            u.nested("posts", |p| vec![p.field("title")]),
            u.field("id"),
        ]
    });
    check_selection(schema.registry(), "Query", "user", &user.return_type, &ast).unwrap();

    let query = build_query_string(user.kind, &user.name, &user.variables, &ast);
    assert_eq!(
        query,
        "query user($id: Int!) {\n  user(id: $id) {\n    username\n    posts {\n      title\n    }\n    id\n  }\n}"
    );
}

/// Terminal operations print without a selection set.
#[test]
fn test_terminal_document() {
    let schema = schema();
    let count = schema.operation(OperationKind::Query, "userCount").unwrap();
    assert!(count.terminal);
    let ast = all_fields(schema.registry(), &count.return_type).unwrap();
    assert!(ast.is_empty());
    let query = build_query_string(count.kind, &count.name, &count.variables, &ast);
    assert_eq!(query, "query userCount {\n  userCount\n}");
}
