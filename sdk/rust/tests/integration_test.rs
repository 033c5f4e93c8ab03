//! Integration tests for tgql_sdk

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tgql_sdk::{
    selection, Client, ErrorCode, GraphQLError, GraphQLResponse, HttpTransport, InputDefinition,
    ObjectDefinition, OperationDefinition, RequestBody, ScalarCodec, Schema, SchemaBuilder,
    SchemaClient, SdkError, SdkResult, Selectable, SubscriptionSink, SubscriptionTransport,
    Unsubscribe,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

type Reply = dyn Fn(&RequestBody) -> GraphQLResponse + Send + Sync;

/// Records every request and answers with `reply`.
#[derive(Clone)]
struct MockTransport {
    calls: Arc<Mutex<Vec<RequestBody>>>,
    reply: Arc<Reply>,
}

impl MockTransport {
    fn new<F>(reply: F) -> Self
    where
        F: Fn(&RequestBody) -> GraphQLResponse + Send + Sync + 'static,
    {
        Self {
            calls: Arc::default(),
            reply: Arc::new(reply),
        }
    }

    fn data(data: Value) -> Self {
        Self::new(move |_| GraphQLResponse::from_data(data.clone()))
    }

    fn calls(&self) -> Vec<RequestBody> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn request(&self, body: &RequestBody) -> SdkResult<GraphQLResponse> {
        self.calls.lock().unwrap().push(body.clone());
        Ok((self.reply)(body))
    }
}

type SharedSink = Arc<Mutex<Option<Box<dyn SubscriptionSink>>>>;

/// Keeps the sink of the last subscription so tests can push events into it.
#[derive(Clone, Default)]
struct MockSubscriptions {
    sink: SharedSink,
    bodies: Arc<Mutex<Vec<RequestBody>>>,
    cancelled: Arc<Mutex<bool>>,
}

impl MockSubscriptions {
    fn with_sink(&self, f: impl FnOnce(&mut dyn SubscriptionSink)) {
        let mut guard = self.sink.lock().unwrap();
        f(guard.as_mut().expect("no active subscription").as_mut());
    }
}

impl SubscriptionTransport for MockSubscriptions {
    fn subscribe(&self, body: RequestBody, sink: Box<dyn SubscriptionSink>) -> SdkResult<Unsubscribe> {
        self.bodies.lock().unwrap().push(body);
        *self.sink.lock().unwrap() = Some(sink);
        let cancelled = self.cancelled.clone();
        Ok(Unsubscribe::new(move || *cancelled.lock().unwrap() = true))
    }
}

fn blog() -> SchemaBuilder {
    SchemaBuilder::from_json(&json!({
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
        "Role": { "__graphQLType": "enum", "values": ["ADMIN", "USER"] },
        "Query": {
            "me": ["=>", "User"],
            "user": [{ "id": "Int!" }, "=>", "User"],
            "users": [{ "first?": "Int", "role?": "Role" }, "=>", "[User!]!"],
            "search": [{ "term": "String!", "limit": "Int!" }, "=>", "[Post!]!"],
            "registeredSince": [{ "since": "DateTime!" }, "=>", "[User!]!"],
            "count": ["=>", "Int!"]
        },
        "Mutation": {
            "logout": ["=>", "void"]
        },
        "Subscription": {
            "userCreated": ["=>", "User!"]
        }
    }))
    .codec(
        "DateTime",
        ScalarCodec::new()
            .serialize(|v| match v.as_i64() {
                Some(secs) => Ok(json!(format!("@{secs}"))),
                None => Err(format!("expected seconds, found {v}")),
            })
            .parse(|v| {
                v.as_str()
                    .and_then(|s| s.strip_prefix('@'))
                    .and_then(|s| s.parse::<i64>().ok())
                    .map(Value::from)
                    .ok_or_else(|| format!("expected @seconds, found {v}"))
            }),
    )
}

fn client(transport: &MockTransport) -> SchemaClient {
    init_tracing();
    Client::with_transport(transport.clone()).with_schema(blog().build().unwrap())
}

fn user_data() -> Value {
    json!({
        "user": {
            "id": 1,
            "username": "ada",
            "email": "ada@example.com",
            "posts": [{ "id": 7, "title": "Hello", "content": "...", "authorId": 1 }],
            "registeredAt": "@1700000000"
        }
    })
}

#[tokio::test]
async fn test_user_document() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);

    let pending = client.query("user").unwrap().by_field("id", json!(1)).unwrap();
    insta::assert_snapshot!(pending.to_query_string(), @r"
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
    assert_eq!(pending.to_request_body().variables, json!({ "id": 1 }));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_select_then_by() {
    let transport = MockTransport::data(json!({
        "user": { "id": 1, "posts": [{ "title": "Hello" }] }
    }));
    let client = client(&transport);

    let user = client
        .query("user")
        .unwrap()
        .select(|u| vec![u.field("id"), u.nested("posts", |p| vec![p.field("title")])])
        .unwrap()
        .by(json!({ "id": 1 }))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(user, json!({ "id": 1, "posts": [{ "title": "Hello" }] }));
    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].query,
        "query user($id: Int!) {\n  user(id: $id) {\n    id\n    posts {\n      title\n    }\n  }\n}"
    );
}

#[tokio::test]
async fn test_refinement_supersedes_default_request() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);

    let call = client.query_with("user", json!({ "id": 1 })).unwrap();
    let default = call.request().unwrap();
    let selected = call.select(|u| vec![u.field("username")]).unwrap();

    selected.await.unwrap();
    assert_eq!(transport.calls().len(), 1);
    assert!(transport.calls()[0].query.contains("    username\n  }"));

    assert!(default.is_superseded());
    assert_eq!(default.await.unwrap(), Value::Null);
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_awaiting_clones_sends_once() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);

    let pending = client.query("user").unwrap().by_field("id", json!(1)).unwrap();
    let first = pending.clone().await.unwrap();
    let second = pending.clone().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(pending.to_request_body(), pending.to_request_body());
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_abbreviations_are_equivalent() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);
    let call = client.query("user").unwrap();

    let by = call.by(json!({ "id": 1 })).unwrap();
    let by_field = call.by_field("id", json!(1)).unwrap();
    let abbreviated = call.abbreviated("byId", json!(1)).unwrap();
    assert_eq!(by.to_request_body(), by_field.to_request_body());
    assert_eq!(by.to_request_body(), abbreviated.to_request_body());

    assert_eq!(call.abbreviated("byName", json!("x")).unwrap_err().code, ErrorCode::InvalidInput);
}

#[tokio::test]
async fn test_call_surface_follows_required_inputs() {
    let transport = MockTransport::data(json!({ "users": [], "search": [], "me": null }));
    let client = client(&transport);

    // No input: awaitable, nothing to pass.
    let me = client.query("me").unwrap();
    assert_eq!(me.by(json!({})).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(me.await.unwrap(), Value::Null);

    // Only optional inputs: awaitable, every field abbreviable.
    assert_eq!(client.query("users").unwrap().await.unwrap(), json!([]));
    let users = client.query("users").unwrap();
    let by_first = users.by_field("first", json!(10)).unwrap();
    assert_eq!(by_first.to_request_body().variables, json!({ "first": 10 }));
    assert!(users.abbreviated("byRole", json!("ADMIN")).is_ok());
    // Refining superseded the call's own request.
    assert_eq!(users.await.unwrap(), Value::Null);

    // One required input: awaiting names `.by`.
    let err = client.query("user").unwrap().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::MissingInput);
    assert!(err.message.contains(".by("), "{}", err.message);
    assert!(err.message.contains("byId"), "{}", err.message);

    // Two required inputs: only `.by`.
    let search = client.query("search").unwrap();
    assert_eq!(search.by_field("term", json!("rust")).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(search.by(json!({ "term": "rust" })).unwrap_err().code, ErrorCode::MissingInput);
    assert_eq!(
        search.by(json!({ "term": "rust", "limit": 3, "page": 2 })).unwrap_err().code,
        ErrorCode::InvalidInput
    );
    let selected = search.select(|p| vec![p.field("title")]).unwrap();
    assert_eq!(selected.by_field("limit", json!(3)).unwrap_err().code, ErrorCode::InvalidInput);
    assert_eq!(selected.await.unwrap_err().code, ErrorCode::MissingInput);

    let posts = search
        .by(json!({ "term": "rust", "limit": 3 }))
        .unwrap()
        .await
        .unwrap();
    assert_eq!(posts, json!([]));
}

#[tokio::test]
async fn test_terminal_operations() {
    let transport = MockTransport::new(|body| {
        if body.query.starts_with("mutation") {
            GraphQLResponse::from_data(json!({ "logout": null }))
        } else {
            GraphQLResponse::from_data(json!({ "count": 3 }))
        }
    });
    let client = client(&transport);

    let logout = client.mutation("logout").unwrap();
    assert_eq!(
        logout.request().unwrap().to_query_string(),
        "mutation logout {\n  logout\n}"
    );
    assert_eq!(
        logout.select(|x| vec![x.field("id")]).unwrap_err().code,
        ErrorCode::InvalidSelection
    );
    assert_eq!(logout.await.unwrap(), Value::Null);
    assert_eq!(client.query("count").unwrap().await.unwrap(), json!(3));
}

#[tokio::test]
async fn test_selection_is_checked() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);
    let call = client.query("user").unwrap();

    let err = call.select(|u| vec![u.field("nickname")]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSelection);
    assert_eq!(err.message, "Field 'nickname' does not exist on type 'User'");

    let err = call.select(|u| vec![u.field("posts")]).unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSelection);
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_execution_errors() {
    let transport = MockTransport::new(|_| GraphQLResponse {
        data: None,
        errors: vec![GraphQLError::new("not allowed"), GraphQLError::new("try later")],
    });
    let client = client(&transport);

    let err = client.query("me").unwrap().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ExecutionError);
    assert_eq!(err.message, "not allowed; try later");
    assert_eq!(
        err.extension("errors"),
        Some(&json!([{ "message": "not allowed" }, { "message": "try later" }]))
    );
}

#[tokio::test]
async fn test_missing_data() {
    let transport = MockTransport::new(|_| GraphQLResponse::default());
    let client = client(&transport);
    let err = client.query("count").unwrap().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NoData);
}

#[tokio::test]
async fn test_custom_scalar_round_trip() {
    let transport = MockTransport::data(json!({
        "registeredSince": [{ "id": 1, "registeredAt": "@1700000100" }]
    }));
    let client = client(&transport);

    let users = client
        .query("registeredSince")
        .unwrap()
        .select(|u| vec![u.field("id"), u.field("registeredAt")])
        .unwrap()
        .by_field("since", json!(1_700_000_000))
        .unwrap()
        .await
        .unwrap();

    assert_eq!(transport.calls()[0].variables, json!({ "since": "@1700000000" }));
    assert_eq!(users, json!([{ "id": 1, "registeredAt": 1_700_000_100 }]));

    let err = client
        .query("registeredSince")
        .unwrap()
        .by_field("since", json!("yesterday"))
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ScalarError);
}

#[derive(Debug, Selectable, Deserialize, PartialEq)]
#[selection(rename_all = "camelCase")]
#[serde(rename_all = "camelCase")]
struct UserSummary {
    id: i64,
    registered_at: i64,
    posts: Vec<PostTitle>,
}

#[derive(Debug, Selectable, Deserialize, PartialEq)]
struct PostTitle {
    title: String,
}

#[tokio::test]
async fn test_select_as_derived_struct() {
    let transport = MockTransport::data(json!({
        "user": { "id": 1, "registeredAt": "@5", "posts": [{ "title": "Hello" }] }
    }));
    let client = client(&transport);

    let user: UserSummary = client
        .query("user")
        .unwrap()
        .select_as::<UserSummary>()
        .unwrap()
        .by_field("id", json!(1))
        .unwrap()
        .decode()
        .await
        .unwrap();

    assert_eq!(
        user,
        UserSummary {
            id: 1,
            registered_at: 5,
            posts: vec![PostTitle { title: "Hello".into() }],
        }
    );
    assert!(transport.calls()[0].query.contains("    registeredAt\n    posts {\n      title\n    }"));
}

#[tokio::test]
async fn test_selection_macro() {
    let transport = MockTransport::data(user_data());
    let client = client(&transport);

    let pending = client
        .query("user")
        .unwrap()
        .select_nodes(selection! {
            id
            posts { title }
        })
        .unwrap()
        .abbreviated("byId", json!(2))
        .unwrap();
    assert_eq!(
        pending.to_query_string(),
        "query user($id: Int!) {\n  user(id: $id) {\n    id\n    posts {\n      title\n    }\n  }\n}"
    );
}

#[tokio::test]
async fn test_auto_select_rejections() {
    init_tracing();
    let schema = Schema::builder()
        .object(
            "User",
            ObjectDefinition::new().field("id", "Int!").field_with_args(
                "friends",
                InputDefinition::new().field("first", "Int!"),
                "[User!]!",
            ),
        )
        .object("Node", ObjectDefinition::new().field("id", "Int!").field("parent", "Node"))
        .query("me", OperationDefinition::returns("User"))
        .query("node", OperationDefinition::returns("Node"))
        .build()
        .unwrap();
    let transport = MockTransport::data(json!({ "me": { "id": 1 } }));
    let client = Client::with_transport(transport.clone()).with_schema(schema);

    let err = client.query("me").unwrap().await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InvalidSelection);
    assert!(err.message.contains("'friends'") && err.message.contains("'User'"), "{}", err.message);

    let err = client.query("node").unwrap().await.unwrap_err();
    assert_eq!(err.message, "Cannot auto-select 'Node.parent': type 'Node' refers back to itself");

    // The same failure is available without awaiting.
    let node = client.query("node").unwrap();
    assert_eq!(node.request().unwrap_err().code, ErrorCode::InvalidSelection);

    // An explicit selection still works.
    let me = client
        .query("me")
        .unwrap()
        .select(|u| vec![u.field("id")])
        .unwrap()
        .await
        .unwrap();
    assert_eq!(me, json!({ "id": 1 }));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_subscription_without_websocket() {
    let transport = MockTransport::data(json!({}));
    let client = client(&transport);

    let err = client.subscription("userCreated").unwrap().subscribe(|_| {}).unwrap_err();
    assert_eq!(err.code, ErrorCode::NoWebSocketClient);
}

#[tokio::test]
async fn test_subscription_events() {
    init_tracing();
    let subscriptions = MockSubscriptions::default();
    let client = Client::with_transport(MockTransport::data(json!({})))
        .with_subscription_transport(subscriptions.clone())
        .unwrap()
        .with_schema(blog().build().unwrap());

    let received = Arc::new(Mutex::new(Vec::new()));
    let errors = Arc::new(Mutex::new(Vec::<SdkError>::new()));
    let completed = Arc::new(Mutex::new(false));

    let unsubscribe = {
        let (received, errors, completed) = (received.clone(), errors.clone(), completed.clone());
        client
            .subscription("userCreated")
            .unwrap()
            .select(|u| vec![u.field("id"), u.field("registeredAt")])
            .unwrap()
            .subscribe_with(
                move |user| received.lock().unwrap().push(user),
                move |error| errors.lock().unwrap().push(error),
                move || *completed.lock().unwrap() = true,
            )
            .unwrap()
    };

    assert_eq!(
        subscriptions.bodies.lock().unwrap()[0].query,
        "subscription userCreated {\n  userCreated {\n    id\n    registeredAt\n  }\n}"
    );

    subscriptions.with_sink(|sink| {
        sink.next(GraphQLResponse::from_data(json!({
            "userCreated": { "id": 1, "registeredAt": "@10" }
        })));
        sink.next(GraphQLResponse {
            data: Some(json!({ "userCreated": { "id": 2, "registeredAt": "@20" } })),
            errors: vec![GraphQLError::new("partial")],
        });
        sink.complete();
    });

    assert_eq!(
        *received.lock().unwrap(),
        vec![
            json!({ "id": 1, "registeredAt": 10 }),
            json!({ "id": 2, "registeredAt": 20 }),
        ]
    );
    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, ErrorCode::ExecutionError);
    assert!(*completed.lock().unwrap());

    assert!(!*subscriptions.cancelled.lock().unwrap());
    unsubscribe.unsubscribe();
    assert!(*subscriptions.cancelled.lock().unwrap());
}
