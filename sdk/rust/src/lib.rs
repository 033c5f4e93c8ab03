//! tgql SDK
//!
//! Typed GraphQL calls driven by a declared schema. Operations are looked up
//! by name, their input and selection are checked against the schema before
//! anything is sent, and requests are only issued when awaited.
//!
//! ```ignore
//! use serde_json::json;
//! use tgql_sdk::{create_client, Schema, Selectable};
//!
//! let schema = Schema::from_json(&json!({
//!     "User": { "id": "Int!", "username": "String!" },
//!     "Query": { "user": [{ "id": "Int!" }, "=>", "User"] },
//! }))?;
//! let client = create_client("http://localhost:4000/graphql").with_schema(schema);
//!
//! // All fields.
//! let user = client.query("user")?.abbreviated("byId", json!(1))?.await?;
//!
//! // Picked fields.
//! let name = client
//!     .query("user")?
//!     .select(|u| vec![u.field("username")])?
//!     .by(json!({ "id": 1 }))?
//!     .await?;
//!
//! // Fields taken from a struct.
//! #[derive(Selectable, serde::Deserialize)]
//! struct UserName {
//!     username: String,
//! }
//! let user: UserName = client.query("user")?.select_as::<UserName>()?.by_field("id", json!(1))?.decode().await?;
//! ```

extern crate self as tgql_sdk;

pub mod client;
pub mod coerce;
pub mod error;
pub mod operation;
pub mod transport;
pub mod ws;

// Re-export macros
pub use tgql_macros::{selection, Selectable};

pub use client::{create_client, Client, SchemaClient};
pub use error::{ErrorCode, ResultExt, SdkError, SdkResult};
pub use operation::{Mode, Mutation, OperationCall, Pending, Query, RequestMode, Selection, Subscription};
pub use transport::{
    ClientConfig, GraphQLError, GraphQLResponse, HttpClient, HttpTransport, RequestBody, RetryPolicy,
};
pub use ws::{
    SubscriptionSink, SubscriptionTransport, Unsubscribe, WsClient, WsConfig,
    GRAPHQL_TRANSPORT_WS_PROTOCOL,
};

// Schema and query layers
pub use tgql_query::{
    all_fields, build_query_string, mutation_string, query_string, selection_of, subscription_string,
    QueryNode, QueryString, SelectField, Selectable, SelectorBuilder,
};
pub use tgql_schema::{
    enum_of, EnumDefinition, InputDefinition, ObjectDefinition, OperationDefinition, OperationKind,
    ScalarCodec, Schema, SchemaBuilder, SchemaError, SchemaErrors,
};

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
