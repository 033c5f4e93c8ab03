//! Client construction.
//!
//! ```ignore
//! use tgql_sdk::{create_client, Schema, WsConfig};
//!
//! let schema = Schema::from_json_str(include_str!("schema.json"))?;
//! let client = create_client("http://localhost:4000/graphql")
//!     .with_websocket(WsConfig::new("ws://localhost:4000/graphql"))?
//!     .with_schema(schema);
//!
//! let user = client.query("user")?.by_field("id", 1.into())?.await?;
//! ```

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashMap;
use tgql_query::{all_fields, QueryNode};
use tgql_schema::{OperationDescriptor, Schema, SchemaError};
use tracing::debug;

use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::operation::{Mutation, OperationCall, Query, Subscription};
use crate::transport::{ClientConfig, GraphQLResponse, HttpClient, HttpTransport, RequestBody};
use crate::ws::{SubscriptionTransport, WsClient, WsConfig};

/// A transport pair without a schema.
#[derive(Clone)]
pub struct Client {
    http: Arc<dyn HttpTransport>,
    ws: Option<Arc<dyn SubscriptionTransport>>,
}

impl Client {
    /// A client `POST`ing to `url` with the default configuration.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(url))
    }

    /// A client using the built-in HTTP client with `config`.
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_transport(HttpClient::new(config))
    }

    /// A client sending through a custom transport.
    pub fn with_transport<T>(transport: T) -> Self
    where
        T: HttpTransport + 'static,
    {
        Self {
            http: Arc::new(transport),
            ws: None,
        }
    }

    /// Enables subscriptions over `graphql-transport-ws`.
    pub fn with_websocket(self, config: WsConfig) -> SdkResult<Self> {
        self.with_subscription_transport(WsClient::new(config))
    }

    /// Enables subscriptions through a custom transport.
    ///
    /// Only one subscription transport may be registered.
    pub fn with_subscription_transport<T>(mut self, transport: T) -> SdkResult<Self>
    where
        T: SubscriptionTransport + 'static,
    {
        if self.ws.is_some() {
            return Err(SdkError::new(
                ErrorCode::WebSocketAlreadyConfigured,
                "A WebSocket client is already configured",
            ));
        }
        self.ws = Some(Arc::new(transport));
        Ok(self)
    }

    /// True once a subscription transport is registered.
    pub fn has_websocket(&self) -> bool {
        self.ws.is_some()
    }

    /// Sends a raw request.
    pub async fn execute(&self, body: &RequestBody) -> SdkResult<GraphQLResponse> {
        self.http.request(body).await
    }

    /// Binds the client to a schema.
    pub fn with_schema(self, schema: Schema) -> SchemaClient {
        SchemaClient::new(self, schema)
    }

    /// Binds the client to a schema given in its JSON literal form.
    pub fn with_schema_json(self, document: &serde_json::Value) -> SdkResult<SchemaClient> {
        let schema = Schema::from_json(document)?;
        Ok(self.with_schema(schema))
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("websocket", &self.ws.is_some())
            .finish_non_exhaustive()
    }
}

/// Creates a client for `url`.
pub fn create_client(url: impl Into<String>) -> Client {
    Client::new(url)
}

/// A client bound to a schema, handing out typed operation calls.
#[derive(Clone)]
pub struct SchemaClient {
    inner: Arc<SchemaClientInner>,
}

pub(crate) struct SchemaClientInner {
    pub(crate) client: Client,
    pub(crate) schema: Schema,
    /// All-fields selection per operation, keyed by qualified name.
    defaults: FxHashMap<String, Result<Vec<QueryNode>, SchemaError>>,
}

impl SchemaClient {
    fn new(client: Client, schema: Schema) -> Self {
        let defaults: FxHashMap<_, _> = schema
            .operations()
            .map(|descriptor| {
                let nodes = if descriptor.terminal {
                    Ok(Vec::new())
                } else {
                    all_fields(schema.registry(), &descriptor.return_type)
                };
                (descriptor.qualified_name(), nodes)
            })
            .collect();
        debug!(operations = defaults.len(), "schema client ready");

        Self {
            inner: Arc::new(SchemaClientInner {
                client,
                schema,
                defaults,
            }),
        }
    }

    /// The schema operations are checked against.
    pub fn schema(&self) -> &Schema {
        &self.inner.schema
    }

    /// The underlying transports.
    pub fn client(&self) -> &Client {
        &self.inner.client
    }

    /// Picks the query `name`.
    ///
    /// Fails with `UnknownOperation` if the schema has no such query.
    pub fn query(&self, name: &str) -> SdkResult<OperationCall<Query>> {
        OperationCall::new(self.clone(), name, None)
    }

    /// `query(name)` with variables supplied up front.
    ///
    /// The call is immediately awaitable with the all-fields selection and
    /// may still be narrowed with `select`.
    pub fn query_with(
        &self,
        name: &str,
        variables: serde_json::Value,
    ) -> SdkResult<OperationCall<Query>> {
        OperationCall::new(self.clone(), name, Some(variables))
    }

    /// Picks the mutation `name`.
    pub fn mutation(&self, name: &str) -> SdkResult<OperationCall<Mutation>> {
        OperationCall::new(self.clone(), name, None)
    }

    /// `mutation(name)` with variables supplied up front.
    pub fn mutation_with(
        &self,
        name: &str,
        variables: serde_json::Value,
    ) -> SdkResult<OperationCall<Mutation>> {
        OperationCall::new(self.clone(), name, Some(variables))
    }

    /// Picks the subscription `name`. Events are received with `subscribe`.
    pub fn subscription(&self, name: &str) -> SdkResult<OperationCall<Subscription>> {
        OperationCall::new(self.clone(), name, None)
    }

    /// `subscription(name)` with variables supplied up front.
    pub fn subscription_with(
        &self,
        name: &str,
        variables: serde_json::Value,
    ) -> SdkResult<OperationCall<Subscription>> {
        OperationCall::new(self.clone(), name, Some(variables))
    }

    pub(crate) fn http(&self) -> &Arc<dyn HttpTransport> {
        &self.inner.client.http
    }

    pub(crate) fn ws(&self) -> SdkResult<&Arc<dyn SubscriptionTransport>> {
        self.inner.client.ws.as_ref().ok_or_else(|| {
            SdkError::new(
                ErrorCode::NoWebSocketClient,
                "Subscriptions need a WebSocket client; call `with_websocket` first",
            )
        })
    }

    /// The all-fields selection of an operation.
    pub(crate) fn default_selection(
        &self,
        descriptor: &OperationDescriptor,
    ) -> SdkResult<Vec<QueryNode>> {
        match self.inner.defaults.get(&descriptor.qualified_name()) {
            Some(Ok(nodes)) => Ok(nodes.clone()),
            Some(Err(error)) => Err(error.clone().into()),
            None => Err(SdkError::internal(format!(
                "No default selection for '{}'",
                descriptor.qualified_name()
            ))),
        }
    }
}

impl fmt::Debug for SchemaClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaClient")
            .field("client", &self.inner.client)
            .field("operations", &self.inner.defaults.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::{SubscriptionSink, Unsubscribe};
    use async_trait::async_trait;
    use serde_json::json;
    use tgql_schema::{ObjectDefinition, OperationDefinition};

    struct Offline;

    #[async_trait]
    impl HttpTransport for Offline {
        async fn request(&self, _: &RequestBody) -> SdkResult<GraphQLResponse> {
            Err(SdkError::network("offline"))
        }
    }

    struct NoSubscriptions;

    impl SubscriptionTransport for NoSubscriptions {
        fn subscribe(&self, _: RequestBody, _: Box<dyn SubscriptionSink>) -> SdkResult<Unsubscribe> {
            Ok(Unsubscribe::new(|| {}))
        }
    }

    #[test]
    fn test_websocket_registered_once() {
        let client = Client::with_transport(Offline)
            .with_subscription_transport(NoSubscriptions)
            .unwrap();
        assert!(client.has_websocket());

        let err = client
            .with_websocket(WsConfig::new("ws://localhost:4000/graphql"))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::WebSocketAlreadyConfigured);
    }

    #[test]
    fn test_unknown_operation() {
        let schema = Schema::builder()
            .object("User", ObjectDefinition::new().field("id", "Int!"))
            .query("me", OperationDefinition::returns("User"))
            .build()
            .unwrap();
        let client = Client::with_transport(Offline).with_schema(schema);

        assert!(client.query("me").is_ok());
        assert_eq!(client.query("you").unwrap_err().code, ErrorCode::UnknownOperation);
        assert_eq!(client.mutation("me").unwrap_err().code, ErrorCode::UnknownOperation);
    }

    #[test]
    fn test_with_schema_json() {
        let err = Client::with_transport(Offline)
            .with_schema_json(&json!({ "Query": { "me": ["=>", "Missing"] } }))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::SchemaError);
    }

    #[test]
    fn test_default_selection_error_is_kept_per_operation() {
        let schema = Schema::builder()
            .object("Node", ObjectDefinition::new().field("id", "Int!").field("parent", "Node"))
            .query("node", OperationDefinition::returns("Node"))
            .query("count", OperationDefinition::returns("Int!"))
            .build()
            .unwrap();
        let client = Client::with_transport(Offline).with_schema(schema);

        let node = client.schema().operation(tgql_schema::OperationKind::Query, "node").unwrap();
        assert_eq!(
            client.default_selection(node).unwrap_err().code,
            ErrorCode::InvalidSelection
        );
        let count = client.schema().operation(tgql_schema::OperationKind::Query, "count").unwrap();
        assert!(client.default_selection(count).unwrap().is_empty());
    }
}
