//! Operation calls.
//!
//! `client.query("user")` returns an [`OperationCall`]. What can be done
//! with it depends on how many required input fields the operation declares:
//!
//! | required inputs | await directly | `select` | `by` | `by_field` / `abbreviated` |
//! |-----------------|----------------|----------|------|-----------------------------|
//! | none (no input) | yes            | yes      | no   | no                          |
//! | 0 (all `?`)     | yes            | yes      | yes  | every field                 |
//! | 1               | no             | yes      | yes  | the required field          |
//! | 2 or more       | no             | yes      | yes  | no                          |
//!
//! Every path ends in a [`Pending`] request. Nothing is sent until a
//! `Pending` is awaited or subscribed; refining a call with `select` or `by`
//! supersedes the request the call would otherwise have sent, so a
//! superseded request resolves to `null` without reaching the transport.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tgql_query::{build_query_string, check_selection, parse_selector, QueryNode, Selectable, SelectorBuilder};
use tgql_schema::{OperationDescriptor, OperationKind};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::client::SchemaClient;
use crate::coerce::{parse_output, serialize_variables};
use crate::error::{ErrorCode, SdkError, SdkResult};
use crate::transport::{execution_error, GraphQLResponse, RequestBody};
use crate::ws::{SubscriptionSink, Unsubscribe};

mod sealed {
    pub trait Sealed {}
}

/// The operation type of a call.
pub trait Mode: sealed::Sealed + Send + Sync + 'static {
    const KIND: OperationKind;
}

/// Modes whose requests are awaited for a single result.
pub trait RequestMode: Mode {}

#[derive(Debug, Clone, Copy)]
pub struct Query;

#[derive(Debug, Clone, Copy)]
pub struct Mutation;

#[derive(Debug, Clone, Copy)]
pub struct Subscription;

macro_rules! modes {
    ($($mode:ident => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $mode {}
            impl Mode for $mode {
                const KIND: OperationKind = OperationKind::$kind;
            }
        )*
    };
}

modes!(Query => Query, Mutation => Mutation, Subscription => Subscription);

impl RequestMode for Query {}
impl RequestMode for Mutation {}

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// An operation picked by name, not yet sent.
///
/// Unknown operations and bad preset variables fail when the call is
/// created. Problems with the default all-fields request are kept until it
/// is used: awaiting the call, or calling [`request`](Self::request), reports
/// `AutoSelectRequiresArguments`, `AutoSelectCycle` or a missing required
/// input, while `select` and `by` on the same call still work.
pub struct OperationCall<M: Mode> {
    client: SchemaClient,
    descriptor: Arc<OperationDescriptor>,
    /// Variables given with `query_with`.
    preset: Option<Map<String, Value>>,
    /// The request sent when the call itself is awaited.
    default: SdkResult<Pending<M>>,
}

impl<M: Mode> OperationCall<M> {
    pub(crate) fn new(client: SchemaClient, name: &str, preset: Option<Value>) -> SdkResult<Self> {
        let descriptor = client.schema().operation(M::KIND, name)?.clone();
        let preset = preset
            .map(|variables| check_input(&descriptor, variables))
            .transpose()?;
        let default = client
            .default_selection(&descriptor)
            .and_then(|nodes| default_request(&client, &descriptor, &nodes, preset.as_ref()));

        Ok(Self {
            client,
            descriptor,
            preset,
            default,
        })
    }

    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// The request awaiting this call would send.
    pub fn request(&self) -> SdkResult<Pending<M>> {
        self.default.clone()
    }

    /// Narrows the result to the fields picked by `selector`.
    pub fn select<F>(&self, selector: F) -> SdkResult<Selection<M>>
    where
        F: FnOnce(&SelectorBuilder) -> Vec<QueryNode>,
    {
        self.select_nodes(parse_selector(selector))
    }

    /// Selects the fields of `T`, as derived by `#[derive(Selectable)]`.
    pub fn select_as<T: Selectable>(&self) -> SdkResult<Selection<M>> {
        self.select_nodes(T::selection())
    }

    /// Selects an already built selection.
    pub fn select_nodes(&self, nodes: Vec<QueryNode>) -> SdkResult<Selection<M>> {
        if self.descriptor.terminal {
            return Err(SdkError::new(
                ErrorCode::InvalidSelection,
                format!(
                    "Operation '{}' returns '{}', which has no fields to select",
                    self.descriptor.qualified_name(),
                    self.descriptor.return_type
                ),
            ));
        }
        check_selection(
            self.client.schema().registry(),
            self.descriptor.kind.section(),
            &self.descriptor.name,
            &self.descriptor.return_type,
            &nodes,
        )?;
        self.supersede();

        let default = default_request(&self.client, &self.descriptor, &nodes, self.preset.as_ref());
        Ok(Selection {
            client: self.client.clone(),
            descriptor: self.descriptor.clone(),
            preset: self.preset.clone(),
            nodes,
            default,
        })
    }

    /// Supplies the input, keeping the all-fields selection.
    pub fn by(&self, input: Value) -> SdkResult<Pending<M>> {
        let nodes = self.client.default_selection(&self.descriptor)?;
        let pending = by_request(&self.client, &self.descriptor, &nodes, self.preset.as_ref(), input)?;
        self.supersede();
        Ok(pending)
    }

    /// Supplies a single input field, e.g. `by_field("id", 1.into())`.
    pub fn by_field(&self, field: &str, value: Value) -> SdkResult<Pending<M>> {
        self.by(single_field(&self.descriptor, field, value)?)
    }

    /// Supplies a single input field through its shortcut name, e.g. `"byId"`.
    pub fn abbreviated(&self, shortcut: &str, value: Value) -> SdkResult<Pending<M>> {
        let field = resolve_shortcut(&self.descriptor, shortcut)?;
        self.by_field(&field, value)
    }

    /// Marks the default request as replaced.
    fn supersede(&self) {
        if let Ok(default) = &self.default {
            default.supersede();
        }
    }
}

impl<M: RequestMode> OperationCall<M> {
    /// Awaits the call and deserializes the result.
    pub async fn decode<T: DeserializeOwned>(self) -> SdkResult<T> {
        self.default?.decode().await
    }
}

impl OperationCall<Subscription> {
    pub fn subscribe<N>(&self, on_next: N) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
    {
        self.request()?.subscribe(on_next)
    }

    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
        E: FnMut(SdkError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.request()?.subscribe_with(on_next, on_error, on_complete)
    }
}

impl<M: RequestMode> IntoFuture for OperationCall<M> {
    type Output = SdkResult<Value>;
    type IntoFuture = BoxFuture<SdkResult<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        let default = self.default;
        Box::pin(async move { default?.await })
    }
}

impl<M: Mode> fmt::Debug for OperationCall<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationCall")
            .field("operation", &self.descriptor.qualified_name())
            .field("preset", &self.preset)
            .finish_non_exhaustive()
    }
}

/// An operation call with a chosen selection.
pub struct Selection<M: Mode> {
    client: SchemaClient,
    descriptor: Arc<OperationDescriptor>,
    preset: Option<Map<String, Value>>,
    nodes: Vec<QueryNode>,
    default: SdkResult<Pending<M>>,
}

impl<M: Mode> Selection<M> {
    pub fn nodes(&self) -> &[QueryNode] {
        &self.nodes
    }

    /// The request awaiting this selection would send.
    pub fn request(&self) -> SdkResult<Pending<M>> {
        self.default.clone()
    }

    /// Supplies the input.
    pub fn by(&self, input: Value) -> SdkResult<Pending<M>> {
        let pending = by_request(&self.client, &self.descriptor, &self.nodes, self.preset.as_ref(), input)?;
        if let Ok(default) = &self.default {
            default.supersede();
        }
        Ok(pending)
    }

    pub fn by_field(&self, field: &str, value: Value) -> SdkResult<Pending<M>> {
        self.by(single_field(&self.descriptor, field, value)?)
    }

    pub fn abbreviated(&self, shortcut: &str, value: Value) -> SdkResult<Pending<M>> {
        let field = resolve_shortcut(&self.descriptor, shortcut)?;
        self.by_field(&field, value)
    }
}

impl<M: RequestMode> Selection<M> {
    pub async fn decode<T: DeserializeOwned>(self) -> SdkResult<T> {
        self.default?.decode().await
    }
}

impl Selection<Subscription> {
    pub fn subscribe<N>(&self, on_next: N) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
    {
        self.request()?.subscribe(on_next)
    }

    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
        E: FnMut(SdkError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.request()?.subscribe_with(on_next, on_error, on_complete)
    }
}

impl<M: RequestMode> IntoFuture for Selection<M> {
    type Output = SdkResult<Value>;
    type IntoFuture = BoxFuture<SdkResult<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        let default = self.default;
        Box::pin(async move { default?.await })
    }
}

impl<M: Mode> fmt::Debug for Selection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("operation", &self.descriptor.qualified_name())
            .field("nodes", &self.nodes)
            .finish_non_exhaustive()
    }
}

/// A fully specified request.
///
/// Clones share one dispatch: however many of them are awaited, the
/// transport is called at most once.
pub struct Pending<M: Mode> {
    dispatch: Arc<Dispatch>,
    _mode: PhantomData<fn() -> M>,
}

struct Dispatch {
    client: SchemaClient,
    descriptor: Arc<OperationDescriptor>,
    body: RequestBody,
    superseded: AtomicBool,
    outcome: OnceCell<SdkResult<Value>>,
}

impl<M: Mode> Pending<M> {
    fn new(client: SchemaClient, descriptor: Arc<OperationDescriptor>, body: RequestBody) -> Self {
        Self {
            dispatch: Arc::new(Dispatch {
                client,
                descriptor,
                body,
                superseded: AtomicBool::new(false),
                outcome: OnceCell::new(),
            }),
            _mode: PhantomData,
        }
    }

    /// The GraphQL document this request sends.
    pub fn to_query_string(&self) -> &str {
        &self.dispatch.body.query
    }

    /// The `{query, variables}` body this request sends.
    pub fn to_request_body(&self) -> &RequestBody {
        &self.dispatch.body
    }

    pub fn is_superseded(&self) -> bool {
        self.dispatch.superseded.load(Ordering::Acquire)
    }

    fn supersede(&self) {
        self.dispatch.superseded.store(true, Ordering::Release);
    }
}

impl<M: RequestMode> Pending<M> {
    /// Awaits the request and deserializes the result into `T`.
    pub async fn decode<T: DeserializeOwned>(self) -> SdkResult<T> {
        let value = self.await?;
        serde_json::from_value(value).map_err(|e| SdkError::deserialize(e.to_string()))
    }
}

impl Pending<Subscription> {
    /// Subscribes, forwarding results to `on_next`. Errors end the
    /// subscription silently.
    pub fn subscribe<N>(&self, on_next: N) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
    {
        self.subscribe_with(on_next, |_| {}, || {})
    }

    /// Subscribes with separate result, error and completion callbacks.
    ///
    /// Fails synchronously when the client has no WebSocket transport.
    pub fn subscribe_with<N, E, C>(&self, on_next: N, on_error: E, on_complete: C) -> SdkResult<Unsubscribe>
    where
        N: FnMut(Value) + Send + 'static,
        E: FnMut(SdkError) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let dispatch = &self.dispatch;
        let transport = dispatch.client.ws()?;
        if self.is_superseded() {
            debug!(operation = %dispatch.descriptor.qualified_name(), "superseded subscription skipped");
            return Ok(Unsubscribe::new(|| {}));
        }

        debug!(operation = %dispatch.descriptor.qualified_name(), "subscribing");
        let sink = CallbackSink {
            client: dispatch.client.clone(),
            descriptor: dispatch.descriptor.clone(),
            on_next,
            on_error,
            on_complete: Some(on_complete),
        };
        transport.subscribe(dispatch.body.clone(), Box::new(sink))
    }
}

impl<M: Mode> Clone for Pending<M> {
    fn clone(&self) -> Self {
        Self {
            dispatch: self.dispatch.clone(),
            _mode: PhantomData,
        }
    }
}

impl<M: RequestMode> IntoFuture for Pending<M> {
    type Output = SdkResult<Value>;
    type IntoFuture = BoxFuture<SdkResult<Value>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move { self.dispatch.resolve().await })
    }
}

impl<M: Mode> fmt::Debug for Pending<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pending")
            .field("operation", &self.dispatch.descriptor.qualified_name())
            .field("body", &self.dispatch.body)
            .field("superseded", &self.is_superseded())
            .finish()
    }
}

impl Dispatch {
    async fn resolve(&self) -> SdkResult<Value> {
        self.outcome.get_or_init(|| self.send()).await.clone()
    }

    async fn send(&self) -> SdkResult<Value> {
        let operation = self.descriptor.qualified_name();
        if self.superseded.load(Ordering::Acquire) {
            debug!(%operation, "superseded request skipped");
            return Ok(Value::Null);
        }

        debug!(%operation, "dispatching request");
        let response = self.client.http().request(&self.body).await?;
        if !response.errors.is_empty() {
            return Err(execution_error(&response.errors));
        }
        let data = response
            .data
            .ok_or_else(|| SdkError::new(ErrorCode::NoData, format!("No data for '{operation}'")))?;
        unwrap_field(&self.client, &self.descriptor, data)
    }
}

/// Takes the operation's own field out of `data` and parses scalars in it.
fn unwrap_field(client: &SchemaClient, descriptor: &OperationDescriptor, mut data: Value) -> SdkResult<Value> {
    let value = data
        .get_mut(&descriptor.name)
        .map(Value::take)
        .unwrap_or(Value::Null);
    parse_output(client.schema().registry(), &descriptor.return_type, value)
}

struct CallbackSink<N, E, C> {
    client: SchemaClient,
    descriptor: Arc<OperationDescriptor>,
    on_next: N,
    on_error: E,
    on_complete: Option<C>,
}

impl<N, E, C> SubscriptionSink for CallbackSink<N, E, C>
where
    N: FnMut(Value) + Send + 'static,
    E: FnMut(SdkError) + Send + 'static,
    C: FnOnce() + Send + 'static,
{
    fn next(&mut self, response: GraphQLResponse) {
        if !response.errors.is_empty() {
            (self.on_error)(execution_error(&response.errors));
        }
        if let Some(data) = response.data {
            match unwrap_field(&self.client, &self.descriptor, data) {
                Ok(value) => (self.on_next)(value),
                Err(error) => (self.on_error)(error),
            }
        }
    }

    fn error(&mut self, error: SdkError) {
        (self.on_error)(error);
    }

    fn complete(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            on_complete();
        }
    }
}

/// Checks an input object against the operation's declared input fields.
fn check_input(descriptor: &OperationDescriptor, input: Value) -> SdkResult<Map<String, Value>> {
    let operation = descriptor.qualified_name();
    let input = expect_object(&operation, input)?;
    if !descriptor.has_input && !input.is_empty() {
        return Err(SdkError::new(
            ErrorCode::InvalidInput,
            format!("Operation '{operation}' takes no input"),
        ));
    }
    if let Some(unknown) = input.keys().find(|key| descriptor.input_type(key).is_none()) {
        return Err(SdkError::new(
            ErrorCode::InvalidInput,
            format!("Operation '{operation}' has no input field '{unknown}'"),
        ));
    }
    if let Some(missing) = descriptor.required.iter().find(|field| !input.contains_key(*field)) {
        return Err(SdkError::new(
            ErrorCode::MissingInput,
            format!("Operation '{operation}' is missing required input '{missing}'"),
        ));
    }
    Ok(input)
}

fn expect_object(operation: &str, input: Value) -> SdkResult<Map<String, Value>> {
    match input {
        Value::Object(input) => Ok(input),
        other => Err(SdkError::new(
            ErrorCode::InvalidInput,
            format!("Input for '{operation}' must be a JSON object, found {other}"),
        )),
    }
}

fn default_request<M: Mode>(
    client: &SchemaClient,
    descriptor: &Arc<OperationDescriptor>,
    nodes: &[QueryNode],
    preset: Option<&Map<String, Value>>,
) -> SdkResult<Pending<M>> {
    let input = match preset {
        Some(preset) => preset.clone(),
        None if descriptor.required.is_empty() => Map::new(),
        None => {
            let hint = match descriptor.abbreviations.keys().next() {
                Some(shortcut) => format!("`.by(...)` or `.abbreviated(\"{shortcut}\", ...)`"),
                None => "`.by(...)`".to_owned(),
            };
            return Err(SdkError::new(
                ErrorCode::MissingInput,
                format!(
                    "Operation '{}' has required input; supply it with {hint} before awaiting",
                    descriptor.qualified_name()
                ),
            ));
        }
    };
    build_request(client, descriptor, nodes, input)
}

fn by_request<M: Mode>(
    client: &SchemaClient,
    descriptor: &Arc<OperationDescriptor>,
    nodes: &[QueryNode],
    preset: Option<&Map<String, Value>>,
    input: Value,
) -> SdkResult<Pending<M>> {
    if !descriptor.has_input {
        return Err(SdkError::new(
            ErrorCode::InvalidInput,
            format!(
                "Operation '{}' takes no input; await it directly",
                descriptor.qualified_name()
            ),
        ));
    }
    let mut merged = preset.cloned().unwrap_or_default();
    merged.extend(expect_object(&descriptor.qualified_name(), input)?);
    let input = check_input(descriptor, Value::Object(merged))?;
    build_request(client, descriptor, nodes, input)
}

fn build_request<M: Mode>(
    client: &SchemaClient,
    descriptor: &Arc<OperationDescriptor>,
    nodes: &[QueryNode],
    input: Map<String, Value>,
) -> SdkResult<Pending<M>> {
    let variables = serialize_variables(client.schema().registry(), descriptor, input)?;
    let query = build_query_string(descriptor.kind, &descriptor.name, &descriptor.variables, nodes);
    let body = RequestBody {
        query,
        variables: Value::Object(variables),
    };
    Ok(Pending::new(client.clone(), descriptor.clone(), body))
}

fn single_field(descriptor: &OperationDescriptor, field: &str, value: Value) -> SdkResult<Value> {
    if !descriptor.is_abbreviable(field) {
        return Err(SdkError::new(
            ErrorCode::InvalidInput,
            format!(
                "Operation '{}' has no abbreviated form for '{field}'; use `.by(...)`",
                descriptor.qualified_name()
            ),
        ));
    }
    let mut input = Map::new();
    input.insert(field.to_owned(), value);
    Ok(Value::Object(input))
}

fn resolve_shortcut(descriptor: &OperationDescriptor, shortcut: &str) -> SdkResult<String> {
    descriptor
        .abbreviation(shortcut)
        .map(str::to_owned)
        .ok_or_else(|| {
            SdkError::new(
                ErrorCode::InvalidInput,
                format!(
                    "Operation '{}' has no shortcut '{shortcut}'",
                    descriptor.qualified_name()
                ),
            )
        })
}
