//! Subscriptions over WebSocket.
//!
//! [`WsClient`] speaks the `graphql-transport-ws` protocol with one socket
//! per subscription:
//!
//! ```text
//! client                         server
//!   connection_init  ───────────▶
//!                    ◀─────────── connection_ack
//!   subscribe {id}   ───────────▶
//!                    ◀─────────── next {id, payload}   (repeated)
//!                    ◀─────────── complete {id} | error {id, payload}
//!   complete {id}    ───────────▶ (on unsubscribe)
//! ```

use std::collections::HashMap;
use std::fmt;

use futures_util::{SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::oneshot;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::{header, HeaderName, HeaderValue};
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, trace};

use crate::error::{ErrorCode, ResultExt, SdkError, SdkResult};
use crate::transport::{execution_error, GraphQLError, GraphQLResponse, RequestBody};

/// Sub-protocol name sent in `Sec-WebSocket-Protocol`.
pub const GRAPHQL_TRANSPORT_WS_PROTOCOL: &str = "graphql-transport-ws";

/// Each socket carries exactly one operation.
const OPERATION_ID: &str = "1";

/// Receives the events of one subscription.
pub trait SubscriptionSink: Send + 'static {
    /// A `next` payload, with `data`, `errors` or both.
    fn next(&mut self, response: GraphQLResponse);
    /// The subscription failed; no further events follow.
    fn error(&mut self, error: SdkError);
    /// The server finished the subscription; no further events follow.
    fn complete(&mut self);
}

/// Starts subscriptions.
pub trait SubscriptionTransport: Send + Sync {
    /// Registers a subscription and returns its cancellation handle.
    ///
    /// Events are delivered to `sink` asynchronously.
    fn subscribe(
        &self,
        body: RequestBody,
        sink: Box<dyn SubscriptionSink>,
    ) -> SdkResult<Unsubscribe>;
}

/// Cancels a running subscription.
///
/// Dropping the handle leaves the subscription running; only
/// [`Unsubscribe::unsubscribe`] stops it.
#[must_use = "dropping the handle does not cancel the subscription"]
pub struct Unsubscribe {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Unsubscribe {
    pub fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("pending", &self.cancel.is_some())
            .finish()
    }
}

/// WebSocket endpoint configuration.
#[derive(Debug, Clone, Default)]
pub struct WsConfig {
    /// `ws://` or `wss://` URL.
    pub url: String,
    /// Payload of the `connection_init` message.
    pub connection_params: Option<Value>,
    /// Extra headers on the upgrade request.
    pub headers: HashMap<String, String>,
}

impl WsConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn connection_params(mut self, params: Value) -> Self {
        self.connection_params = Some(params);
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// `graphql-transport-ws` client.
#[derive(Debug, Clone)]
pub struct WsClient {
    config: WsConfig,
}

impl WsClient {
    pub fn new(config: WsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }
}

impl SubscriptionTransport for WsClient {
    fn subscribe(
        &self,
        body: RequestBody,
        mut sink: Box<dyn SubscriptionSink>,
    ) -> SdkResult<Unsubscribe> {
        let runtime = tokio::runtime::Handle::try_current().map_sdk_err_with(
            ErrorCode::WebSocketError,
            "Subscriptions must be started inside a tokio runtime",
        )?;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let config = self.config.clone();
        runtime.spawn(async move {
            if let Err(error) = run(&config, &body, sink.as_mut(), cancel_rx).await {
                debug!(url = %config.url, %error, "subscription failed");
                sink.error(error);
            }
        });

        Ok(Unsubscribe::new(move || {
            let _ = cancel_tx.send(());
        }))
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage<'a> {
    ConnectionInit {
        #[serde(skip_serializing_if = "Option::is_none")]
        payload: Option<&'a Value>,
    },
    Subscribe {
        id: &'a str,
        payload: &'a RequestBody,
    },
    Complete {
        id: &'a str,
    },
    Pong,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    ConnectionAck {
        #[serde(default)]
        #[allow(dead_code)]
        payload: Option<Value>,
    },
    Next {
        id: String,
        payload: GraphQLResponse,
    },
    Error {
        id: String,
        payload: Vec<GraphQLError>,
    },
    Complete {
        id: String,
    },
    Ping {
        #[serde(default)]
        #[allow(dead_code)]
        payload: Option<Value>,
    },
    Pong {
        #[serde(default)]
        #[allow(dead_code)]
        payload: Option<Value>,
    },
}

async fn run(
    config: &WsConfig,
    body: &RequestBody,
    sink: &mut dyn SubscriptionSink,
    mut cancel: oneshot::Receiver<()>,
) -> SdkResult<()> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .map_sdk_err(ErrorCode::InvalidUrl)?;
    let headers = request.headers_mut();
    headers.insert(
        header::SEC_WEBSOCKET_PROTOCOL,
        HeaderValue::from_static(GRAPHQL_TRANSPORT_WS_PROTOCOL),
    );
    for (key, value) in &config.headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_sdk_err(ErrorCode::InvalidInput)?;
        let value = HeaderValue::from_str(value).map_sdk_err(ErrorCode::InvalidInput)?;
        headers.insert(name, value);
    }

    let (socket, _) = connect_async(request)
        .await
        .map_sdk_err(ErrorCode::ConnectionRefused)?;
    debug!(url = %config.url, "websocket connected");
    let (mut write, mut read) = socket.split();

    let init = ClientMessage::ConnectionInit {
        payload: config.connection_params.as_ref(),
    };
    write.send(encode(&init)?).await.map_sdk_err(ErrorCode::WebSocketError)?;

    loop {
        match next_message(&mut read).await? {
            Some(ServerMessage::ConnectionAck { .. }) => break,
            Some(ServerMessage::Ping { .. }) => {
                write.send(encode(&ClientMessage::Pong)?).await.map_sdk_err(ErrorCode::WebSocketError)?;
            }
            Some(other) => {
                return Err(SdkError::websocket(format!(
                    "Expected connection_ack, received {other:?}"
                )))
            }
            None => return Err(SdkError::websocket("Connection closed before acknowledgement")),
        }
    }

    let subscribe = ClientMessage::Subscribe {
        id: OPERATION_ID,
        payload: body,
    };
    write.send(encode(&subscribe)?).await.map_sdk_err(ErrorCode::WebSocketError)?;

    loop {
        tokio::select! {
            Ok(()) = &mut cancel => {
                debug!(url = %config.url, "unsubscribing");
                write
                    .send(encode(&ClientMessage::Complete { id: OPERATION_ID })?)
                    .await
                    .map_sdk_err(ErrorCode::WebSocketError)?;
                let _ = write.close().await;
                return Ok(());
            }
            message = next_message(&mut read) => match message? {
                Some(ServerMessage::Next { id, payload }) if id == OPERATION_ID => sink.next(payload),
                Some(ServerMessage::Error { id, payload }) if id == OPERATION_ID => {
                    sink.error(execution_error(&payload));
                    return Ok(());
                }
                Some(ServerMessage::Complete { id }) if id == OPERATION_ID => {
                    sink.complete();
                    return Ok(());
                }
                Some(ServerMessage::Ping { .. }) => {
                    write.send(encode(&ClientMessage::Pong)?).await.map_sdk_err(ErrorCode::WebSocketError)?;
                }
                Some(_) => {}
                None => {
                    sink.complete();
                    return Ok(());
                }
            },
        }
    }
}

fn encode(message: &ClientMessage<'_>) -> SdkResult<Message> {
    let text = serde_json::to_string(message).map_err(|e| SdkError::serialize(e.to_string()))?;
    trace!(frame = %text, "websocket send");
    Ok(Message::text(text))
}

/// Reads frames until a protocol message arrives. `None` when the socket closes.
async fn next_message<S>(read: &mut S) -> SdkResult<Option<ServerMessage>>
where
    S: Stream<Item = Result<Message, WsError>> + Unpin,
{
    while let Some(frame) = read.next().await {
        match frame.map_sdk_err(ErrorCode::WebSocketError)? {
            Message::Text(text) => {
                trace!(frame = %text.as_str(), "websocket receive");
                return decode(text.as_str()).map(Some);
            }
            Message::Close(_) => return Ok(None),
            _ => {}
        }
    }
    Ok(None)
}

fn decode(text: &str) -> SdkResult<ServerMessage> {
    serde_json::from_str(text).map_sdk_err_with(ErrorCode::WebSocketError, "Invalid protocol message")
}
