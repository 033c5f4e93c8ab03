//! Typed errors for the tgql client.
//!
//! Every failure carries an [`ErrorCode`] so callers can branch on the kind
//! of problem without matching message text.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use tgql_schema::{SchemaError, SchemaErrors};

/// Typed error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum ErrorCode {
    // Network errors
    NetworkError,
    Timeout,
    ConnectionRefused,

    // Protocol errors
    HttpError,
    HttpsNotSupported,
    InvalidUrl,
    InvalidResponse,

    // GraphQL errors
    ExecutionError,
    NoData,

    // Configuration errors
    SchemaError,
    UnknownOperation,
    MissingInput,
    InvalidInput,
    InvalidSelection,
    NoWebSocketClient,
    WebSocketAlreadyConfigured,

    // Subscription transport
    WebSocketError,

    // Serialization errors
    SerializeError,
    DeserializeError,
    ScalarError,

    InternalError,
}

impl ErrorCode {
    /// Returns the string representation of the error code.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::ConnectionRefused => "CONNECTION_REFUSED",
            Self::HttpError => "HTTP_ERROR",
            Self::HttpsNotSupported => "HTTPS_NOT_SUPPORTED",
            Self::InvalidUrl => "INVALID_URL",
            Self::InvalidResponse => "INVALID_RESPONSE",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::NoData => "NO_DATA",
            Self::SchemaError => "SCHEMA_ERROR",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
            Self::MissingInput => "MISSING_INPUT",
            Self::InvalidInput => "INVALID_INPUT",
            Self::InvalidSelection => "INVALID_SELECTION",
            Self::NoWebSocketClient => "NO_WEBSOCKET_CLIENT",
            Self::WebSocketAlreadyConfigured => "WEBSOCKET_ALREADY_CONFIGURED",
            Self::WebSocketError => "WEBSOCKET_ERROR",
            Self::SerializeError => "SERIALIZE_ERROR",
            Self::DeserializeError => "DESERIALIZE_ERROR",
            Self::ScalarError => "SCALAR_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Returns true if a request failing with this code may be retried.
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::Timeout | Self::ConnectionRefused
        )
    }

    /// Returns true for mistakes in how the client was set up or called.
    ///
    /// These are reported synchronously, before anything is sent.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::SchemaError
                | Self::UnknownOperation
                | Self::MissingInput
                | Self::InvalidInput
                | Self::InvalidSelection
                | Self::NoWebSocketClient
                | Self::WebSocketAlreadyConfigured
                | Self::InvalidUrl
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SDK error.
#[derive(Error, Debug, Clone)]
#[error("[{code}] {message}")]
pub struct SdkError {
    pub code: ErrorCode,
    pub message: String,
    #[source]
    pub source: Option<Box<SdkError>>,
    /// Structured data, such as the server's `errors` array.
    pub extensions: Option<HashMap<String, serde_json::Value>>,
}

impl SdkError {
    /// Creates a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            extensions: None,
        }
    }

    /// Adds a source error.
    #[must_use]
    pub fn with_source(mut self, source: SdkError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Adds extension data.
    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let extensions = self.extensions.get_or_insert_with(HashMap::new);
        if let Ok(v) = serde_json::to_value(value) {
            extensions.insert(key.into(), v);
        }
        self
    }

    /// Looks up an extension.
    pub fn extension(&self, key: &str) -> Option<&serde_json::Value> {
        self.extensions.as_ref()?.get(key)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NetworkError, message)
    }

    pub fn timeout() -> Self {
        Self::new(ErrorCode::Timeout, "Request timed out")
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidResponse, message)
    }

    pub fn serialize(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SerializeError, message)
    }

    pub fn deserialize(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DeserializeError, message)
    }

    pub fn websocket(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::WebSocketError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true if this error was raised before anything was sent.
    pub fn is_configuration_error(&self) -> bool {
        self.code.is_configuration_error()
    }
}

impl Serialize for SdkError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("SdkError", 3)?;
        state.serialize_field("code", &self.code)?;
        state.serialize_field("message", &self.message)?;
        if let Some(ref ext) = self.extensions {
            state.serialize_field("extensions", ext)?;
        }
        state.end()
    }
}

impl From<SchemaError> for SdkError {
    fn from(error: SchemaError) -> Self {
        let code = match error {
            SchemaError::UnknownOperation { .. } => ErrorCode::UnknownOperation,
            SchemaError::AutoSelectRequiresArguments { .. }
            | SchemaError::AutoSelectCycle { .. }
            | SchemaError::UnknownField { .. }
            | SchemaError::MissingSelection { .. }
            | SchemaError::UnexpectedSelection { .. }
            | SchemaError::MissingArgument { .. }
            | SchemaError::InvalidArguments { .. }
            | SchemaError::NotAnObject { .. } => ErrorCode::InvalidSelection,
            _ => ErrorCode::SchemaError,
        };
        Self::new(code, error.to_string())
    }
}

impl From<SchemaErrors> for SdkError {
    fn from(errors: SchemaErrors) -> Self {
        let messages: Vec<String> = errors.errors().iter().map(ToString::to_string).collect();
        Self::new(ErrorCode::SchemaError, errors.to_string()).with_extension("errors", messages)
    }
}

/// Type alias for SDK results.
pub type SdkResult<T> = std::result::Result<T, SdkError>;

/// Result extension for mapping foreign errors onto a code.
pub trait ResultExt<T> {
    /// Maps the error to an SdkError with the given code.
    fn map_sdk_err(self, code: ErrorCode) -> SdkResult<T>;

    /// Maps the error to an SdkError with the given code and message, keeping
    /// the original text as the `original_error` extension.
    fn map_sdk_err_with(self, code: ErrorCode, message: impl Into<String>) -> SdkResult<T>;
}

impl<T, E: fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn map_sdk_err(self, code: ErrorCode) -> SdkResult<T> {
        self.map_err(|e| SdkError::new(code, e.to_string()))
    }

    fn map_sdk_err_with(self, code: ErrorCode, message: impl Into<String>) -> SdkResult<T> {
        self.map_err(|e| {
            SdkError::new(code, message).with_extension("original_error", e.to_string())
        })
    }
}
