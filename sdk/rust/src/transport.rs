//! GraphQL over HTTP.
//!
//! Requests are `POST`ed as `{"query", "variables"}` JSON bodies. The
//! built-in [`HttpClient`] speaks plain HTTP/1.1 over a tokio TCP socket;
//! anything else can be plugged in through [`HttpTransport`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::error::{ErrorCode, SdkError, SdkResult};

/// The body of a GraphQL request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestBody {
    pub query: String,
    pub variables: Value,
}

/// A GraphQL response as sent by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQLResponse {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl GraphQLResponse {
    /// A successful response carrying `data`.
    pub fn from_data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }
}

/// One entry of a response's `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<HashMap<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }
}

/// Folds a non-empty `errors` array into one [`ErrorCode::ExecutionError`].
///
/// The messages are joined for display; the full entries are kept as the
/// `errors` extension.
pub(crate) fn execution_error(errors: &[GraphQLError]) -> SdkError {
    let message = errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    SdkError::new(ErrorCode::ExecutionError, message).with_extension("errors", errors)
}

/// Sends queries and mutations.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn request(&self, body: &RequestBody) -> SdkResult<GraphQLResponse>;
}

/// How failed requests are retried.
///
/// Only retryable errors (network failures, timeouts, refused connections)
/// are retried; the wait doubles after every attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Never retry.
    pub const NONE: Self = Self {
        max_retries: 0,
        base_delay: Duration::ZERO,
    };

    pub const fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// The wait before retry number `attempt` (starting at 1).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

/// Settings of the built-in [`HttpClient`].
///
/// `timeout` bounds each of connect, write and read separately.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub url: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Extra headers, sent in insertion order after the fixed ones.
    pub headers: Vec<(String, String)>,
}

impl ClientConfig {
    /// Settings for `url` with a 30 second timeout and the default retry policy.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
            headers: Vec::new(),
        }
    }

    /// Sets the per-step timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Adds a header such as `Authorization`, replacing an earlier one of
    /// the same name.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }
}

/// HTTP/1.1 client over a plain TCP socket.
#[derive(Debug, Clone)]
pub struct HttpClient {
    config: ClientConfig,
}

impl HttpClient {
    /// Creates a client; nothing is connected until the first request.
    pub fn new(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post(&self, body: &str) -> SdkResult<String> {
        let (host, port, path) = parse_url(&self.config.url)?;

        let mut stream = timeout(self.config.timeout, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| SdkError::timeout())?
            .map_err(|e| {
                SdkError::new(
                    ErrorCode::ConnectionRefused,
                    format!("Connection failed: {e}"),
                )
            })?;

        let mut request = format!(
            "POST {path} HTTP/1.1\r\n\
             Host: {host}\r\n\
             Content-Type: application/json\r\n\
             Accept: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n",
            body.len()
        );
        for (key, value) in &self.config.headers {
            request.push_str(&format!("{key}: {value}\r\n"));
        }
        request.push_str("\r\n");
        request.push_str(body);

        timeout(self.config.timeout, stream.write_all(request.as_bytes()))
            .await
            .map_err(|_| SdkError::timeout())?
            .map_err(|e| SdkError::network(format!("Write failed: {e}")))?;

        let mut response = Vec::new();
        timeout(self.config.timeout, stream.read_to_end(&mut response))
            .await
            .map_err(|_| SdkError::timeout())?
            .map_err(|e| SdkError::network(format!("Read failed: {e}")))?;

        parse_http_response(&response)
    }
}

#[async_trait]
impl HttpTransport for HttpClient {
    async fn request(&self, body: &RequestBody) -> SdkResult<GraphQLResponse> {
        let payload = serde_json::to_string(body).map_err(|e| SdkError::serialize(e.to_string()))?;
        let mut last_error = SdkError::network("No attempts made");

        let retry = self.config.retry;
        for attempt in 0..=retry.max_retries {
            if attempt > 0 {
                let delay = retry.backoff(attempt);
                warn!(attempt, ?delay, error = %last_error, "retrying request");
                tokio::time::sleep(delay).await;
            }

            match self.post(&payload).await {
                Ok(text) => {
                    debug!(url = %self.config.url, bytes = text.len(), "response received");
                    return serde_json::from_str(&text).map_err(|e| {
                        SdkError::invalid_response(format!(
                            "Failed to parse response: {e}. Body: {}",
                            text.chars().take(200).collect::<String>()
                        ))
                    });
                }
                Err(e) if e.is_retryable() => last_error = e,
                Err(e) => return Err(e),
            }
        }

        Err(last_error)
    }
}

/// Splits an `http://` URL into host, port and path.
pub(crate) fn parse_url(url: &str) -> SdkResult<(String, u16, String)> {
    let url = url.trim();
    if url.starts_with("https://") {
        return Err(SdkError::new(
            ErrorCode::HttpsNotSupported,
            "HTTPS is not supported by the built-in HTTP client; plug in an HttpTransport",
        ));
    }
    let rest = url.strip_prefix("http://").unwrap_or(url);
    if rest.is_empty() {
        return Err(SdkError::new(ErrorCode::InvalidUrl, "Missing host"));
    }

    let (host_port, path) = match rest.find('/') {
        Some(slash) => (&rest[..slash], &rest[slash..]),
        None => (rest, "/"),
    };

    let (host, port) = match host_port.rfind(':') {
        Some(colon) => {
            let port_str = &host_port[colon + 1..];
            let port = port_str.parse().map_err(|_| {
                SdkError::new(ErrorCode::InvalidUrl, format!("Invalid port: {port_str}"))
            })?;
            (&host_port[..colon], port)
        }
        None => (host_port, 80),
    };

    Ok((host.to_owned(), port, path.to_owned()))
}

/// Extracts the body of an HTTP response, failing on non-2xx statuses.
///
/// Framing is undone on raw bytes; the body is decoded as UTF-8 only once
/// it is complete.
pub(crate) fn parse_http_response(response: &[u8]) -> SdkResult<String> {
    let (head, body) = split_head(response)
        .ok_or_else(|| SdkError::invalid_response("Could not find response body"))?;
    let head = std::str::from_utf8(head)
        .map_err(|_| SdkError::invalid_response("Response headers are not valid UTF-8"))?;

    let status_line = head
        .lines()
        .next()
        .filter(|line| !line.is_empty())
        .ok_or_else(|| SdkError::invalid_response("Empty response"))?;
    let status: u16 = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .ok_or_else(|| SdkError::invalid_response(format!("Malformed status line: {status_line}")))?;
    if !(200..300).contains(&status) {
        return Err(SdkError::new(ErrorCode::HttpError, format!("HTTP error: {status_line}"))
            .with_extension("status", status));
    }

    let chunked = head.lines().any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.trim().eq_ignore_ascii_case("chunked")
        })
    });
    let body = if chunked {
        parse_chunked_body(body)?
    } else {
        body.to_vec()
    };

    String::from_utf8(body)
        .map_err(|e| SdkError::invalid_response(format!("Response body is not valid UTF-8: {e}")))
}

fn split_head(response: &[u8]) -> Option<(&[u8], &[u8])> {
    if let Some(at) = find(response, b"\r\n\r\n") {
        return Some((&response[..at], &response[at + 4..]));
    }
    find(response, b"\n\n").map(|at| (&response[..at], &response[at + 2..]))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

fn parse_chunked_body(mut remaining: &[u8]) -> SdkResult<Vec<u8>> {
    let mut result = Vec::new();

    while let Some(newline) = remaining.iter().position(|&b| b == b'\n') {
        let size_line = String::from_utf8_lossy(&remaining[..newline]);
        let size_str = size_line.trim().split(';').next().unwrap_or_default().to_owned();
        let size = usize::from_str_radix(&size_str, 16).map_err(|_| {
            SdkError::invalid_response(format!("Invalid chunk size: {size_str}"))
        })?;
        if size == 0 {
            break;
        }
        let rest = &remaining[newline + 1..];
        let chunk = rest
            .get(..size)
            .ok_or_else(|| SdkError::invalid_response("Truncated chunk"))?;
        result.extend_from_slice(chunk);

        remaining = &rest[size..];
        remaining = remaining.strip_prefix(b"\r").unwrap_or(remaining);
        remaining = remaining.strip_prefix(b"\n").unwrap_or(remaining);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_url() {
        assert_eq!(
            parse_url("http://localhost:4000/graphql").unwrap(),
            ("localhost".to_owned(), 4000, "/graphql".to_owned())
        );
        assert_eq!(
            parse_url("example.com").unwrap(),
            ("example.com".to_owned(), 80, "/".to_owned())
        );
        assert_eq!(parse_url("https://example.com").unwrap_err().code, ErrorCode::HttpsNotSupported);
        assert_eq!(parse_url("http://host:port/").unwrap_err().code, ErrorCode::InvalidUrl);
    }

    #[test]
    fn test_parse_http_response() {
        let response = "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\r\n{\"data\":{}}";
        assert_eq!(parse_http_response(response.as_bytes()).unwrap(), "{\"data\":{}}");

        let response = "HTTP/1.1 500 Internal Server Error\r\n\r\noops";
        let err = parse_http_response(response.as_bytes()).unwrap_err();
        assert_eq!(err.code, ErrorCode::HttpError);
        assert_eq!(err.extension("status"), Some(&serde_json::json!(500)));

        assert_eq!(parse_http_response(b"").unwrap_err().code, ErrorCode::InvalidResponse);
        assert_eq!(
            parse_http_response(b"\r\n\r\n{}").unwrap_err().code,
            ErrorCode::InvalidResponse
        );
    }

    #[test]
    fn test_chunked_body() {
        let response = "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\n{\"dat\r\n6\r\na\":{}}\r\n0\r\n\r\n";
        assert_eq!(parse_http_response(response.as_bytes()).unwrap(), "{\"data\":{}}");
    }

    #[test]
    fn test_chunk_boundary_inside_character() {
        // "é" is two bytes; the first chunk ends after its first byte.
        let body = "{\"a\":\"é\"}".as_bytes();
        assert_eq!(body.len(), 10);
        let mut response = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n".to_vec();
        response.extend_from_slice(b"7\r\n");
        response.extend_from_slice(&body[..7]);
        response.extend_from_slice(b"\r\n3\r\n");
        response.extend_from_slice(&body[7..]);
        response.extend_from_slice(b"\r\n0\r\n\r\n");

        assert_eq!(parse_http_response(&response).unwrap(), "{\"a\":\"é\"}");
    }

    #[test]
    fn test_invalid_utf8_body() {
        let response = b"HTTP/1.1 200 OK\r\n\r\n\xff\xfe";
        assert_eq!(parse_http_response(response).unwrap_err().code, ErrorCode::InvalidResponse);
    }

    #[test]
    fn test_retry_backoff_doubles() {
        let retry = RetryPolicy::new(3, Duration::from_millis(100));
        assert_eq!(retry.backoff(1), Duration::from_millis(100));
        assert_eq!(retry.backoff(2), Duration::from_millis(200));
        assert_eq!(retry.backoff(3), Duration::from_millis(400));
        assert_eq!(RetryPolicy::NONE.backoff(5), Duration::ZERO);
    }

    #[test]
    fn test_header_replaces_same_name() {
        let config = ClientConfig::new("http://localhost/graphql")
            .header("Authorization", "Bearer a")
            .header("X-Trace", "1")
            .header("authorization", "Bearer b");
        assert_eq!(
            config.headers,
            vec![
                ("X-Trace".to_owned(), "1".to_owned()),
                ("authorization".to_owned(), "Bearer b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_response_without_errors() {
        let response: GraphQLResponse = serde_json::from_str(r#"{"data":{"user":null}}"#).unwrap();
        assert!(response.errors.is_empty());
        assert_eq!(response.data, Some(serde_json::json!({ "user": null })));
    }

    #[tokio::test]
    async fn test_connection_refused_is_not_retried_forever() {
        let client = HttpClient::new(
            ClientConfig::new("http://127.0.0.1:1/graphql")
                .retry(RetryPolicy::new(1, Duration::from_millis(1)))
                .timeout(Duration::from_secs(2)),
        );
        let body = RequestBody {
            query: "query ping {\n  ping\n}".into(),
            variables: serde_json::json!({}),
        };
        let err = client.request(&body).await.unwrap_err();
        assert!(err.is_retryable());
    }
}
