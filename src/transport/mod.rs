//! Transport abstraction.
//!
//! The requester never talks to the network itself: one physical call is
//! delegated to a [`Transport`], which owns TLS, pooling and DNS.
//!
//! # Design Decisions
//! - Object safe (`Arc<dyn Transport>`) so tests inject scripted transports
//! - Non-2xx responses are errors carrying their status code
//! - Errors are `Clone` because a single outcome fans out to every deduplicated caller

pub mod http;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::request::RequestDescriptor;

pub use http::HttpTransport;

/// Response produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Response headers in the order received.
    pub headers: Vec<(String, String)>,
    /// Response body.
    pub body: Bytes,
}

impl Response {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_headers(
        status: u16,
        headers: Vec<(String, String)>,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First header value whose name matches case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> Result<String, std::string::FromUtf8Error> {
        String::from_utf8(self.body.to_vec())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Failure of a single physical call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection could not be established.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The transport's own deadline elapsed.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The server answered with a non-2xx status.
    #[error("server returned {status}: {body}")]
    Http { status: u16, body: String },

    /// Reading or writing the exchange failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// The request could not be built (bad route, bad header value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Status code of an HTTP failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether re-issuing the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, TransportError::InvalidRequest(_))
    }
}

/// Performs one physical network call.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` with an optional `Authorization` header value.
    ///
    /// GET and DELETE parameters travel as a query string. A POST with form
    /// parts is sent as `multipart/form-data`, otherwise its parameters are a
    /// urlencoded form body.
    async fn send(
        &self,
        request: &RequestDescriptor,
        authorization: Option<&str>,
    ) -> Result<Response, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_helpers() {
        let response = Response::with_headers(
            201,
            vec![("Content-Type".into(), "application/json".into())],
            r#"{"id":"1"}"#,
        );
        assert!(response.is_success());
        assert_eq!(response.header("content-type"), Some("application/json"));

        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["id"], "1");
        assert!(!Response::new(503, "").is_success());
    }

    #[test]
    fn test_error_classification() {
        let err = TransportError::Http {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
        assert!(TransportError::Connect("refused".into()).is_retryable());
        assert!(!TransportError::InvalidRequest("bad url".into()).is_retryable());
        assert_eq!(err.to_string(), "server returned 503: unavailable");
    }
}
