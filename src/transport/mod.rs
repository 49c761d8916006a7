//! Transport layer: one request/response exchange per call.
//!
//! A [`Transport`] performs exactly one attempt; retries are layered on top by
//! [`crate::resilience`]. Buffered calls return a [`BufferedResponse`], streaming
//! calls hand back a [`StreamingResponse`] whose body is an exclusively-owned
//! byte stream.

pub mod http;

pub use http::HttpTransport;

use crate::{BoxStream, Result};
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

/// A single-attempt HTTP exchange.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Send the request and fully buffer the response body.
    async fn execute(&self, request: &Request) -> Result<BufferedResponse>;

    /// Send the request and return the live body once 2xx headers arrive.
    async fn execute_stream(&self, request: &Request) -> Result<StreamingResponse>;
}

/// An outgoing request. Built with the consuming setters, then read-only.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    body: Option<Value>,
    headers: HeaderMap,
    timeout: Option<Duration>,
    stream: bool,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: HeaderMap::new(),
            timeout: None,
            stream: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Add a header override. Later values replace earlier ones with the same name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.headers.insert(name.clone(), value.clone());
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn streaming(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn header_overrides(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn is_stream(&self) -> bool {
        self.stream
    }
}

/// Response body as received: parsed JSON when possible, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
    Empty,
}

impl ResponseBody {
    /// Classify a buffered body. Whitespace-only bodies count as empty.
    pub fn parse(raw: &str) -> Self {
        if raw.trim().is_empty() {
            return ResponseBody::Empty;
        }
        match serde_json::from_str(raw) {
            Ok(v) => ResponseBody::Json(v),
            Err(_) => ResponseBody::Text(raw.to_string()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Raw text bodies become `Value::String`, empty bodies `Value::Null`.
    pub fn into_value(self) -> Value {
        match self {
            ResponseBody::Json(v) => v,
            ResponseBody::Text(t) => Value::String(t),
            ResponseBody::Empty => Value::Null,
        }
    }

    /// Human-readable message: `error.message` if present, otherwise the body itself.
    pub fn error_message(&self) -> String {
        match self {
            ResponseBody::Json(v) => v
                .get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(|s| s.to_string())
                .unwrap_or_else(|| v.to_string()),
            ResponseBody::Text(t) => t.clone(),
            ResponseBody::Empty => "null".to_string(),
        }
    }
}

/// A fully-buffered 2xx response.
#[derive(Debug, Clone)]
pub struct BufferedResponse {
    pub status: u16,
    pub body: ResponseBody,
    pub headers: HeaderMap,
}

/// A 2xx response whose body is still arriving.
///
/// The byte stream is owned by whoever holds this value; hand it to exactly
/// one adapter.
pub struct StreamingResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: BoxStream<'static, Bytes>,
}

impl fmt::Debug for StreamingResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamingResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}
