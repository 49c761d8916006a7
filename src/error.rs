use crate::transport::ResponseBody;
use reqwest::header::HeaderMap;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for failures raised before a request reaches the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "params.messages[0].role")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "message_validator", "client_builder")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the client.
///
/// Transport and protocol failures are normalized into a small set of
/// categories so callers can branch on them without touching `reqwest`
/// internals.
#[derive(Debug, Error)]
pub enum Error {
    /// The connection could not be established (refused, DNS failure, TLS).
    #[error("PaxSenix API connection error: {message}")]
    Connection { message: String },

    /// No response headers (or, for buffered calls, no full body) within the deadline.
    #[error("PaxSenix API timeout after {}ms", .after.as_millis())]
    Timeout { after: Duration },

    /// The service answered with a status outside 200-299.
    #[error("PaxSenix API error: {status} - {}", .body.error_message())]
    HttpStatus {
        status: u16,
        body: ResponseBody,
        headers: HeaderMap,
    },

    /// A decoder invariant was violated. Malformed individual frames never end up here.
    #[error("Stream decode error: {0}")]
    Decode(String),

    /// The transport failed after the stream had started.
    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    pub fn connection(message: impl Into<String>) -> Self {
        Error::Connection {
            message: message.into(),
        }
    }

    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// HTTP status code, when the failure came from an HTTP response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed (or raw) response body of an HTTP-level failure.
    pub fn body(&self) -> Option<&ResponseBody> {
        match self {
            Error::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Response headers of an HTTP-level failure.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::HttpStatus { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// 4xx responses: the request itself is wrong and repeating it cannot help.
    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(s) if (400..500).contains(&s))
    }

    /// Transient failures: connection problems, timeouts and 5xx responses.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Connection { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Failures raised locally, before anything was sent.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Error::Validation { .. } | Error::Configuration { .. } | Error::Serialization(_)
        )
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. } | Error::Configuration { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }
}
