use super::{BufferedResponse, Request, ResponseBody, StreamingResponse, Transport};
use crate::config::ClientConfig;
use crate::{BoxStream, Error, ErrorContext, Result};
use bytes::Bytes;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// `reqwest`-backed transport. One call, one attempt, one connection.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    default_headers: HeaderMap,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid base URL: {}", e),
                ErrorContext::new()
                    .with_field_path("config.base_url")
                    .with_details(config.base_url.clone())
                    .with_source("http_transport"),
            )
        })?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        default_headers.insert(USER_AGENT, header_value(&config.user_agent, "user_agent")?);
        if let Some(key) = config.api_key.as_deref().filter(|k| !k.is_empty()) {
            default_headers.insert(
                AUTHORIZATION,
                header_value(&format!("Bearer {}", key), "api_key")?,
            );
        }
        for (name, value) in config.headers.iter() {
            default_headers.insert(name.clone(), value.clone());
        }

        // Per-call deadlines only (see `send`); a client-wide timeout would cap stream bodies.
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    format!("failed to build HTTP client: {}", e),
                    ErrorContext::new().with_source("http_transport"),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            default_headers,
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot resolve request path: {}", e),
                ErrorContext::new()
                    .with_field_path("request.path")
                    .with_details(path.to_string())
                    .with_source("http_transport"),
            )
        })
    }

    fn build(&self, request: &Request, request_id: &str) -> Result<reqwest::RequestBuilder> {
        let url = self.resolve(request.path())?;
        let mut headers = self.default_headers.clone();
        for (name, value) in request.header_overrides().iter() {
            headers.insert(name.clone(), value.clone());
        }
        if let Ok(v) = HeaderValue::from_str(request_id) {
            headers.insert(REQUEST_ID_HEADER, v);
        }
        if request.is_stream() {
            headers
                .entry(reqwest::header::ACCEPT)
                .or_insert(HeaderValue::from_static("text/event-stream"));
        }

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(headers);
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }
        Ok(builder)
    }

    /// Send and wait for response headers within `deadline`.
    async fn send(
        &self,
        request: &Request,
        request_id: &str,
        deadline: Duration,
    ) -> Result<reqwest::Response> {
        let builder = self.build(request, request_id)?;
        debug!(
            method = %request.method(),
            path = request.path(),
            request_id,
            stream = request.is_stream(),
            "sending request"
        );
        match tokio::time::timeout(deadline, builder.send()).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(e)) => Err(map_send_error(e, deadline)),
            Err(_) => Err(Error::Timeout { after: deadline }),
        }
    }

    /// Buffer a non-2xx body and turn it into `Error::HttpStatus`.
    ///
    /// The read shares the deadline that started at `started`; a stalled body
    /// becomes `Error::Timeout`.
    async fn status_error(resp: reqwest::Response, started: Instant, deadline: Duration) -> Error {
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let remaining = deadline.saturating_sub(started.elapsed());
        let raw = match tokio::time::timeout(remaining, resp.text()).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                debug!(http_status = status, error = %e, "failed to read error body");
                String::new()
            }
            Err(_) => {
                debug!(http_status = status, "error body stalled past deadline");
                return Error::Timeout { after: deadline };
            }
        };
        Error::HttpStatus {
            status,
            body: ResponseBody::parse(&raw),
            headers,
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<BufferedResponse> {
        let request_id = Uuid::new_v4().to_string();
        let deadline = request.timeout_override().unwrap_or(self.timeout);
        let start = Instant::now();

        let exchange = async {
            let resp = self.send(request, &request_id, deadline).await?;
            let status = resp.status().as_u16();
            if !resp.status().is_success() {
                return Err(Self::status_error(resp, start, deadline).await);
            }
            let headers = resp.headers().clone();
            let raw = resp
                .text()
                .await
                .map_err(|e| map_send_error(e, deadline))?;
            Ok::<_, Error>(BufferedResponse {
                status,
                body: ResponseBody::parse(&raw),
                headers,
            })
        };

        let result = match tokio::time::timeout(deadline, exchange).await {
            Ok(r) => r,
            Err(_) => Err(Error::Timeout { after: deadline }),
        };

        match &result {
            Ok(resp) => debug!(
                http_status = resp.status,
                path = request.path(),
                request_id = request_id.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                "request completed"
            ),
            Err(e) => info!(
                http_status = e.status(),
                path = request.path(),
                request_id = request_id.as_str(),
                duration_ms = start.elapsed().as_millis() as u64,
                error = %e,
                "request failed"
            ),
        }
        result
    }

    async fn execute_stream(&self, request: &Request) -> Result<StreamingResponse> {
        let request_id = Uuid::new_v4().to_string();
        let deadline = request.timeout_override().unwrap_or(self.timeout);
        let start = Instant::now();

        let resp = self.send(request, &request_id, deadline).await?;
        let status = resp.status().as_u16();

        if !resp.status().is_success() {
            let err = Self::status_error(resp, start, deadline).await;
            info!(
                http_status = status,
                path = request.path(),
                request_id = request_id.as_str(),
                "streaming request failed"
            );
            return Err(err);
        }

        debug!(
            http_status = status,
            path = request.path(),
            request_id = request_id.as_str(),
            "stream opened"
        );

        let headers = resp.headers().clone();
        let body: BoxStream<'static, Bytes> = Box::pin(
            resp.bytes_stream()
                .map_err(|e| Error::Stream(e.to_string())),
        );
        Ok(StreamingResponse {
            status,
            headers,
            body,
        })
    }
}

fn header_value(value: &str, field: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|_| {
        Error::configuration_with_context(
            "value is not a valid HTTP header",
            ErrorContext::new()
                .with_field_path(format!("config.{}", field))
                .with_source("http_transport"),
        )
    })
}

fn map_send_error(e: reqwest::Error, deadline: Duration) -> Error {
    if e.is_timeout() {
        Error::Timeout { after: deadline }
    } else if e.is_builder() {
        Error::configuration_with_context(
            e.to_string(),
            ErrorContext::new().with_source("http_transport"),
        )
    } else {
        Error::connection(e.to_string())
    }
}
