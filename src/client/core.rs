use crate::client::chat::Chat;
use crate::config::{ClientConfig, RequestOptions, DEFAULT_EMBEDDING_MODEL};
use crate::resilience::{execute_with_retry, LinearBackoff};
use crate::telemetry::StreamObserver;
use crate::transport::{BufferedResponse, Request, StreamingResponse, Transport};
use crate::{Error, ErrorContext, Result};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const MODELS_PATH: &str = "/v1/models";
pub const IMAGES_PATH: &str = "/v1/images/generations";
pub const EMBEDDINGS_PATH: &str = "/v1/embeddings";

/// Client for the PaxSenix API.
///
/// Every call goes through the client's linear retry policy and then a
/// single-attempt [`Transport`]. Clients hold no per-call state, so one client
/// can serve many concurrent calls.
pub struct PaxSenixClient {
    pub(crate) config: ClientConfig,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) retry: LinearBackoff,
    pub(crate) observer: Arc<dyn StreamObserver>,
}

impl PaxSenixClient {
    /// Client with default configuration and the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    pub fn builder() -> crate::client::builder::PaxSenixClientBuilder {
        crate::client::builder::PaxSenixClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Chat completion resource.
    pub fn chat(&self) -> Chat<'_> {
        Chat::new(self)
    }

    /// `POST /v1/chat/completions` and return the JSON body.
    pub async fn create_chat_completion(
        &self,
        params: crate::client::chat::ChatCompletionParams,
        options: RequestOptions,
    ) -> Result<Value> {
        self.chat().create_completion(params, options).await
    }

    /// `GET /v1/models`.
    pub async fn list_models(&self, options: RequestOptions) -> Result<Value> {
        let resp = self.send(Request::get(MODELS_PATH), &options).await?;
        Ok(resp.body.into_value())
    }

    /// `POST /v1/images/generations`. The parameters are sent unchanged.
    pub async fn create_image(&self, params: Value, options: RequestOptions) -> Result<Value> {
        let resp = self
            .send(Request::post(IMAGES_PATH).json(params), &options)
            .await?;
        Ok(resp.body.into_value())
    }

    /// `POST /v1/embeddings`. `model` defaults to `text-embedding-ada-002`.
    pub async fn create_embedding(&self, params: Value, options: RequestOptions) -> Result<Value> {
        let body = with_default_model(params, DEFAULT_EMBEDDING_MODEL)?;
        let resp = self
            .send(Request::post(EMBEDDINGS_PATH).json(body), &options)
            .await?;
        Ok(resp.body.into_value())
    }

    /// Buffered exchange with retry.
    pub(crate) async fn send(
        &self,
        request: Request,
        options: &RequestOptions,
    ) -> Result<BufferedResponse> {
        let request = apply_options(request, options);
        execute_with_retry(&self.retry, |_| self.transport.execute(&request)).await
    }

    /// Streaming exchange with retry. Retries cover opening the stream only.
    pub(crate) async fn open_stream(
        &self,
        request: Request,
        options: &RequestOptions,
    ) -> Result<StreamingResponse> {
        let request = apply_options(request.streaming(), options);
        execute_with_retry(&self.retry, |_| self.transport.execute_stream(&request)).await
    }

    pub(crate) fn effective_timeout(&self, options: &RequestOptions) -> Duration {
        options.timeout.unwrap_or(self.config.timeout)
    }
}

pub(crate) fn apply_options(mut request: Request, options: &RequestOptions) -> Request {
    if let Some(timeout) = options.timeout {
        request = request.timeout(timeout);
    }
    request.headers(options.headers.clone())
}

/// Insert `model` into a JSON object when it is missing or null.
pub(crate) fn with_default_model(params: Value, model: &str) -> Result<Value> {
    match params {
        Value::Object(mut map) => {
            let missing = map.get("model").map(|v| v.is_null()).unwrap_or(true);
            if missing {
                map.insert("model".to_string(), Value::String(model.to_string()));
            }
            Ok(Value::Object(map))
        }
        _ => Err(Error::validation_with_context(
            "request parameters must be a JSON object",
            ErrorContext::new()
                .with_field_path("params")
                .with_source("request_builder"),
        )),
    }
}
