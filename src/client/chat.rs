//! Chat completion resource.

use crate::client::core::{apply_options, PaxSenixClient};
use crate::client::validation;
use crate::config::RequestOptions;
use crate::pipeline::{PullAdapter, PushAdapter, StreamHandlers};
use crate::resilience::{execute_with_retry, ExponentialBackoff};
use crate::transport::Request;
use crate::types::Message;
use crate::{BoxStream, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_TOP_P: f64 = 1.0;

/// Parameters for `POST /v1/chat/completions`.
///
/// Fields the service accepts but this struct does not name go in `extra` and
/// are sent verbatim at the top level of the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatCompletionParams {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Default::default()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    /// Pass-through field, e.g. `stop` or `user`.
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Fill generation defaults the caller left unset.
    fn with_generation_defaults(mut self) -> Self {
        self.temperature.get_or_insert(DEFAULT_TEMPERATURE);
        self.top_p.get_or_insert(DEFAULT_TOP_P);
        self.frequency_penalty.get_or_insert(0.0);
        self.presence_penalty.get_or_insert(0.0);
        self
    }
}

/// Chat completion calls, borrowed from a [`PaxSenixClient`].
pub struct Chat<'a> {
    client: &'a PaxSenixClient,
}

impl<'a> Chat<'a> {
    pub(crate) fn new(client: &'a PaxSenixClient) -> Self {
        Self { client }
    }

    /// Buffered completion. Returns the response body as JSON.
    pub async fn create_completion(
        &self,
        params: ChatCompletionParams,
        options: RequestOptions,
    ) -> Result<Value> {
        let request = self.request(params, false)?;
        let resp = self.client.send(request, &options).await?;
        Ok(resp.body.into_value())
    }

    /// [`create_completion`](Self::create_completion) with `temperature 0.7`,
    /// `top_p 1`, and zero frequency/presence penalties unless the caller set them.
    pub async fn create_completion_with_config(
        &self,
        params: ChatCompletionParams,
        options: RequestOptions,
    ) -> Result<Value> {
        self.create_completion(params.with_generation_defaults(), options)
            .await
    }

    /// Stream a completion into `handlers`.
    ///
    /// Events arrive in order through `on_data`; then exactly one of `on_end`
    /// or `on_error` runs. The watchdog is `options.timeout` or the client
    /// timeout. Failures opening the stream are routed to `on_error` too.
    ///
    /// Returns `Err` only when the call failed and `on_error` was not set.
    pub async fn stream_completion(
        &self,
        params: ChatCompletionParams,
        handlers: StreamHandlers,
        options: RequestOptions,
    ) -> Result<()> {
        let adapter = PushAdapter::new(self.client.effective_timeout(&options))
            .with_observer(self.client.observer.clone());

        let opened = match self.request(params, true) {
            Ok(request) => self.client.open_stream(request, &options).await,
            Err(e) => Err(e),
        };
        match opened {
            Ok(resp) => {
                debug!(http_status = resp.status, "chat stream opened");
                adapter.run(resp.body, handlers).await
            }
            Err(e) => handlers.fail(e),
        }
    }

    /// Stream a completion as a lazy sequence of events.
    ///
    /// Failures opening the stream are returned directly; mid-stream transport
    /// failures are yielded once as `Err`. Dropping the stream closes the body.
    pub async fn stream_completion_async(
        &self,
        params: ChatCompletionParams,
        options: RequestOptions,
    ) -> Result<BoxStream<'static, Value>> {
        let request = self.request(params, true)?;
        let resp = self.client.open_stream(request, &options).await?;
        debug!(http_status = resp.status, "chat stream opened");
        let adapter = PullAdapter::new().with_observer(self.client.observer.clone());
        Ok(adapter.events(resp.body))
    }

    /// Validate messages, then retry with [`ExponentialBackoff`] (1s, 2s, 4s, ...).
    ///
    /// Independent of the client's linear retry setting: each exponential
    /// attempt is a single transport call.
    pub async fn create_completion_with_retry(
        &self,
        params: ChatCompletionParams,
        options: RequestOptions,
        max_retries: u32,
    ) -> Result<Value> {
        let backoff = ExponentialBackoff::with_retries(max_retries);
        self.create_completion_with_backoff(params, options, backoff)
            .await
    }

    /// [`create_completion_with_retry`](Self::create_completion_with_retry) with
    /// an explicit backoff.
    pub async fn create_completion_with_backoff(
        &self,
        params: ChatCompletionParams,
        options: RequestOptions,
        backoff: ExponentialBackoff,
    ) -> Result<Value> {
        validation::validate_messages(&params.messages)?;
        let request = self.request(params, false)?;
        let request = apply_options(request, &options);
        let transport = &self.client.transport;
        let resp = execute_with_retry(&backoff, |_| transport.execute(&request)).await?;
        Ok(resp.body.into_value())
    }

    /// Whether `messages` pass [`validate_messages`](validation::validate_messages).
    pub fn validate_messages(&self, messages: &[Message]) -> bool {
        validation::validate_messages(messages).is_ok()
    }

    fn request(&self, params: ChatCompletionParams, stream: bool) -> Result<Request> {
        Ok(Request::post(CHAT_COMPLETIONS_PATH).json(self.body(params, stream)?))
    }

    fn body(&self, mut params: ChatCompletionParams, stream: bool) -> Result<Value> {
        if params.model.as_deref().map_or(true, str::is_empty) {
            params.model = Some(self.client.config.default_model.clone());
        }
        if stream {
            params.stream = Some(true);
        }
        Ok(serde_json::to_value(params)?)
    }
}
