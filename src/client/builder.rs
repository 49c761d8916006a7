use crate::client::core::PaxSenixClient;
use crate::config::ClientConfig;
use crate::resilience::LinearBackoff;
use crate::telemetry::{tracing_observer, StreamObserver};
use crate::transport::{HttpTransport, Transport};
use crate::Result;
use reqwest::header::{HeaderName, HeaderValue};
use std::sync::Arc;
use std::time::Duration;

/// Builder for creating clients with custom configuration.
pub struct PaxSenixClientBuilder {
    config: ClientConfig,
    transport: Option<Arc<dyn Transport>>,
    observer: Arc<dyn StreamObserver>,
}

impl PaxSenixClientBuilder {
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Start from `PAXSENIX_*` environment variables (see [`ClientConfig::from_env`]).
    pub fn from_env() -> Self {
        Self::with_config(ClientConfig::from_env())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config,
            transport: None,
            observer: tracing_observer(),
        }
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Override the service origin (primarily for testing with mock servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Retries after the first attempt for transient failures (linear backoff).
    pub fn retries(mut self, retries: u32) -> Self {
        self.config.retries = retries;
        self
    }

    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.config.retry_delay = delay;
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.config.default_model = model.into();
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.config.headers.insert(name, value);
        self
    }

    /// Replace the HTTP transport, e.g. with an in-process fake.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Inject a stream observer. Default logs through `tracing`.
    pub fn observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn build(self) -> Result<PaxSenixClient> {
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(&self.config)?),
        };
        let retry = LinearBackoff::new(self.config.retries, self.config.retry_delay);

        Ok(PaxSenixClient {
            config: self.config,
            transport,
            retry,
            observer: self.observer,
        })
    }
}

impl Default for PaxSenixClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
