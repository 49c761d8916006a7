//! Client configuration and per-call options.

use reqwest::header::HeaderMap;
use std::env;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.paxsenix.dpdns.org";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Settings shared by every call a client makes.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Sent as `Authorization: Bearer <key>` when present.
    pub api_key: Option<String>,
    /// Service origin; request paths are resolved against it.
    pub base_url: String,
    /// Ceiling for awaiting headers (streams) or the whole exchange (buffered calls).
    /// Also the push adapter's watchdog.
    pub timeout: Duration,
    /// Retries after the first attempt (linear backoff).
    pub retries: u32,
    /// Base delay for linear backoff: attempt `n` waits `retry_delay * n`.
    pub retry_delay: Duration,
    pub user_agent: String,
    /// Model used when a request does not name one.
    pub default_model: String,
    /// Extra headers added to every request.
    pub headers: HeaderMap,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
            user_agent: format!("paxsenix-ai-rust/{}", env!("CARGO_PKG_VERSION")),
            default_model: DEFAULT_CHAT_MODEL.to_string(),
            headers: HeaderMap::new(),
        }
    }
}

impl ClientConfig {
    /// Defaults overlaid with `PAXSENIX_*` environment variables.
    ///
    /// - `PAXSENIX_API_KEY`
    /// - `PAXSENIX_BASE_URL`
    /// - `PAXSENIX_TIMEOUT_MS`
    /// - `PAXSENIX_RETRIES`
    /// - `PAXSENIX_RETRY_DELAY_MS`
    ///
    /// Values that fail to parse are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(key) = env::var("PAXSENIX_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(url) = env::var("PAXSENIX_BASE_URL") {
            config.base_url = url;
        }
        if let Some(ms) = env_parse::<u64>("PAXSENIX_TIMEOUT_MS").filter(|ms| *ms > 0) {
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(n) = env_parse::<u32>("PAXSENIX_RETRIES") {
            config.retries = n;
        }
        if let Some(ms) = env_parse::<u64>("PAXSENIX_RETRY_DELAY_MS") {
            config.retry_delay = Duration::from_millis(ms);
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Replaces [`ClientConfig::timeout`] for this call, including the push watchdog.
    pub timeout: Option<Duration>,
    /// Merged over the client's default headers.
    pub headers: HeaderMap,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}
