//! Mock HTTP server setup for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use paxsenix_ai::PaxSenixClientBuilder;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const API_KEY: &str = "sk-test";

/// Test fixture that manages a mock server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

/// Route library logs to the test harness. Set `RUST_LOG=paxsenix_ai=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockServerFixture {
    pub async fn new() -> Self {
        init_tracing();
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    /// Builder pointed at the mock server, with short retry delays.
    pub fn client_builder(&self) -> PaxSenixClientBuilder {
        PaxSenixClientBuilder::new()
            .api_key(API_KEY)
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(5))
            .retry_delay(Duration::from_millis(5))
    }

    /// Create a mock for a successful SSE response. Each chunk becomes one
    /// `data:` line followed by a blank line.
    pub async fn mock_sse_stream(&self, path: &str, chunks: Vec<&str>) -> Mock {
        let body = chunks
            .iter()
            .map(|chunk| {
                if chunk.starts_with("data: ") {
                    format!("{}\n\n", chunk)
                } else {
                    format!("data: {}\n\n", chunk)
                }
            })
            .collect::<Vec<_>>()
            .join("");
        self.mock_raw_stream(path, &body).await
    }

    /// Create a mock that returns `body` verbatim as an event stream.
    pub async fn mock_raw_stream(&self, path: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .match_header("accept", "text/event-stream")
            .match_body(Matcher::PartialJson(serde_json::json!({"stream": true})))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for a successful JSON response
    pub async fn mock_json_response(&self, method: &str, path: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock(method, path)
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    /// Create a mock for an error response, expected to be hit `hits` times
    pub async fn mock_error_response(
        &self,
        path: &str,
        status: u16,
        error_body: &str,
        hits: usize,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", path)
            .with_status(status as usize)
            .with_header("content-type", "application/json")
            .with_body(error_body)
            .expect(hits)
            .create_async()
            .await
    }
}
