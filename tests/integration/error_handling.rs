//! Integration tests for error handling and retry

use crate::integration::mock_server::MockServerFixture;
use async_trait::async_trait;
use paxsenix_ai::resilience::ExponentialBackoff;
use paxsenix_ai::transport::{BufferedResponse, Request, ResponseBody, StreamingResponse, Transport};
use paxsenix_ai::{ChatCompletionParams, Error, Message, PaxSenixClient, RequestOptions};
use reqwest::header::HeaderMap;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CHAT_PATH: &str = "/v1/chat/completions";

fn params() -> ChatCompletionParams {
    ChatCompletionParams::new(vec![Message::user("Hi")])
}

/// Replays canned outcomes, one per attempt.
struct ScriptedTransport {
    outcomes: Mutex<VecDeque<Result<BufferedResponse, Error>>>,
    attempts: AtomicU32,
}

impl ScriptedTransport {
    fn new(outcomes: Vec<Result<BufferedResponse, Error>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            attempts: AtomicU32::new(0),
        })
    }

    fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, _request: &Request) -> paxsenix_ai::Result<BufferedResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::connection("script exhausted")))
    }

    async fn execute_stream(&self, _request: &Request) -> paxsenix_ai::Result<StreamingResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::connection("streaming not scripted"))
    }
}

fn status(code: u16) -> Result<BufferedResponse, Error> {
    Err(Error::HttpStatus {
        status: code,
        body: ResponseBody::Json(json!({"error": {"message": format!("status {}", code)}})),
        headers: HeaderMap::new(),
    })
}

fn ok(body: serde_json::Value) -> Result<BufferedResponse, Error> {
    Ok(BufferedResponse {
        status: 200,
        body: ResponseBody::Json(body),
        headers: HeaderMap::new(),
    })
}

fn scripted_client(transport: Arc<ScriptedTransport>, retries: u32) -> PaxSenixClient {
    PaxSenixClient::builder()
        .retries(retries)
        .retry_delay(Duration::from_millis(1))
        .transport(transport)
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_server_error_then_success_uses_two_attempts() {
    let transport = ScriptedTransport::new(vec![status(500), ok(json!({"id": "chatcmpl-1"}))]);
    let client = scripted_client(transport.clone(), 2);

    let resp = client
        .create_chat_completion(params(), RequestOptions::new())
        .await
        .unwrap();

    assert_eq!(resp["id"], "chatcmpl-1");
    assert_eq!(transport.attempts(), 2);
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let transport = ScriptedTransport::new(vec![status(404), ok(json!({}))]);
    let client = scripted_client(transport.clone(), 2);

    let err = client
        .create_chat_completion(params(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert!(!err.is_retryable());
    assert_eq!(transport.attempts(), 1);
}

#[tokio::test]
async fn test_exponential_retry_validates_before_sending() {
    let transport = ScriptedTransport::new(vec![ok(json!({}))]);
    let client = scripted_client(transport.clone(), 0);

    let err = client
        .chat()
        .create_completion_with_retry(ChatCompletionParams::new(vec![]), RequestOptions::new(), 3)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation { .. }));
    assert_eq!(transport.attempts(), 0);
}

#[tokio::test]
async fn test_exponential_retry_covers_stream_failures() {
    let transport = ScriptedTransport::new(vec![
        Err(Error::Stream("connection reset".into())),
        status(503),
        ok(json!({"id": "chatcmpl-2"})),
    ]);
    let client = scripted_client(transport.clone(), 0);

    let resp = client
        .chat()
        .create_completion_with_backoff(
            params(),
            RequestOptions::new(),
            ExponentialBackoff::new(3, Duration::from_millis(1)),
        )
        .await
        .unwrap();

    assert_eq!(resp["id"], "chatcmpl-2");
    assert_eq!(transport.attempts(), 3);
}

#[tokio::test]
async fn test_client_error_is_not_retried_over_http() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_error_response(CHAT_PATH, 404, r#"{"error":{"message":"model not found"}}"#, 1)
        .await;
    let client = fixture.client_builder().retries(3).build().unwrap();

    let err = client
        .create_chat_completion(params(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(
        err.body().and_then(|b| b.as_json()),
        Some(&json!({"error": {"message": "model not found"}}))
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_server_error_exhausts_retries_over_http() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_error_response(CHAT_PATH, 500, r#"{"error":{"message":"boom"}}"#, 3)
        .await;
    let client = fixture.client_builder().retries(2).build().unwrap();

    let err = client
        .create_chat_completion(params(), RequestOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), "PaxSenix API error: 500 - boom");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_exponential_backoff_over_http() {
    let fixture = MockServerFixture::new().await;
    let mock = fixture
        .mock_error_response(CHAT_PATH, 502, "bad gateway", 3)
        .await;
    let client = fixture.client_builder().build().unwrap();

    let err = client
        .chat()
        .create_completion_with_backoff(
            params(),
            RequestOptions::new(),
            ExponentialBackoff::new(2, Duration::from_millis(1)),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(err.body(), Some(&ResponseBody::Text("bad gateway".into())));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_connection_refused_is_a_connection_error() {
    let client = PaxSenixClient::builder()
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let err = client
        .create_chat_completion(params(), RequestOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Connection { .. }), "got {:?}", err);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_other_endpoints_send_expected_requests() {
    let fixture = MockServerFixture::new().await;
    let models = fixture
        .mock_json_response("GET", "/v1/models", r#"{"data":[{"id":"gpt-3.5-turbo"}]}"#)
        .await;
    let client = fixture.client_builder().build().unwrap();

    let resp = client.list_models(RequestOptions::new()).await.unwrap();
    assert_eq!(resp["data"][0]["id"], "gpt-3.5-turbo");
    models.assert_async().await;

    let embeddings = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", "/v1/embeddings")
            .match_body(mockito::Matcher::PartialJson(json!({
                "model": "text-embedding-ada-002",
                "input": "hello"
            })))
            .with_status(200)
            .with_body(r#"{"data":[{"embedding":[0.1,0.2]}]}"#)
            .create_async()
            .await
    };
    let resp = client
        .create_embedding(json!({"input": "hello"}), RequestOptions::new())
        .await
        .unwrap();
    assert_eq!(resp["data"][0]["embedding"], json!([0.1, 0.2]));
    embeddings.assert_async().await;
}

#[tokio::test]
async fn test_request_options_headers_are_sent() {
    let fixture = MockServerFixture::new().await;
    let mock = {
        let mut server = fixture.server.lock().await;
        server
            .mock("POST", CHAT_PATH)
            .match_header("x-trace", "abc")
            .match_header("x-request-id", mockito::Matcher::Any)
            .match_body(mockito::Matcher::PartialJson(json!({"model": "gpt-3.5-turbo"})))
            .with_status(200)
            .with_body(r#"{"id":"chatcmpl-3"}"#)
            .create_async()
            .await
    };
    let client = fixture.client_builder().build().unwrap();

    let mut headers = HeaderMap::new();
    headers.insert("x-trace", "abc".parse().unwrap());
    let resp = client
        .create_chat_completion(params(), RequestOptions::new().headers(headers))
        .await
        .unwrap();

    assert_eq!(resp["id"], "chatcmpl-3");
    mock.assert_async().await;
}
