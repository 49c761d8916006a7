//! Integration tests for deadlines against raw TCP servers that stall

use crate::integration::mock_server::init_tracing;
use paxsenix_ai::{ChatCompletionParams, Error, Message, PaxSenixClient, RequestOptions, StreamHandlers};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const CLIENT_TIMEOUT: Duration = Duration::from_millis(300);
const TEST_CEILING: Duration = Duration::from_secs(5);

fn params() -> ChatCompletionParams {
    ChatCompletionParams::new(vec![Message::user("Hi")])
}

/// Accepts connections, reads the request, writes `response` (if any), then
/// holds the socket open without sending anything else.
async fn stalling_server(response: &'static [u8]) -> (String, Arc<AtomicU32>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicU32::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            counter.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                let mut buf = vec![0u8; 8192];
                let _ = socket.read(&mut buf).await;
                if !response.is_empty() {
                    let _ = socket.write_all(response).await;
                    let _ = socket.flush().await;
                }
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(socket);
            });
        }
    });

    (format!("http://{}", addr), accepted)
}

fn client(base_url: &str, retries: u32) -> PaxSenixClient {
    init_tracing();
    PaxSenixClient::builder()
        .base_url(base_url)
        .timeout(CLIENT_TIMEOUT)
        .retries(retries)
        .retry_delay(Duration::from_millis(5))
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_missing_headers_time_out_and_are_retried() {
    let (base_url, accepted) = stalling_server(b"").await;
    let client = client(&base_url, 2);

    let err = tokio::time::timeout(
        TEST_CEILING,
        client.create_chat_completion(params(), RequestOptions::new()),
    )
    .await
    .expect("call outlived its deadline")
    .unwrap_err();

    assert!(matches!(err, Error::Timeout { after } if after == CLIENT_TIMEOUT), "got {:?}", err);
    assert!(err.is_retryable());
    // first attempt plus two linear retries
    assert_eq!(accepted.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_stream_open_times_out_without_headers() {
    let (base_url, _accepted) = stalling_server(b"").await;
    let client = client(&base_url, 0);

    let err = tokio::time::timeout(
        TEST_CEILING,
        client
            .chat()
            .stream_completion_async(params(), RequestOptions::new()),
    )
    .await
    .expect("stream open outlived its deadline")
    .err()
    .unwrap();

    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
}

const STALLED_ERROR_RESPONSE: &[u8] = b"HTTP/1.1 500 Internal Server Error\r\n\
Content-Type: application/json\r\n\
Content-Length: 100\r\n\
\r\n\
{\"err";

#[tokio::test]
async fn test_stalled_error_body_times_out_for_pull_stream() {
    let (base_url, _accepted) = stalling_server(STALLED_ERROR_RESPONSE).await;
    let client = client(&base_url, 0);

    let err = tokio::time::timeout(
        TEST_CEILING,
        client
            .chat()
            .stream_completion_async(params(), RequestOptions::new()),
    )
    .await
    .expect("error body read outlived its deadline")
    .err()
    .unwrap();

    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
}

#[tokio::test]
async fn test_stalled_error_body_reaches_error_handler() {
    let (base_url, _accepted) = stalling_server(STALLED_ERROR_RESPONSE).await;
    let client = client(&base_url, 0);

    let failure: Arc<Mutex<Option<Error>>> = Arc::new(Mutex::new(None));
    let ended = Arc::new(Mutex::new(false));
    let (f, e) = (failure.clone(), ended.clone());
    let handlers = StreamHandlers::new(|_| Ok(()))
        .on_error(move |err| *f.lock().unwrap() = Some(err))
        .on_end(move || *e.lock().unwrap() = true);

    let result = tokio::time::timeout(
        TEST_CEILING,
        client
            .chat()
            .stream_completion(params(), handlers, RequestOptions::new()),
    )
    .await
    .expect("stream_completion outlived its deadline");

    assert!(result.is_ok());
    assert!(!*ended.lock().unwrap());
    assert!(matches!(
        failure.lock().unwrap().take(),
        Some(Error::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_per_call_timeout_overrides_client_timeout() {
    let (base_url, _accepted) = stalling_server(b"").await;
    let client = client(&base_url, 0);
    let short = Duration::from_millis(50);

    let err = tokio::time::timeout(
        TEST_CEILING,
        client.list_models(RequestOptions::new().timeout(short)),
    )
    .await
    .expect("call outlived its deadline")
    .unwrap_err();

    assert!(matches!(err, Error::Timeout { after } if after == short), "got {:?}", err);
}
