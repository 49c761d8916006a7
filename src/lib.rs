//! # paxsenix-ai
//!
//! Async Rust client for the PaxSenix chat-completion API.
//!
//! ## Overview
//!
//! Requests go out as JSON over HTTP and come back either buffered or as a
//! `data: <json>` line stream terminated by `data: [DONE]`. The streaming path
//! is the core of the crate:
//!
//! - **Transport**: one request, one attempt ([`transport::HttpTransport`]).
//! - **Retry**: linear backoff for ordinary calls, exponential backoff for
//!   [`Chat::create_completion_with_retry`] ([`resilience`]).
//! - **Decoder**: incremental line reassembly, independent of chunk boundaries
//!   ([`pipeline::FrameDecoder`]).
//! - **Adapters**: callbacks ([`pipeline::PushAdapter`]) or a lazy stream
//!   ([`pipeline::PullAdapter`]) over the same decoder.
//!
//! Malformed frames are skipped and reported to a [`telemetry::StreamObserver`].
//! Transport failures end the stream.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use paxsenix_ai::{ChatCompletionParams, Message, PaxSenixClient, RequestOptions};
//!
//! #[tokio::main]
//! async fn main() -> paxsenix_ai::Result<()> {
//!     let client = PaxSenixClient::new("your-api-key")?;
//!
//!     let params = ChatCompletionParams::new(vec![Message::user("Hello!")]);
//!     let mut events = client
//!         .chat()
//!         .stream_completion_async(params, RequestOptions::new())
//!         .await?;
//!
//!     while let Some(event) = events.next().await {
//!         println!("{}", event?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | Client, builder and the chat resource |
//! | [`config`] | Client configuration and per-call options |
//! | [`transport`] | HTTP request/response layer |
//! | [`pipeline`] | Frame decoder and push/pull stream adapters |
//! | [`resilience`] | Retry policies |
//! | [`telemetry`] | Stream observers |
//! | [`types`] | Chat message types |

pub mod client;
pub mod config;
pub mod pipeline;
pub mod resilience;
pub mod telemetry;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{Chat, ChatCompletionParams, PaxSenixClient, PaxSenixClientBuilder};
pub use config::{ClientConfig, RequestOptions};
pub use pipeline::{CallbackResult, StreamHandlers};
pub use types::{Message, MessageContent, MessageRole};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A pinned, boxed stream of `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
