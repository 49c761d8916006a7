//! # Streaming Pipeline
//!
//! Turns a raw `text/event-stream` body into an ordered sequence of JSON events.
//!
//! ```text
//! Bytes ──► FrameDecoder ──► Frame::{Data, Done, Malformed}
//!                 │
//!       ┌─────────┴─────────┐
//!   PushAdapter         PullAdapter
//!  (callbacks)       (lazy BoxStream)
//! ```
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`FrameDecoder`] | Incremental line re-assembly and classification |
//! | [`PushAdapter`] | Invokes [`StreamHandlers`] with a whole-stream watchdog |
//! | [`PullAdapter`] | Lazy stream of events, cancelled by dropping it |
//!
//! Malformed `data:` payloads are skipped and reported to the configured
//! [`StreamObserver`](crate::telemetry::StreamObserver); transport failures end the stream.
//!
//! ```rust
//! use paxsenix_ai::pipeline::{Frame, FrameDecoder};
//! use serde_json::json;
//!
//! let mut decoder = FrameDecoder::new();
//! assert!(decoder.feed("data: {\"x\":").is_empty());
//! assert_eq!(decoder.feed("1}\n\n"), vec![Frame::Data(json!({"x": 1}))]);
//! assert_eq!(decoder.feed("data: [DONE]\n"), vec![Frame::Done]);
//! assert!(decoder.is_finished());
//! ```

pub mod decode;
pub mod pull;
pub mod push;


pub use decode::{classify_line, Frame, FrameDecoder};
pub use pull::{collect_events, PullAdapter};
pub use push::{CallbackError, CallbackResult, PushAdapter, StreamHandlers};
