//! Pull-based stream consumption (byte stream -> lazy stream of events).

use super::decode::{Frame, FrameDecoder};
use crate::telemetry::{tracing_observer, StreamObserver};
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::{stream, StreamExt};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Turns a response body into a lazy, single-use stream of decoded events.
///
/// The returned stream ends after `[DONE]` or at end of input. A transport
/// failure is yielded once as `Err` and ends the stream. Dropping the stream
/// early drops the underlying body.
pub struct PullAdapter {
    observer: Arc<dyn StreamObserver>,
}

impl Default for PullAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl PullAdapter {
    pub fn new() -> Self {
        Self {
            observer: tracing_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn events(&self, body: BoxStream<'static, Bytes>) -> BoxStream<'static, Value> {
        let state = PullState {
            input: Some(body),
            decoder: FrameDecoder::new(),
            ready: VecDeque::new(),
            failure: None,
            observer: self.observer.clone(),
        };

        let stream = stream::unfold(state, |mut state| async move {
            loop {
                if let Some(v) = state.ready.pop_front() {
                    return Some((Ok(v), state));
                }
                if let Some(e) = state.failure.take() {
                    return Some((Err(e), state));
                }

                let input = state.input.as_mut()?;
                let next = input.next().await;
                match next {
                    Some(Ok(chunk)) => {
                        let frames = state.decoder.feed_bytes(&chunk);
                        state.absorb(frames);
                        if let Err(e) = state.decoder.check_pending() {
                            state.fail(e);
                        }
                    }
                    Some(Err(e)) => state.fail(e),
                    None => {
                        let frames = state.decoder.flush();
                        state.absorb(frames);
                        state.input = None;
                    }
                }
            }
        });

        Box::pin(stream)
    }
}

struct PullState {
    // `None` once the body is exhausted, failed, or `[DONE]` arrived.
    input: Option<BoxStream<'static, Bytes>>,
    decoder: FrameDecoder,
    ready: VecDeque<Value>,
    // Yielded once `ready` drains; events decoded before a failure still go out first.
    failure: Option<Error>,
    observer: Arc<dyn StreamObserver>,
}

impl PullState {
    fn absorb(&mut self, frames: Vec<Frame>) {
        for frame in frames {
            match frame {
                Frame::Data(v) => self.ready.push_back(v),
                Frame::Malformed { raw, reason } => self.observer.on_malformed_frame(&raw, &reason),
                Frame::Done => {
                    debug!("stream sentinel received");
                    self.input = None;
                }
                Frame::Ignorable => {}
            }
        }
    }

    fn fail(&mut self, error: Error) {
        self.input = None;
        self.failure = Some(error);
    }
}

/// Collect every event of a pulled stream, stopping at the first error.
pub async fn collect_events(mut events: BoxStream<'static, Value>) -> Result<Vec<Value>> {
    let mut out = Vec::new();
    while let Some(v) = events.next().await {
        out.push(v?);
    }
    Ok(out)
}
