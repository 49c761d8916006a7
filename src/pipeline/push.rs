//! Callback-driven stream consumption.

use super::decode::{Frame, FrameDecoder};
use crate::config::DEFAULT_TIMEOUT;
use crate::telemetry::{tracing_observer, StreamObserver};
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;
pub type CallbackResult = std::result::Result<(), CallbackError>;

type DataCallback = Box<dyn FnMut(Value) -> CallbackResult + Send>;
type ErrorCallback = Box<dyn FnOnce(Error) + Send>;
type EndCallback = Box<dyn FnOnce() + Send>;

/// Callbacks for a push-driven stream.
///
/// `on_data` runs once per decoded event, in stream order. At most one of
/// `on_error`/`on_end` runs, at most once.
pub struct StreamHandlers {
    on_data: DataCallback,
    on_error: Option<ErrorCallback>,
    on_end: Option<EndCallback>,
}

impl StreamHandlers {
    pub fn new<F>(on_data: F) -> Self
    where
        F: FnMut(Value) -> CallbackResult + Send + 'static,
    {
        Self {
            on_data: Box::new(on_data),
            on_error: None,
            on_end: None,
        }
    }

    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Error) + Send + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_end<F>(mut self, f: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_end = Some(Box::new(f));
        self
    }

    /// Resolve with `error` before any stream was opened.
    pub(crate) fn fail(self, error: Error) -> Result<()> {
        Terminal::new(self.on_error, self.on_end).fail(error)
    }
}

/// Completion latch: resolves the stream exactly once.
struct Terminal {
    resolved: bool,
    on_error: Option<ErrorCallback>,
    on_end: Option<EndCallback>,
}

impl Terminal {
    fn new(on_error: Option<ErrorCallback>, on_end: Option<EndCallback>) -> Self {
        Self {
            resolved: false,
            on_error,
            on_end,
        }
    }

    fn end(&mut self) {
        if std::mem::replace(&mut self.resolved, true) {
            return;
        }
        if let Some(f) = self.on_end.take() {
            f();
        }
    }

    /// Hands the error back when nobody registered `on_error`.
    fn fail(&mut self, error: Error) -> Result<()> {
        if std::mem::replace(&mut self.resolved, true) {
            return Ok(());
        }
        match self.on_error.take() {
            Some(f) => {
                f(error);
                Ok(())
            }
            None => Err(error),
        }
    }
}

/// Drives a [`FrameDecoder`] over a byte stream and invokes [`StreamHandlers`].
///
/// The timeout is a watchdog over the whole stream lifetime, measured from
/// the call to [`run`](Self::run). It is not reset by incoming chunks.
pub struct PushAdapter {
    timeout: Duration,
    observer: Arc<dyn StreamObserver>,
}

impl Default for PushAdapter {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl PushAdapter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            observer: tracing_observer(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn StreamObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Consume `body` until `[DONE]`, end of stream, failure or watchdog expiry.
    ///
    /// Returns `Err` only when the stream failed and no `on_error` handler was set.
    pub async fn run(&self, body: BoxStream<'static, Bytes>, handlers: StreamHandlers) -> Result<()> {
        let StreamHandlers {
            mut on_data,
            on_error,
            on_end,
        } = handlers;
        let mut terminal = Terminal::new(on_error, on_end);

        let outcome = tokio::select! {
            r = drive(body, &mut *on_data, self.observer.as_ref()) => r,
            _ = tokio::time::sleep(self.timeout) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "stream watchdog expired");
                Err(Error::Timeout { after: self.timeout })
            }
        };

        match outcome {
            Ok(()) => {
                debug!("stream completed");
                terminal.end();
                Ok(())
            }
            Err(e) => terminal.fail(e),
        }
    }
}

async fn drive(
    mut body: BoxStream<'static, Bytes>,
    on_data: &mut (dyn FnMut(Value) -> CallbackResult + Send),
    observer: &dyn StreamObserver,
) -> Result<()> {
    let mut decoder = FrameDecoder::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if deliver(decoder.feed_bytes(&chunk), on_data, observer) {
            return Ok(());
        }
        decoder.check_pending()?;
    }
    deliver(decoder.flush(), on_data, observer);
    Ok(())
}

/// Returns true once `[DONE]` was delivered.
fn deliver(
    frames: Vec<Frame>,
    on_data: &mut (dyn FnMut(Value) -> CallbackResult + Send),
    observer: &dyn StreamObserver,
) -> bool {
    for frame in frames {
        match frame {
            Frame::Data(v) => {
                if let Err(e) = on_data(v) {
                    observer.on_callback_error(e.as_ref());
                }
            }
            Frame::Malformed { raw, reason } => observer.on_malformed_frame(&raw, &reason),
            Frame::Done => return true,
            Frame::Ignorable => {}
        }
    }
    false
}
