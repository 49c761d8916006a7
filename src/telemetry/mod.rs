//! Stream diagnostics.
//!
//! Malformed frames and failing `on_data` callbacks never end a stream; they
//! are reported to a [`StreamObserver`] instead. The default,
//! [`TracingObserver`], logs through `tracing`. [`InMemoryObserver`] keeps
//! counts so tests can assert on swallowed failures.

use std::sync::{Arc, Mutex};
use tracing::warn;

/// Receives non-fatal stream diagnostics.
pub trait StreamObserver: Send + Sync {
    /// A `data:` line whose payload was not valid JSON.
    fn on_malformed_frame(&self, _raw: &str, _reason: &str) {}

    /// An `on_data` callback returned an error. The stream keeps going.
    fn on_callback_error(&self, _error: &(dyn std::error::Error + Send + Sync)) {}
}

/// Drops every diagnostic.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl StreamObserver for NoopObserver {}

/// Logs diagnostics at `warn` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl StreamObserver for TracingObserver {
    fn on_malformed_frame(&self, raw: &str, reason: &str) {
        warn!(raw_data = raw, reason, "skipping malformed stream frame");
    }

    fn on_callback_error(&self, error: &(dyn std::error::Error + Send + Sync)) {
        warn!(error = %error, "stream data callback failed");
    }
}

pub fn tracing_observer() -> Arc<dyn StreamObserver> {
    Arc::new(TracingObserver)
}

pub fn noop_observer() -> Arc<dyn StreamObserver> {
    Arc::new(NoopObserver)
}

/// Records diagnostics in memory.
#[derive(Debug, Default)]
pub struct InMemoryObserver {
    malformed: Mutex<Vec<String>>,
    callback_errors: Mutex<Vec<String>>,
}

impl InMemoryObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw payloads of the malformed frames seen so far.
    pub fn malformed_frames(&self) -> Vec<String> {
        self.malformed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn malformed_count(&self) -> usize {
        self.malformed.lock().map(|v| v.len()).unwrap_or(0)
    }

    /// Display strings of the callback errors seen so far.
    pub fn callback_errors(&self) -> Vec<String> {
        self.callback_errors
            .lock()
            .map(|v| v.clone())
            .unwrap_or_default()
    }

    pub fn callback_error_count(&self) -> usize {
        self.callback_errors.lock().map(|v| v.len()).unwrap_or(0)
    }
}

impl StreamObserver for InMemoryObserver {
    fn on_malformed_frame(&self, raw: &str, _reason: &str) {
        if let Ok(mut v) = self.malformed.lock() {
            v.push(raw.to_string());
        }
    }

    fn on_callback_error(&self, error: &(dyn std::error::Error + Send + Sync)) {
        if let Ok(mut v) = self.callback_errors.lock() {
            v.push(error.to_string());
        }
    }
}
