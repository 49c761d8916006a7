//! Incremental `data:` line decoder (text chunks -> frames).
//!
//! The decoder is a plain state object: it knows nothing about how frames are
//! delivered. [`PushAdapter`](super::push::PushAdapter) and
//! [`PullAdapter`](super::pull::PullAdapter) both drive it.

use crate::{Error, Result};
use serde_json::Value;

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// Upper bound on buffered input that has not seen a newline yet.
pub const MAX_PENDING_BYTES: usize = 16 * 1024 * 1024;

/// One classified line of stream input.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// A `data:` line carrying valid JSON.
    Data(Value),
    /// The `[DONE]` sentinel.
    Done,
    /// Blank lines, comments, `event:`/`id:` lines and anything else without the prefix.
    Ignorable,
    /// A `data:` line whose payload is not JSON. Non-fatal.
    Malformed { raw: String, reason: String },
}

/// Classify a single line (without its trailing newline).
pub fn classify_line(line: &str) -> Frame {
    let trimmed = line.trim();
    let Some(payload) = trimmed.strip_prefix(DATA_PREFIX) else {
        return Frame::Ignorable;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }
    match serde_json::from_str(payload) {
        Ok(v) => Frame::Data(v),
        Err(e) => Frame::Malformed {
            raw: payload.to_string(),
            reason: e.to_string(),
        },
    }
}

/// Stateful line re-assembler.
///
/// Between calls the buffer holds at most one partial line. Once `[DONE]` is
/// seen (or [`flush`](Self::flush) runs) the decoder is finished and ignores
/// further input; create a new one per stream.
#[derive(Debug)]
pub struct FrameDecoder {
    buffer: String,
    // Incomplete UTF-8 sequence carried over from the previous byte chunk.
    utf8_tail: Vec<u8>,
    finished: bool,
    max_pending: usize,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            utf8_tail: Vec::new(),
            finished: false,
            max_pending: MAX_PENDING_BYTES,
        }
    }

    pub fn with_max_pending(mut self, max_pending: usize) -> Self {
        self.max_pending = max_pending.max(1);
        self
    }

    /// Feed a text chunk and return the frames for every line it completes.
    ///
    /// `Ignorable` lines are dropped. Processing stops right after `Done`.
    pub fn feed(&mut self, chunk: &str) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        let searched_from = self.buffer.len();
        self.buffer.push_str(chunk);

        // Only the new text can hold a newline; the buffer never does between calls.
        let Some(last_newline) = self.buffer[searched_from..]
            .rfind('\n')
            .map(|i| i + searched_from)
        else {
            return frames;
        };
        let tail = self.buffer.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buffer, tail);
        self.classify_into(&complete, &mut frames);
        frames
    }

    /// Like [`feed`](Self::feed), for raw bytes. Multi-byte characters split across
    /// chunks are reassembled; invalid sequences become U+FFFD.
    pub fn feed_bytes(&mut self, chunk: &[u8]) -> Vec<Frame> {
        if self.finished {
            return Vec::new();
        }
        let text = self.decode_utf8(chunk);
        self.feed(&text)
    }

    /// Classify whatever is left (a last line without a newline) and finish.
    pub fn flush(&mut self) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.finished {
            return frames;
        }
        if !self.utf8_tail.is_empty() {
            let tail = std::mem::take(&mut self.utf8_tail);
            self.buffer.push_str(&String::from_utf8_lossy(&tail));
        }
        let residual = std::mem::take(&mut self.buffer);
        if !residual.trim().is_empty() {
            self.classify_into(&residual, &mut frames);
        }
        self.finish();
        frames
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes buffered without a terminating newline.
    pub fn pending_len(&self) -> usize {
        self.buffer.len() + self.utf8_tail.len()
    }

    /// Fails when the unterminated tail outgrows the configured bound.
    pub fn check_pending(&self) -> Result<()> {
        let pending = self.pending_len();
        if pending > self.max_pending {
            return Err(Error::Decode(format!(
                "unterminated line of {} bytes exceeds limit of {} bytes",
                pending, self.max_pending
            )));
        }
        Ok(())
    }

    fn classify_into(&mut self, text: &str, frames: &mut Vec<Frame>) {
        for line in text.split('\n') {
            match classify_line(line) {
                Frame::Ignorable => {}
                Frame::Done => {
                    frames.push(Frame::Done);
                    self.finish();
                    return;
                }
                frame => frames.push(frame),
            }
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.buffer.clear();
        self.utf8_tail.clear();
    }

    fn decode_utf8(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.utf8_tail);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.utf8_tail = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}
