//! Server-sent-events parsing for the Mastodon user stream.
//!
//! The wire format is `event:`/`data:` line pairs separated by blank lines,
//! with `:`-prefixed heartbeat comments (Mastodon sends `:thump`). The parser
//! is a plain incremental state machine over byte chunks so it can be tested
//! without a socket; [`NotificationStream`] is the thin IO shell around it.

use crate::client::MastoError;
use crate::types::Notification;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;
use tracing::{debug, warn};

/// One complete server-sent event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
}

/// Incremental SSE parser. Feed it chunks as they arrive; it emits events as
/// their terminating blank line is seen. Chunks may split lines (or even
/// multibyte characters) anywhere, so the buffer stays bytes until a full
/// line is available.
#[derive(Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    event: String,
    data: String,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consumes one chunk and returns any events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Blank line terminates the pending event.
                if !self.event.is_empty() || !self.data.is_empty() {
                    events.push(SseEvent {
                        event: std::mem::take(&mut self.event),
                        data: std::mem::take(&mut self.data),
                    });
                }
            } else if line.starts_with(':') {
                // Heartbeat comment, keepalive only.
            } else if let Some(value) = line.strip_prefix("event:") {
                self.event = value.trim_start().to_string();
            } else if let Some(value) = line.strip_prefix("data:") {
                if !self.data.is_empty() {
                    self.data.push('\n');
                }
                self.data.push_str(value.trim_start());
            }
            // Unknown fields (id:, retry:) are ignored.
        }
        events
    }
}

/// Lazy, infinite sequence of notifications from the user stream. Not
/// restartable: once the underlying connection drops, `next` returns the
/// error and then `None`, and the caller must treat the stream as dead.
pub struct NotificationStream {
    bytes: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>,
    parser: SseParser,
    ready: VecDeque<Notification>,
    done: bool,
}

impl NotificationStream {
    pub(crate) fn new(bytes: Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>) -> Self {
        Self {
            bytes,
            parser: SseParser::new(),
            ready: VecDeque::new(),
            done: false,
        }
    }

    /// Next notification event, awaiting network input as needed. Events of
    /// other kinds (`update`, `delete`, ...) and undecodable payloads are
    /// skipped with a log line.
    pub async fn next(&mut self) -> Option<Result<Notification, MastoError>> {
        loop {
            if let Some(notification) = self.ready.pop_front() {
                return Some(Ok(notification));
            }
            if self.done {
                return None;
            }
            match self.bytes.next().await {
                Some(Ok(chunk)) => {
                    for event in self.parser.push(&chunk) {
                        if event.event != "notification" {
                            debug!(event = %event.event, "skipping non-notification event");
                            continue;
                        }
                        match serde_json::from_str::<Notification>(&event.data) {
                            Ok(notification) => self.ready.push_back(notification),
                            Err(e) => {
                                warn!(error = %e, "undecodable notification payload, skipping");
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(MastoError::Stream(e.to_string())));
                }
                None => {
                    self.done = true;
                    return None;
                }
            }
        }
    }
}
