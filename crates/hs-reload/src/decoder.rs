//! `text/event-stream` decoding.
//!
//! Incremental: bytes can be fed in arbitrary chunks, lines and UTF-8
//! sequences may straddle chunk boundaries.

use std::time::Duration;

/// Event type used when the stream does not name one.
const DEFAULT_EVENT: &str = "message";

/// Longest line buffered before it is dropped along with its event.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// A dispatched server-sent event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    /// Event type (`message` unless an `event:` field named another).
    pub event: String,
    /// Data lines joined with `\n`.
    pub data: String,
    /// Last event ID seen on the stream.
    pub id: Option<String>,
}

impl SseEvent {
    /// Whether this event reaches a plain `onmessage` handler.
    #[must_use]
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT
    }
}

/// Incremental event-stream decoder.
#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    /// Inside an over-long line; bytes are dropped until its terminator.
    discarding: bool,
    event: String,
    data: String,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    /// Create an empty decoder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconnection delay requested by the server, if any.
    #[must_use]
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    /// Last event ID, sent back as `Last-Event-ID` on reconnect.
    #[must_use]
    pub fn last_event_id(&self) -> Option<&str> {
        self.last_id.as_deref()
    }

    /// Drop any partially received line and event.
    ///
    /// Called when a connection ends; the event ID and retry delay survive.
    pub fn reset_pending(&mut self) {
        self.line.clear();
        self.skip_lf = false;
        self.discarding = false;
        self.event.clear();
        self.data.clear();
    }

    /// Feed a chunk and return the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' => {
                    self.skip_lf = true;
                    self.end_line(&mut events);
                }
                b'\n' => self.end_line(&mut events),
                _ if self.discarding => {}
                _ if self.line.len() >= MAX_LINE_BYTES => {
                    tracing::warn!(limit = MAX_LINE_BYTES, "Event stream line too long, dropping event");
                    self.reset_pending();
                    self.discarding = true;
                }
                _ => self.line.push(byte),
            }
        }
        events
    }

    /// Process one complete line.
    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        if self.discarding {
            self.discarding = false;
            return;
        }
        let raw = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&raw);

        if line.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return;
        }

        // Comment, used for keep-alives
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => value.clone_into(&mut self.event),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_owned()),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(ms) = value.parse() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
    }

    /// Dispatch the buffered event on a blank line.
    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = std::mem::take(&mut self.event);
        if self.data.is_empty() {
            return None;
        }
        let mut data = std::mem::take(&mut self.data);
        data.pop();

        Some(SseEvent {
            event: if event.is_empty() {
                DEFAULT_EVENT.to_owned()
            } else {
                event
            },
            data,
            id: self.last_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_single_unnamed_event() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"data: update\n\n");

        assert_eq!(
            events,
            vec![SseEvent {
                event: "message".to_owned(),
                data: "update".to_owned(),
                id: None,
            }]
        );
        assert!(events[0].is_message());
    }

    #[test]
    fn test_event_split_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: {\"type\":\"up").is_empty());
        assert!(decoder.feed(b"date\"}\n").is_empty());
        let events = decoder.feed(b"\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"type\":\"update\"}");
    }

    #[test]
    fn test_crlf_split_between_chunks() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"data: a\r").is_empty());
        let events = decoder.feed(b"\n\r\n");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a");
    }

    #[test]
    fn test_bare_cr_line_endings() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"data: a\rdata: b\r\r");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb");
    }

    #[test]
    fn test_comments_are_not_events() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b":\n\n: keep-alive\n\n").is_empty());
    }

    #[test]
    fn test_named_event_is_not_message() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"event: ping\ndata: x\n\ndata: y\n\n");

        assert_eq!(events.len(), 2);
        assert!(!events[0].is_message());
        assert_eq!(events[0].event, "ping");
        // Event type does not leak into the next event
        assert!(events[1].is_message());
    }

    #[test]
    fn test_event_without_data_is_dropped() {
        let mut decoder = SseDecoder::new();

        assert!(decoder.feed(b"event: update\n\n").is_empty());
        assert!(decoder.feed(b"id: 7\n\n").is_empty());
        assert_eq!(decoder.last_event_id(), Some("7"));
    }

    #[test]
    fn test_field_without_space_and_without_colon() {
        let mut decoder = SseDecoder::new();

        let events = decoder.feed(b"data:tight\ndata\n\n");

        assert_eq!(events[0].data, "tight\n");
    }

    #[test]
    fn test_retry_field() {
        let mut decoder = SseDecoder::new();

        decoder.feed(b"retry: 1500\n");
        assert_eq!(decoder.retry(), Some(Duration::from_millis(1500)));

        decoder.feed(b"retry: soon\n");
        assert_eq!(decoder.retry(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_reset_pending_keeps_id() {
        let mut decoder = SseDecoder::new();

        decoder.feed(b"id: 3\ndata: half");
        decoder.reset_pending();
        let events = decoder.feed(b"data: whole\n\n");

        assert_eq!(events[0].data, "whole");
        assert_eq!(events[0].id.as_deref(), Some("3"));
    }

    #[test]
    fn test_overlong_line_drops_its_event() {
        let mut decoder = SseDecoder::new();
        let long = vec![b'x'; MAX_LINE_BYTES + 10];

        assert!(decoder.feed(b"data: partial\ndata: ").is_empty());
        for chunk in long.chunks(4096) {
            assert!(decoder.feed(chunk).is_empty());
        }
        assert!(decoder.line.len() <= MAX_LINE_BYTES);
        // Terminator ends the dropped line; the blank line has nothing to dispatch
        assert!(decoder.feed(b"\n\n").is_empty());

        let events = decoder.feed(b"data: after\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "after");
    }

    #[test]
    fn test_line_at_limit_is_kept() {
        let mut decoder = SseDecoder::new();
        let mut line = b"data:".to_vec();
        line.resize(MAX_LINE_BYTES, b'y');
        line.extend_from_slice(b"\n\n");

        let events = decoder.feed(&line);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data.len(), MAX_LINE_BYTES - "data:".len());
    }

    #[test]
    fn test_multibyte_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: café\n\n".as_bytes();
        let (a, b) = bytes.split_at(10);

        assert!(decoder.feed(a).is_empty());
        let events = decoder.feed(b);

        assert_eq!(events[0].data, "café");
    }
}
