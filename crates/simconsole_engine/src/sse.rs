//! Incremental Server-Sent Events frame parser.
//!
//! Bytes arrive in arbitrary chunks; lines may be split anywhere, including
//! between the CR and LF of a CRLF pair or inside a multi-byte character.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// `event:` field; `None` for plain messages.
    pub event: Option<String>,
    pub data: String,
    /// Last event id in effect when the event was dispatched.
    pub id: Option<String>,
}

impl SseEvent {
    /// Unnamed events and events named `message` are regular messages.
    pub fn is_message(&self) -> bool {
        self.event.as_deref().map_or(true, |name| name == "message")
    }
}

#[derive(Debug, Default)]
pub struct SseParser {
    line: Vec<u8>,
    skip_lf: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_event_id: Option<String>,
    retry: Option<Duration>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the events completed by it.
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
                    self.finish_line(&mut events);
                }
                b'\n' => self.finish_line(&mut events),
                _ => self.line.push(byte),
            }
        }
        events
    }

    pub fn last_event_id(&self) -> Option<&str> {
        self.last_event_id.as_deref()
    }

    /// Reconnection delay requested by the server, if any.
    pub fn retry(&self) -> Option<Duration> {
        self.retry
    }

    fn finish_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let line = String::from_utf8_lossy(&raw);

        if line.is_empty() {
            self.dispatch(events);
            return;
        }
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
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.last_event_id = Some(value.to_string());
                }
            }
            "retry" => {
                if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(millis) = value.parse::<u64>() {
                        self.retry = Some(Duration::from_millis(millis));
                    }
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        let event = self.event.take();
        if !std::mem::take(&mut self.has_data) {
            return;
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        events.push(SseEvent {
            event,
            data,
            id: self.last_event_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::{SseEvent, SseParser};
    use std::time::Duration;

    fn message(data: &str) -> SseEvent {
        SseEvent {
            event: None,
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn single_data_line() {
        let mut parser = SseParser::new();
        assert_eq!(parser.feed(b"data: {level=INFO}\n\n"), vec![message("{level=INFO}")]);
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut parser = SseParser::new();
        assert_eq!(parser.feed(b"data: a\ndata:b\n\n"), vec![message("a\nb")]);
    }

    #[test]
    fn lines_split_across_chunks() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"da").is_empty());
        assert!(parser.feed(b"ta: hel").is_empty());
        assert!(parser.feed(b"lo\r").is_empty());
        assert_eq!(parser.feed(b"\n\r\n"), vec![message("hello")]);
    }

    #[test]
    fn multibyte_character_split_across_chunks() {
        let mut parser = SseParser::new();
        let bytes = "data: señal\n\n".as_bytes();
        let (head, tail) = bytes.split_at(9);
        assert!(parser.feed(head).is_empty());
        assert_eq!(parser.feed(tail), vec![message("señal")]);
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let mut parser = SseParser::new();
        assert_eq!(
            parser.feed(b": keep-alive\nfoo: bar\ndata: x\n\n"),
            vec![message("x")]
        );
    }

    #[test]
    fn blank_line_without_data_dispatches_nothing() {
        let mut parser = SseParser::new();
        assert!(parser.feed(b"event: ping\n\n\n").is_empty());
        // The event name does not leak into the next event.
        assert_eq!(parser.feed(b"data: y\n\n"), vec![message("y")]);
    }

    #[test]
    fn id_event_and_retry_fields() {
        let mut parser = SseParser::new();
        let events = parser.feed(b"id: 7\nevent: status\nretry: 1500\ndata: up\n\n");

        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("status".to_string()),
                data: "up".to_string(),
                id: Some("7".to_string()),
            }]
        );
        assert!(!events[0].is_message());
        assert_eq!(parser.last_event_id(), Some("7"));
        assert_eq!(parser.retry(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn malformed_retry_is_ignored() {
        let mut parser = SseParser::new();
        parser.feed(b"retry: soon\n\n");
        assert_eq!(parser.retry(), None);
    }

    #[test]
    fn empty_data_line_dispatches_empty_message() {
        let mut parser = SseParser::new();
        assert_eq!(parser.feed(b"data\n\n"), vec![message("")]);
    }
}
