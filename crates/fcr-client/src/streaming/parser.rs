//! SSE (Server-Sent Events) parser
//!
//! Turns the `/heartbeat` wire format into [`ServerEvent`]s.

use bytes::Bytes;
use fcr_core::{ServerEvent, ServerStatus};
use tracing::trace;

use crate::error::{FcrClientError, Result};

/// SSE parser state
#[derive(Debug, Default)]
pub struct SseParser {
    /// Bytes of an incomplete line
    buffer: Vec<u8>,
    /// Data lines of the current event
    data: Option<String>,
    /// Current event type, if named
    event_type: Option<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes into the parser and extract any complete events
    pub fn feed(&mut self, bytes: Bytes) -> Vec<Result<ServerEvent>> {
        let mut events = Vec::new();
        self.buffer.extend_from_slice(&bytes);

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }

            if let Some(event) = self.process_line(&line) {
                events.push(event);
            }
        }

        events
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Result<ServerEvent>> {
        // Blank line ends the event
        if line.is_empty() {
            return self.dispatch_event();
        }

        // Comment (keepalive)
        if line.starts_with(b":") {
            trace!("SSE comment");
            return None;
        }

        let line = match std::str::from_utf8(line) {
            Ok(s) => s,
            Err(_) => {
                return Some(Err(FcrClientError::ParseError(
                    "Invalid UTF-8 in event stream".into(),
                )))
            }
        };

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => match &mut self.data {
                Some(data) => {
                    data.push('\n');
                    data.push_str(value);
                }
                None => self.data = Some(value.to_string()),
            },
            "event" => self.event_type = Some(value.to_string()),
            _ => trace!(field, "SSE field ignored"),
        }

        None
    }

    fn dispatch_event(&mut self) -> Option<Result<ServerEvent>> {
        let data = self.data.take();
        let event_type = self.event_type.take();

        match event_type.as_deref() {
            Some("heartbeat") => Some(Ok(ServerEvent::Heartbeat)),
            Some("status") => Some(Ok(ServerEvent::Status(ServerStatus::from_payload(
                data.as_deref().unwrap_or_default(),
            )))),
            other => {
                trace!(event = ?other, ?data, "Unhandled server event");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_heartbeat_and_status() {
        let mut parser = SseParser::new();

        let input = b"event: heartbeat\ndata: 1\n\nevent: status\ndata: {\"Connected\":false}\n\n";
        let events: Vec<_> = parser
            .feed(Bytes::from_static(input))
            .into_iter()
            .map(|e| e.unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                ServerEvent::Heartbeat,
                ServerEvent::Status(ServerStatus {
                    connected: Some(false),
                    ..Default::default()
                }),
            ]
        );
    }

    #[test]
    fn test_parse_chunked_crlf() {
        let mut parser = SseParser::new();

        assert!(parser.feed(Bytes::from_static(b"event: sta")).is_empty());
        assert!(parser.feed(Bytes::from_static(b"tus\r\ndata: ecu ")).is_empty());
        let events = parser.feed(Bytes::from_static(b"offline\r\n\r\n"));

        assert_eq!(events.len(), 1);
        match events[0].as_ref().unwrap() {
            ServerEvent::Status(status) => {
                assert_eq!(status.message.as_deref(), Some("ecu offline"))
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_heartbeat_without_data() {
        let mut parser = SseParser::new();
        let events = parser.feed(Bytes::from_static(b"event: heartbeat\n\n"));
        assert!(matches!(events.as_slice(), [Ok(ServerEvent::Heartbeat)]));
    }

    #[test]
    fn test_ignore_comments_and_unnamed() {
        let mut parser = SseParser::new();

        let input = b": keepalive\ndata: hello\n\nevent: heartbeat\ndata:\n\n";
        let events = parser.feed(Bytes::from_static(input));

        assert!(matches!(events.as_slice(), [Ok(ServerEvent::Heartbeat)]));
    }
}
