//! Live-update event stream for a session.
//!
//! A standard text event stream (SSE): each event carries an optional `id`,
//! a `event` type discriminator, and a JSON `data` payload. The stream is
//! finished when a terminal event type (`done` / `error`) is observed — the
//! consumer stops reading at that point rather than waiting for the
//! transport to close.
//!
//! The frame parser buffers raw bytes, splits on newlines, and accumulates
//! `id:` / `event:` / `data:` fields until a blank line dispatches the
//! frame. A frame whose `data` fails to parse as JSON yields a protocol
//! error item; the stream continues with the next frame.

use bytes::BytesMut;
use futures::Stream;
use reqwest::Method;
use serde_json::Value;
use tokio_stream::StreamExt;
use tracing::debug;

use pilot_core::PilotError;
use pilot_core::text::truncate_str;

use crate::http::ApiClient;

/// Terminal event types after which the consumer stops reading.
const TERMINAL_EVENT_TYPES: [&str; 2] = ["done", "error"];

/// One event from a session's live-update stream.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionEvent {
    /// Event id, when the server provides one.
    pub id: Option<String>,
    /// Event type discriminator (defaults to `message`).
    pub event_type: String,
    /// JSON data payload (`null` when the frame carried no data).
    pub data: Value,
}

impl SessionEvent {
    /// Whether this event ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        TERMINAL_EVENT_TYPES.contains(&self.event_type.as_str())
    }
}

/// Accumulates the fields of one in-flight SSE frame.
#[derive(Default)]
struct FrameFields {
    id: Option<String>,
    event_type: Option<String>,
    data: Vec<String>,
}

impl FrameFields {
    /// Feed one non-blank line into the frame.
    fn push_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return; // comment
        }
        if let Some(value) = field_value(line, "id") {
            self.id = Some(value.to_owned());
        } else if let Some(value) = field_value(line, "event") {
            self.event_type = Some(value.to_owned());
        } else if let Some(value) = field_value(line, "data") {
            self.data.push(value.to_owned());
        }
        // unknown fields are ignored per the SSE contract
    }

    /// Dispatch the accumulated frame, if it holds anything.
    fn take(&mut self) -> Option<Result<SessionEvent, PilotError>> {
        let frame = std::mem::take(self);
        if frame.event_type.is_none() && frame.data.is_empty() {
            return None;
        }
        let event_type = frame.event_type.unwrap_or_else(|| "message".to_owned());
        let data = if frame.data.is_empty() {
            Value::Null
        } else {
            let joined = frame.data.join("\n");
            match serde_json::from_str(&joined) {
                Ok(value) => value,
                Err(e) => {
                    return Some(Err(PilotError::Protocol {
                        message: format!("invalid event data: {e}"),
                        line: Some(truncate_str(&joined, 120)),
                    }));
                }
            }
        };
        Some(Ok(SessionEvent {
            id: frame.id,
            event_type,
            data,
        }))
    }
}

/// Extract the value of `field: value` (or `field:value`) from an SSE line.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Parse SSE frames from a byte stream into session events.
///
/// Ends after yielding a terminal event, or when the byte stream ends
/// (dispatching a trailing unterminated frame first).
pub fn parse_event_frames<S>(
    mut byte_stream: S,
) -> impl Stream<Item = Result<SessionEvent, PilotError>> + Send
where
    S: Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    async_stream::stream! {
        let mut buffer = BytesMut::with_capacity(8192);
        let mut frame = FrameFields::default();

        loop {
            // Drain complete lines from the buffer
            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let mut line_bytes = buffer.split_to(newline_pos + 1);
                line_bytes.truncate(line_bytes.len() - 1);
                if line_bytes.last() == Some(&b'\r') {
                    line_bytes.truncate(line_bytes.len() - 1);
                }
                let line = String::from_utf8_lossy(&line_bytes).into_owned();

                if line.is_empty() {
                    if let Some(result) = frame.take() {
                        let terminal =
                            matches!(&result, Ok(event) if event.is_terminal());
                        yield result;
                        if terminal {
                            debug!("terminal event observed, closing stream");
                            return;
                        }
                    }
                } else {
                    frame.push_line(&line);
                }
            }

            match byte_stream.next().await {
                Some(Ok(chunk)) => buffer.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    yield Err(PilotError::Connection {
                        message: e.to_string(),
                    });
                    return;
                }
                None => {
                    // Transport closed: dispatch a trailing unterminated frame
                    if !buffer.is_empty() {
                        let line = String::from_utf8_lossy(&buffer).into_owned();
                        frame.push_line(line.trim_end());
                    }
                    if let Some(result) = frame.take() {
                        yield result;
                    }
                    return;
                }
            }
        }
    }
}

impl ApiClient {
    /// Open the live-update event stream for a session.
    ///
    /// The returned stream yields events until a terminal `done`/`error`
    /// event is observed. Single malformed frames yield protocol-error
    /// items without ending the stream.
    pub async fn stream_events(
        &self,
        session_id: &str,
    ) -> Result<
        std::pin::Pin<Box<dyn Stream<Item = Result<SessionEvent, PilotError>> + Send>>,
        PilotError,
    > {
        let url = self.url(&format!("/sessions/{session_id}/events"));
        let response = self.send_checked(Method::GET, &url, None, true).await?;
        Ok(Box::pin(parse_event_frames(response.bytes_stream())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use bytes::Bytes;

    fn byte_stream(
        chunks: Vec<&'static str>,
    ) -> impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + Unpin + 'static {
        futures::stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok(Bytes::from(c)))
                .collect::<Vec<_>>(),
        )
    }

    async fn collect(chunks: Vec<&'static str>) -> Vec<Result<SessionEvent, PilotError>> {
        parse_event_frames(byte_stream(chunks)).collect().await
    }

    #[tokio::test]
    async fn single_event() {
        let events = collect(vec!["id: 1\nevent: step\ndata: {\"n\":1}\n\n"]).await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.id.as_deref(), Some("1"));
        assert_eq!(event.event_type, "step");
        assert_eq!(event.data["n"], 1);
    }

    #[tokio::test]
    async fn event_split_across_chunks() {
        let events = collect(vec!["event: step\nda", "ta: {\"n\":2}\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data["n"], 2);
    }

    #[tokio::test]
    async fn stops_after_terminal_done() {
        let events = collect(vec![
            "event: step\ndata: {\"n\":1}\n\nevent: done\ndata: {}\n\nevent: step\ndata: {\"n\":9}\n\n",
        ])
        .await;
        // The frame after `done` must not be read
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].as_ref().unwrap().event_type, "done");
        assert!(events[1].as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn error_event_is_terminal() {
        let events =
            collect(vec!["event: error\ndata: {\"message\":\"bad\"}\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn malformed_data_yields_protocol_error_and_continues() {
        let events = collect(vec![
            "event: step\ndata: {nope}\n\nevent: step\ndata: {\"n\":3}\n\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_matches!(events[0], Err(PilotError::Protocol { .. }));
        assert_eq!(events[1].as_ref().unwrap().data["n"], 3);
    }

    #[tokio::test]
    async fn multiline_data_joined() {
        let events = collect(vec!["data: {\"a\":\ndata: 1}\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data["a"], 1);
    }

    #[tokio::test]
    async fn comments_and_unknown_fields_ignored() {
        let events = collect(vec![": ping\nretry: 500\nevent: step\ndata: {}\n\n"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().event_type, "step");
    }

    #[tokio::test]
    async fn trailing_frame_dispatched_on_eof() {
        let events = collect(vec!["event: step\ndata: {\"n\":4}"]).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].as_ref().unwrap().data["n"], 4);
    }

    #[tokio::test]
    async fn dataless_frame_defaults() {
        let events = collect(vec!["event: ping\n\n"]).await;
        assert_eq!(events.len(), 1);
        let event = events[0].as_ref().unwrap();
        assert_eq!(event.event_type, "ping");
        assert_eq!(event.data, Value::Null);
        assert!(event.id.is_none());
    }

    #[tokio::test]
    async fn empty_stream_yields_nothing() {
        let events = collect(vec![]).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn untyped_frame_is_message() {
        let events = collect(vec!["data: {\"x\":1}\n\n"]).await;
        assert_eq!(events[0].as_ref().unwrap().event_type, "message");
    }
}
