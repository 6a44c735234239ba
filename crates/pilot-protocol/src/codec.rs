//! Line codec: one JSON object per line, tolerant on read.
//!
//! Decode failures on a single line never crash the read loop — the caller
//! reports the [`PilotError::Protocol`] through its error callback and keeps
//! reading. Encoders produce compact one-line JSON without the trailing
//! newline (the writer appends it and flushes).

use pilot_core::PilotError;
use pilot_core::text::truncate_str;
use tracing::warn;

use crate::command::AgentCommand;
use crate::event::AgentEvent;

/// Longest line preview attached to a protocol error.
const LINE_PREVIEW_CHARS: usize = 120;

/// Decode one event line from the process.
///
/// Malformed JSON and unknown `event` discriminators both map to
/// [`PilotError::Protocol`] carrying a truncated preview of the line.
pub fn decode_event(line: &str) -> Result<AgentEvent, PilotError> {
    decode(line)
}

/// Decode one command line (used by test doubles standing in for the process).
pub fn decode_command(line: &str) -> Result<AgentCommand, PilotError> {
    decode(line)
}

/// Encode a command as a compact single line.
pub fn encode_command(command: &AgentCommand) -> Result<String, PilotError> {
    encode(command)
}

/// Encode an event as a compact single line (for test doubles).
pub fn encode_event(event: &AgentEvent) -> Result<String, PilotError> {
    encode(event)
}

fn decode<T: serde::de::DeserializeOwned>(line: &str) -> Result<T, PilotError> {
    let trimmed = line.trim();
    serde_json::from_str(trimmed).map_err(|e| {
        warn!(error = %e, line = %truncate_str(trimmed, LINE_PREVIEW_CHARS), "undecodable wire line");
        PilotError::Protocol {
            message: e.to_string(),
            line: Some(truncate_str(trimmed, LINE_PREVIEW_CHARS)),
        }
    })
}

fn encode<T: serde::Serialize>(message: &T) -> Result<String, PilotError> {
    serde_json::to_string(message).map_err(|e| PilotError::Protocol {
        message: format!("encode failed: {e}"),
        line: None,
    })
}
