//! # pilot-protocol
//!
//! The subprocess wire protocol: newline-delimited JSON, one self-describing
//! object per line in both directions.
//!
//! - [`AgentEvent`]: process → caller messages, discriminated by an `event`
//!   field (core lifecycle events plus multimodal telemetry)
//! - [`AgentCommand`]: caller → process messages, discriminated by a
//!   `command` field
//! - [`codec`]: tolerant line decode / compact line encode
//!
//! Field names are snake_case on the wire. Unknown extra fields are ignored
//! on read; `None` optionals are omitted on write. A line boundary is the
//! message boundary, so writers must flush after every line.

#![deny(unsafe_code)]

pub mod codec;
pub mod command;
pub mod event;

pub use codec::{decode_command, decode_event, encode_command, encode_event};
pub use command::AgentCommand;
pub use event::AgentEvent;
