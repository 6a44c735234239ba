//! Events emitted by the agent process.
//!
//! Two families share one enum:
//!
//! - **Core lifecycle**: `ready`, `state_change`, `thinking`, `action`,
//!   `confirm`, `ask_question`, `finished`, `error` — these drive the
//!   driver's state machine.
//! - **Informational / multimodal**: `screenshot_captured`,
//!   `session_created`, `audio_transcript`, `video_frame`,
//!   `speech_started`, `speech_finished`, `turn_detected` — these update
//!   auxiliary callbacks only and never change the primary state.
//!
//! An unknown `event` discriminator is a protocol error, not a silent skip.

use serde::{Deserialize, Serialize};

use pilot_core::Action;

/// One process → caller message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Handshake: the process is ready to receive the start command.
    Ready {
        /// Agent binary version.
        version: String,
        /// Wire protocol version.
        protocol_version: u32,
    },

    /// The process reports its own loop state.
    StateChange {
        /// New state name (e.g. `running`, `paused`).
        state: String,
    },

    /// Free-text reasoning trace for the current turn.
    Thinking {
        /// Reasoning text.
        text: String,
    },

    /// The agent decided on actions for this turn.
    Action {
        /// Ordered actions for the turn.
        actions: Vec<Action>,
        /// Turn counter.
        step: u32,
    },

    /// The agent wants a boolean go/no-go before proceeding.
    Confirm {
        /// Request id to echo back in the confirm command.
        id: String,
        /// What the agent is about to do.
        message: String,
    },

    /// The agent needs a free-text answer before proceeding.
    AskQuestion {
        /// Question id to echo back in the answer command.
        id: String,
        /// The question text.
        question: String,
    },

    /// Terminal: the run completed.
    Finished {
        /// Whether the goal was achieved.
        success: bool,
        /// Short machine-oriented reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        /// Human-readable summary of what was done.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        /// Final turn counter.
        step: u32,
    },

    /// An error occurred. Non-recoverable errors are terminal.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
        /// Whether the run can continue.
        recoverable: bool,
        /// Turn at which the error occurred, when known.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<u32>,
    },

    /// Informational: the process captured a screenshot itself.
    ScreenshotCaptured {
        /// Turn counter.
        step: u32,
    },

    /// Informational: the process created a remote session.
    SessionCreated {
        /// Remote session identifier.
        session_id: String,
    },

    /// Multimodal: incremental audio transcript.
    AudioTranscript {
        /// Transcript text.
        text: String,
        /// Whether this transcript segment is final.
        #[serde(rename = "final")]
        is_final: bool,
    },

    /// Multimodal: one encoded video frame.
    VideoFrame {
        /// Base64-encoded frame data.
        data: String,
        /// Capture timestamp in milliseconds.
        timestamp_ms: u64,
    },

    /// Multimodal: user speech started.
    SpeechStarted,

    /// Multimodal: user speech finished.
    SpeechFinished,

    /// Multimodal: a conversational turn boundary was detected.
    TurnDetected,
}

impl AgentEvent {
    /// Whether this event is informational only.
    ///
    /// Informational events update auxiliary callbacks/state but never
    /// change the driver's primary state.
    #[must_use]
    pub fn is_informational(&self) -> bool {
        matches!(
            self,
            Self::ScreenshotCaptured { .. }
                | Self::SessionCreated { .. }
                | Self::AudioTranscript { .. }
                | Self::VideoFrame { .. }
                | Self::SpeechStarted
                | Self::SpeechFinished
                | Self::TurnDetected
        )
    }
}
