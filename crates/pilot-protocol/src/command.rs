//! Commands sent to the agent process.

use serde::{Deserialize, Serialize};

/// One caller → process message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum AgentCommand {
    /// Begin a run with a goal and multimodal flags.
    Start {
        /// Goal / task text.
        goal: String,
        /// Existing remote session to attach to, when resuming.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
        /// Enable audio transcript events.
        #[serde(default)]
        audio: bool,
        /// Enable video frame events.
        #[serde(default)]
        video: bool,
    },

    /// Push a caller-captured screenshot to the process.
    Screenshot {
        /// Base64-encoded image data.
        data: String,
    },

    /// Suspend turn progression after the current turn.
    Pause,

    /// Resume turn progression.
    Resume,

    /// Request a graceful shutdown.
    Stop,

    /// Answer a `confirm` event.
    Confirm {
        /// Echoed request id from the confirm event.
        id: String,
        /// Whether the action is approved.
        approved: bool,
    },

    /// Answer an `ask_question` event.
    Answer {
        /// Echoed question id from the ask event.
        id: String,
        /// Free-text answer.
        answer: String,
    },

    /// Multimodal: request the accumulated audio transcript.
    GetAudioTranscript,

    /// Multimodal: request the latest video frame.
    GetVideoFrame,
}
