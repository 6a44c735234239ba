//! Device-effect actions returned by the agent each turn.
//!
//! Modeled as a closed tagged union rather than one struct with every field
//! optional: each variant carries only the fields that are meaningful for it,
//! and executors get exhaustiveness checking in their dispatch.
//!
//! Coordinates are in the pixel space of the most recently captured
//! screenshot. Any logical/physical pixel scaling is the executor's concern.

use serde::{Deserialize, Serialize};

/// Mouse button for click actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MouseButton {
    /// Primary button.
    Left,
    /// Secondary button.
    Right,
    /// Middle / wheel button.
    Middle,
}

/// Scroll direction for scroll actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollDirection {
    /// Scroll content up.
    Up,
    /// Scroll content down.
    Down,
    /// Scroll content left.
    Left,
    /// Scroll content right.
    Right,
}

/// A single device-effect instruction.
///
/// Produced by the decision parser, consumed immediately by the executor,
/// and discarded after the turn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Click at a screen coordinate.
    Click {
        /// X coordinate in screenshot pixel space.
        x: i32,
        /// Y coordinate in screenshot pixel space.
        y: i32,
        /// Button to click (defaults to left when absent).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        button: Option<MouseButton>,
    },

    /// Double-click at a screen coordinate.
    DoubleClick {
        /// X coordinate.
        x: i32,
        /// Y coordinate.
        y: i32,
    },

    /// Type literal text at the current focus.
    Type {
        /// Text to type.
        text: String,
    },

    /// Scroll in a direction by an amount.
    Scroll {
        /// Direction to scroll.
        direction: ScrollDirection,
        /// Scroll amount in device-dependent units.
        amount: i32,
    },

    /// Press a key combination.
    Hotkey {
        /// Keys pressed together (e.g. `["ctrl", "c"]`).
        keys: Vec<String>,
    },

    /// Drag from a start to an end coordinate.
    Drag {
        /// Start X coordinate.
        start_x: i32,
        /// Start Y coordinate.
        start_y: i32,
        /// End X coordinate.
        end_x: i32,
        /// End Y coordinate.
        end_y: i32,
        /// Drag duration in milliseconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
    },

    /// Wait for a duration before the next action.
    Wait {
        /// Wait duration in milliseconds.
        ms: u64,
    },

    /// The agent considers the task complete.
    Finished,

    /// The agent is waiting for user input on the remote surface.
    AwaitInput,
}
