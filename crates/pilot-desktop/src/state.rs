//! Loop state enums.
//!
//! Exactly one mutable state per loop instance; terminal states are
//! `Finished` / `Stopped` / `Error` (a loop does not auto-restart).

use std::fmt;

/// State of the HTTP-driven [`AgentLoop`](crate::AgentLoop).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    /// Not started, or unwound after cancellation.
    Idle,
    /// Actively stepping.
    Running,
    /// Suspended at the pause gate.
    Paused,
    /// The agent returned a finished decision.
    Finished,
    /// An unhandled fault ended the run.
    Error,
}

impl fmt::Display for LoopState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::Finished => write!(f, "finished"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// State of the subprocess-driven [`AgentDriver`](crate::AgentDriver).
///
/// A superset of [`LoopState`]: the subprocess protocol supports
/// confirmation gating in addition to free-text questions, so two extra
/// waiting states exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverState {
    /// No process spawned.
    Idle,
    /// Process running, turns progressing.
    Running,
    /// Turn progression paused.
    Paused,
    /// Waiting on a boolean go/no-go response.
    WaitingConfirmation,
    /// Waiting on a free-text answer.
    WaitingAnswer,
    /// A finished event arrived.
    Finished,
    /// Explicitly stopped by the caller.
    Stopped,
    /// A non-recoverable fault tore the driver down.
    Error,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Running => write!(f, "running"),
            Self::Paused => write!(f, "paused"),
            Self::WaitingConfirmation => write!(f, "waiting_confirmation"),
            Self::WaitingAnswer => write!(f, "waiting_answer"),
            Self::Finished => write!(f, "finished"),
            Self::Stopped => write!(f, "stopped"),
            Self::Error => write!(f, "error"),
        }
    }
}
