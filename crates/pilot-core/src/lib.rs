//! # pilot-core
//!
//! Foundation types and utilities for the Pilot client SDK:
//!
//! - [`Action`]: Closed tagged union of device-effect instructions
//! - [`StepDecision`]: The agent's response for one turn, with the
//!   finished → ask-user → actions priority ordering
//! - [`PilotError`]: Structured error taxonomy for transport, protocol,
//!   and loop failures
//! - [`RetryConfig`] and backoff math for the retrying HTTP transport
//! - [`LoopConfig`] / [`DriverConfig`]: Loop and subprocess driver tuning
//! - [`logging::init_subscriber`]: `tracing` subscriber setup

#![deny(unsafe_code)]

pub mod actions;
pub mod config;
pub mod errors;
pub mod logging;
pub mod retry;
pub mod session;
pub mod step;
pub mod text;

pub use actions::{Action, MouseButton, ScrollDirection};
pub use config::{DriverConfig, LoopConfig, MultimodalFlags};
pub use errors::{HandlerKind, PilotError};
pub use retry::RetryConfig;
pub use session::{CreateSessionRequest, Session, SessionState, SessionStatus};
pub use step::{Disposition, StepDecision, StepRequest};
