//! # pilot-desktop
//!
//! The two desktop control loops, one state machine applied in two
//! topologies:
//!
//! - [`AgentLoop`]: HTTP-driven — each turn captures a screenshot, submits
//!   it to the remote step endpoint, and executes the returned actions
//!   locally.
//! - [`AgentDriver`]: subprocess-driven — owns a long-lived agent process,
//!   exchanges newline-delimited JSON over its stdio, and surfaces the same
//!   decision vocabulary as events, with confirmation and question gating.
//!
//! Both loops are cooperative async tasks: every suspension point (capture,
//! network, process I/O, handler callbacks, delays, the pause gate) observes
//! one cancellation token per loop instance, so `stop()` unblocks every
//! pending wait promptly.

#![deny(unsafe_code)]

pub mod agent_loop;
pub mod capabilities;
pub mod driver;
mod gate;
pub mod handlers;
pub mod state;

pub use agent_loop::{AgentLoop, RunOutcome};
pub use capabilities::{ActionExecutor, ScreenCapture, StepTransport};
pub use driver::{AgentDriver, DriverOutcome, RunSummary};
pub use handlers::Handlers;
pub use state::{DriverState, LoopState};
