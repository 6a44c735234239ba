//! Injected capability seams.
//!
//! The loops own none of the device-level or transport machinery; they are
//! handed trait objects for "capture a screenshot", "execute a batch of
//! actions", and "submit a turn". Platform crates and the HTTP client plug
//! in here; tests plug in fakes.

use async_trait::async_trait;

use pilot_client::ApiClient;
use pilot_core::{Action, PilotError, Session, StepDecision, StepRequest};

/// Captures one screenshot of the local surface.
///
/// The returned string is base64 image data in the surface's pixel space;
/// action coordinates from subsequent decisions refer to that space.
/// Implementations should finish promptly or honor task cancellation —
/// the loop races the capture against its cancellation signal.
#[async_trait]
pub trait ScreenCapture: Send + Sync {
    /// Capture a screenshot as base64 image data.
    async fn capture(&self) -> Result<String, PilotError>;
}

/// Executes a decision's action batch on the local device.
///
/// Receives the full ordered list as returned by the agent and decides
/// itself whether to run the actions sequentially or concurrently. Any
/// logical/physical pixel scaling (high-DPI surfaces) is entirely the
/// executor's responsibility. Failures are surfaced to the caller through
/// the error callback; they do not abort the run.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// Perform the batch of device effects.
    async fn execute(&self, actions: &[Action]) -> Result<(), PilotError>;
}

/// Submits one turn to the remote step endpoint.
#[async_trait]
pub trait StepTransport: Send + Sync {
    /// POST the turn and return the agent's decision.
    async fn step(
        &self,
        session: &Session,
        request: &StepRequest,
    ) -> Result<StepDecision, PilotError>;
}

#[async_trait]
impl StepTransport for ApiClient {
    async fn step(
        &self,
        session: &Session,
        request: &StepRequest,
    ) -> Result<StepDecision, PilotError> {
        ApiClient::step(self, session, request).await
    }
}
