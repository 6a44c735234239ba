//! Observer slots and input handlers.
//!
//! A small fixed set of named callbacks the caller may bind before starting
//! a loop. Notification callbacks (thinking / step / event / error) are
//! fire-and-forget: the loop invokes them and moves on. Input handlers
//! (ask-user, confirm) are async and gate turn progression.

use std::sync::Arc;

use futures::future::BoxFuture;

use pilot_core::{PilotError, StepDecision};
use pilot_protocol::AgentEvent;

/// Fire-and-forget notification of a thinking trace.
pub type ThinkingHandler = Arc<dyn Fn(&str) + Send + Sync>;
/// Fire-and-forget notification of a full step decision.
pub type StepHandler = Arc<dyn Fn(&StepDecision) + Send + Sync>;
/// Fire-and-forget notification of a raw subprocess event.
pub type EventHandler = Arc<dyn Fn(&AgentEvent) + Send + Sync>;
/// Fire-and-forget notification of a surfaced (non-fatal) error.
pub type ErrorHandler = Arc<dyn Fn(&PilotError) + Send + Sync>;
/// Async provider of an answer to an ask-user question.
pub type AskUserHandler =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<String, PilotError>> + Send + Sync>;
/// Async provider of a boolean confirmation response.
pub type ConfirmHandler =
    Arc<dyn Fn(String) -> BoxFuture<'static, Result<bool, PilotError>> + Send + Sync>;

/// The named observer slots for one loop instance.
#[derive(Clone, Default)]
pub struct Handlers {
    /// Thinking-trace notifications.
    pub thinking: Option<ThinkingHandler>,
    /// Full-decision notifications (HTTP loop).
    pub step: Option<StepHandler>,
    /// Raw-event notifications (subprocess driver).
    pub event: Option<EventHandler>,
    /// Surfaced non-fatal errors.
    pub error: Option<ErrorHandler>,
    /// Answer provider for ask-user questions.
    pub ask_user: Option<AskUserHandler>,
    /// Response provider for confirmation requests.
    pub confirm: Option<ConfirmHandler>,
}

impl Handlers {
    /// Empty handler set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the thinking-trace callback.
    #[must_use]
    pub fn on_thinking(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.thinking = Some(Arc::new(f));
        self
    }

    /// Bind the decision callback.
    #[must_use]
    pub fn on_step(mut self, f: impl Fn(&StepDecision) + Send + Sync + 'static) -> Self {
        self.step = Some(Arc::new(f));
        self
    }

    /// Bind the raw-event callback.
    #[must_use]
    pub fn on_event(mut self, f: impl Fn(&AgentEvent) + Send + Sync + 'static) -> Self {
        self.event = Some(Arc::new(f));
        self
    }

    /// Bind the surfaced-error callback.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&PilotError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// Bind the ask-user answer provider.
    #[must_use]
    pub fn on_ask_user(
        mut self,
        f: impl Fn(String) -> BoxFuture<'static, Result<String, PilotError>> + Send + Sync + 'static,
    ) -> Self {
        self.ask_user = Some(Arc::new(f));
        self
    }

    /// Bind the confirmation provider.
    #[must_use]
    pub fn on_confirm(
        mut self,
        f: impl Fn(String) -> BoxFuture<'static, Result<bool, PilotError>> + Send + Sync + 'static,
    ) -> Self {
        self.confirm = Some(Arc::new(f));
        self
    }

    /// Surface a non-fatal error to the caller, if a callback is bound.
    pub fn report_error(&self, error: &PilotError) {
        if let Some(handler) = &self.error {
            handler(error);
        }
    }

    /// Notify the thinking callback, if bound.
    pub(crate) fn notify_thinking(&self, text: &str) {
        if let Some(handler) = &self.thinking {
            handler(text);
        }
    }

    /// Notify the decision callback, if bound.
    pub(crate) fn notify_step(&self, decision: &StepDecision) {
        if let Some(handler) = &self.step {
            handler(decision);
        }
    }

    /// Notify the raw-event callback, if bound.
    pub(crate) fn notify_event(&self, event: &AgentEvent) {
        if let Some(handler) = &self.event {
            handler(event);
        }
    }
}
