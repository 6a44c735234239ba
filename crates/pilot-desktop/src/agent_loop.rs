//! HTTP-driven desktop loop.
//!
//! Repeats screenshot → step → act cycles against the remote step endpoint
//! until the agent reports finished, the caller stops the loop, or a fatal
//! fault (step budget, missing handler, transport failure) ends the run.
//!
//! Turns are strictly sequential within one loop instance: a turn's action
//! execution is dispatched before the next turn's capture begins. Across
//! instances there is no shared mutable state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use pilot_core::errors::HandlerKind;
use pilot_core::{Disposition, LoopConfig, PilotError, Session, StepDecision, StepRequest};

use crate::capabilities::{ActionExecutor, ScreenCapture, StepTransport};
use crate::gate::PauseGate;
use crate::handlers::Handlers;
use crate::state::LoopState;

/// How a completed run ended.
#[derive(Clone, Debug)]
pub enum RunOutcome {
    /// The agent returned a finished decision; here it is.
    Finished(StepDecision),
    /// The caller stopped the loop; the state unwound to `Idle`.
    Stopped,
}

/// RAII guard that resets `is_running` to `false` on drop (even on panic).
struct RunGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// What the turn dispatch decided, detached from the decision's borrows.
enum TurnOutcome {
    Finish,
    Ask(String),
    Act,
    Idle,
}

/// The HTTP-driven control loop for one session.
pub struct AgentLoop {
    session: Session,
    transport: Arc<dyn StepTransport>,
    capture: Arc<dyn ScreenCapture>,
    executor: Arc<dyn ActionExecutor>,
    handlers: Handlers,
    config: LoopConfig,
    state: Mutex<LoopState>,
    gate: PauseGate,
    cancel: Mutex<CancellationToken>,
    is_running: AtomicBool,
    steps_taken: AtomicU32,
    last_decision: Mutex<Option<StepDecision>>,
    pending_message: Mutex<Option<String>>,
    pending_answer: Mutex<Option<String>>,
}

impl AgentLoop {
    /// Create a loop for a session with its injected capabilities.
    #[must_use]
    pub fn new(
        session: Session,
        transport: Arc<dyn StepTransport>,
        capture: Arc<dyn ScreenCapture>,
        executor: Arc<dyn ActionExecutor>,
        handlers: Handlers,
        config: LoopConfig,
    ) -> Self {
        Self {
            session,
            transport,
            capture,
            executor,
            handlers,
            config,
            state: Mutex::new(LoopState::Idle),
            gate: PauseGate::new(),
            cancel: Mutex::new(CancellationToken::new()),
            is_running: AtomicBool::new(false),
            steps_taken: AtomicU32::new(0),
            last_decision: Mutex::new(None),
            pending_message: Mutex::new(None),
            pending_answer: Mutex::new(None),
        }
    }

    /// Current loop state.
    #[must_use]
    pub fn state(&self) -> LoopState {
        *self.state.lock()
    }

    /// Number of step calls completed so far in this run.
    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.steps_taken.load(Ordering::SeqCst)
    }

    /// The most recent decision, if any turn has completed.
    #[must_use]
    pub fn last_decision(&self) -> Option<StepDecision> {
        self.last_decision.lock().clone()
    }

    /// Queue a one-shot message for the next turn's request.
    pub fn queue_message(&self, message: impl Into<String>) {
        *self.pending_message.lock() = Some(message.into());
    }

    /// Suspend the loop at the top of its next iteration.
    ///
    /// No-op unless the loop is running. Idempotent: a second pause
    /// installs nothing extra, and a single resume fully releases it.
    pub fn pause(&self) {
        let mut state = self.state.lock();
        if *state == LoopState::Running {
            self.gate.pause();
            *state = LoopState::Paused;
            info!(session_id = %self.session.id, "loop paused");
        }
    }

    /// Release a paused loop.
    ///
    /// No-op unless the loop is paused.
    pub fn resume(&self) {
        let mut state = self.state.lock();
        if *state == LoopState::Paused {
            self.gate.resume();
            *state = LoopState::Running;
            info!(session_id = %self.session.id, "loop resumed");
        }
    }

    /// Cancel the loop cooperatively.
    ///
    /// Releases the pause gate so no waiter deadlocks; every suspension
    /// point observes the cancellation signal and unwinds to `Idle`.
    pub fn stop(&self) {
        self.cancel.lock().cancel();
        self.gate.resume();
        info!(session_id = %self.session.id, "loop stop requested");
    }

    /// Run the loop until finished, stopped, or a fatal fault.
    ///
    /// The final outcome is either a decision ([`RunOutcome::Finished`]),
    /// a cooperative unwind ([`RunOutcome::Stopped`], state `Idle`), or a
    /// typed failure (state `Error`).
    #[instrument(skip(self), fields(session_id = %self.session.id))]
    pub async fn run(&self) -> Result<RunOutcome, PilotError> {
        let Some(_guard) = RunGuard::acquire(&self.is_running) else {
            return Err(PilotError::Execution {
                session_id: self.session.id.clone(),
                step: self.current_step(),
                message: "loop is already running".into(),
            });
        };

        // Fresh cancellation signal and counters for this run
        let cancel = {
            let mut slot = self.cancel.lock();
            *slot = CancellationToken::new();
            slot.clone()
        };
        self.steps_taken.store(0, Ordering::SeqCst);
        *self.state.lock() = LoopState::Running;
        info!(goal = %self.session.goal, "loop started");

        let result = self.run_inner(&cancel).await;
        match &result {
            Ok(RunOutcome::Finished(decision)) => {
                *self.state.lock() = LoopState::Finished;
                info!(step = decision.step, "loop finished");
            }
            Ok(RunOutcome::Stopped) => {
                *self.state.lock() = LoopState::Idle;
                info!("loop stopped");
            }
            Err(error) => {
                *self.state.lock() = LoopState::Error;
                warn!(code = error.code(), error = %error, "loop failed");
            }
        }
        result
    }

    async fn run_inner(&self, cancel: &CancellationToken) -> Result<RunOutcome, PilotError> {
        loop {
            // 1. Cooperative suspension at the pause gate
            if !self.gate.wait_released(cancel).await || cancel.is_cancelled() {
                return Ok(RunOutcome::Stopped);
            }

            // 2. Step budget
            let limit = self.config.max_steps;
            if limit > 0 && self.current_step() >= limit {
                return Err(PilotError::StepLimitExceeded { limit });
            }

            // 3. Perception
            let Some(captured) = with_cancel(cancel, self.capture.capture()).await else {
                return Ok(RunOutcome::Stopped);
            };
            let screenshot = captured?;

            // 4. Submit the turn; message/answer fields are one-shot
            let request = StepRequest {
                screenshot,
                session_id: self.session.id.clone(),
                message: self.pending_message.lock().take(),
                user_response: self.pending_answer.lock().take(),
            };
            let Some(stepped) =
                with_cancel(cancel, self.transport.step(&self.session, &request)).await
            else {
                return Ok(RunOutcome::Stopped);
            };
            let decision = stepped?;
            let _ = self.steps_taken.fetch_add(1, Ordering::SeqCst);
            debug!(step = decision.step, actions = decision.actions.len(), "turn decision");

            // 5. Fire-and-forget notifications
            if let Some(thinking) = decision.thinking.as_deref() {
                self.handlers.notify_thinking(thinking);
            }
            self.handlers.notify_step(&decision);
            *self.last_decision.lock() = Some(decision.clone());

            // 6. Fixed priority: finished > ask-user > actions
            let outcome = match decision.disposition() {
                Disposition::Finished => TurnOutcome::Finish,
                Disposition::AskUser(question) => TurnOutcome::Ask(question.to_owned()),
                Disposition::Actions(_) => TurnOutcome::Act,
                Disposition::Idle => TurnOutcome::Idle,
            };

            match outcome {
                TurnOutcome::Finish => return Ok(RunOutcome::Finished(decision)),
                TurnOutcome::Ask(question) => {
                    // A silently dropped question would strand the remote
                    // agent in a wait state the caller cannot observe.
                    let Some(handler) = self.handlers.ask_user.clone() else {
                        return Err(PilotError::NoHandler {
                            kind: HandlerKind::AskUser,
                        });
                    };
                    let Some(answered) = with_cancel(cancel, handler(question)).await else {
                        return Ok(RunOutcome::Stopped);
                    };
                    // The answer rides on the next turn's request; no
                    // actions are executed for the question turn.
                    *self.pending_answer.lock() = Some(answered?);
                }
                TurnOutcome::Act => {
                    // 7. Executor failures are surfaced, not fatal
                    let Some(executed) =
                        with_cancel(cancel, self.executor.execute(&decision.actions)).await
                    else {
                        return Ok(RunOutcome::Stopped);
                    };
                    if let Err(error) = executed {
                        warn!(error = %error, "action execution failed");
                        self.handlers.report_error(&error);
                    }
                }
                TurnOutcome::Idle => {}
            }

            // 8. Cancellable inter-step delay
            let delay_ms = self.config.step_delay_ms;
            if delay_ms > 0 {
                let sleep = tokio::time::sleep(Duration::from_millis(delay_ms));
                if with_cancel(cancel, sleep).await.is_none() {
                    return Ok(RunOutcome::Stopped);
                }
            }
        }
    }
}

/// Race a future against the loop's cancellation signal.
///
/// `None` means the signal won.
async fn with_cancel<T>(
    cancel: &CancellationToken,
    future: impl std::future::Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        () = cancel.cancelled() => None,
        value = future => Some(value),
    }
}
