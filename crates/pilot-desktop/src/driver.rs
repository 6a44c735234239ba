//! Subprocess-driven desktop driver.
//!
//! Owns the lifecycle of one long-running agent process: spawn with an
//! explicit environment, handshake on the `ready` event, send the start
//! command, then translate the process's newline-delimited JSON event
//! stream into the shared decision vocabulary until a terminal event or a
//! forced stop.
//!
//! The stdio pipe is treated as two independent concurrent activities: a
//! reader task that pulls one line at a time, decodes it, and hands the
//! result to the dispatch loop over a channel; and a writer that
//! serializes a command, writes the line, and flushes immediately (the
//! process is interactive, not batch). They coordinate only through the
//! shared state field and the outcome of the pending start call.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use pilot_core::errors::HandlerKind;
use pilot_core::{DriverConfig, PilotError};
use pilot_protocol::{AgentCommand, AgentEvent, codec};

use crate::capabilities::ActionExecutor;
use crate::handlers::Handlers;
use crate::state::DriverState;

/// Capacity of the reader → dispatch channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Payload of the terminal `finished` event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Whether the goal was achieved.
    pub success: bool,
    /// Short machine-oriented reason.
    pub reason: Option<String>,
    /// Human-readable summary of what was done.
    pub summary: Option<String>,
    /// Final turn counter.
    pub step: u32,
}

/// How a driver run ended.
#[derive(Clone, Debug)]
pub enum DriverOutcome {
    /// The process reported a finished run.
    Finished(RunSummary),
    /// The caller stopped the driver before a terminal event.
    Stopped,
}

/// Serializing writer over the process's standard input.
///
/// Every command is one line, flushed immediately.
struct CommandWriter {
    stdin: tokio::sync::Mutex<ChildStdin>,
}

impl CommandWriter {
    async fn send(&self, command: &AgentCommand) -> Result<(), PilotError> {
        let mut line = codec::encode_command(command)?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| PilotError::Connection {
                message: format!("write to agent process failed: {e}"),
            })?;
        stdin.flush().await.map_err(|e| PilotError::Connection {
            message: format!("flush to agent process failed: {e}"),
        })
    }
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

/// The subprocess-driven control loop.
pub struct AgentDriver {
    program: PathBuf,
    args: Vec<String>,
    config: DriverConfig,
    handlers: Handlers,
    executor: Option<Arc<dyn ActionExecutor>>,
    state: Mutex<DriverState>,
    cancel: Mutex<CancellationToken>,
    is_running: AtomicBool,
    writer: Mutex<Option<Arc<CommandWriter>>>,
    session_id: Mutex<Option<String>>,
    current_step: AtomicU32,
}

impl AgentDriver {
    /// Create a driver for an agent binary.
    #[must_use]
    pub fn new(
        program: impl Into<PathBuf>,
        args: Vec<String>,
        config: DriverConfig,
        handlers: Handlers,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            config,
            handlers,
            executor: None,
            state: Mutex::new(DriverState::Idle),
            cancel: Mutex::new(CancellationToken::new()),
            is_running: AtomicBool::new(false),
            writer: Mutex::new(None),
            session_id: Mutex::new(None),
            current_step: AtomicU32::new(0),
        }
    }

    /// Attach a local executor for the process's `action` events.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ActionExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Current driver state.
    #[must_use]
    pub fn state(&self) -> DriverState {
        *self.state.lock()
    }

    /// Most recent turn counter reported by the process.
    #[must_use]
    pub fn current_step(&self) -> u32 {
        self.current_step.load(Ordering::SeqCst)
    }

    /// Remote session id, once the process reports one.
    #[must_use]
    pub fn session_id(&self) -> Option<String> {
        self.session_id.lock().clone()
    }

    /// Spawn the process and run until a terminal event or stop.
    ///
    /// The returned future is the pending result of the whole run: it
    /// resolves with the finished payload, `Stopped` after [`stop`], or
    /// the fatal fault that tore the driver down. The process handle and
    /// stream resources are released on every exit path.
    ///
    /// [`stop`]: AgentDriver::stop
    #[instrument(skip(self, goal), fields(program = %self.program.display()))]
    pub async fn start(&self, goal: impl Into<String>) -> Result<DriverOutcome, PilotError> {
        let Some(_guard) = RunGuard::acquire(&self.is_running) else {
            return Err(PilotError::Connection {
                message: "driver is already running".into(),
            });
        };

        let cancel = {
            let mut slot = self.cancel.lock();
            *slot = CancellationToken::new();
            slot.clone()
        };
        self.current_step.store(0, Ordering::SeqCst);
        *self.session_id.lock() = None;

        let result = self.run_process(goal.into(), &cancel).await;

        *self.writer.lock() = None;
        match &result {
            Ok(DriverOutcome::Finished(summary)) => {
                *self.state.lock() = DriverState::Finished;
                info!(success = summary.success, step = summary.step, "driver finished");
            }
            Ok(DriverOutcome::Stopped) => {
                *self.state.lock() = DriverState::Stopped;
                info!("driver stopped");
            }
            Err(error) => {
                *self.state.lock() = DriverState::Error;
                warn!(code = error.code(), error = %error, "driver failed");
            }
        }
        result
    }

    /// Ask the process to suspend turn progression.
    pub async fn pause(&self) -> Result<(), PilotError> {
        self.writer()?.send(&AgentCommand::Pause).await?;
        let mut state = self.state.lock();
        if *state == DriverState::Running {
            *state = DriverState::Paused;
        }
        Ok(())
    }

    /// Ask the process to resume turn progression.
    pub async fn resume(&self) -> Result<(), PilotError> {
        self.writer()?.send(&AgentCommand::Resume).await?;
        let mut state = self.state.lock();
        if *state == DriverState::Paused {
            *state = DriverState::Running;
        }
        Ok(())
    }

    /// Stop the run: send the stop command, wait briefly for a graceful
    /// exit, and force-kill on timeout. Unblocks every pending wait.
    pub fn stop(&self) {
        self.cancel.lock().cancel();
        info!("driver stop requested");
    }

    /// Push a caller-captured screenshot to the process.
    pub async fn send_screenshot(&self, data: impl Into<String>) -> Result<(), PilotError> {
        self.writer()?
            .send(&AgentCommand::Screenshot { data: data.into() })
            .await
    }

    /// Manually answer an outstanding confirmation request.
    pub async fn respond_confirm(&self, id: &str, approved: bool) -> Result<(), PilotError> {
        self.writer()?
            .send(&AgentCommand::Confirm {
                id: id.to_owned(),
                approved,
            })
            .await?;
        self.leave_waiting(DriverState::WaitingConfirmation);
        Ok(())
    }

    /// Manually answer an outstanding question.
    pub async fn respond_answer(&self, id: &str, answer: &str) -> Result<(), PilotError> {
        self.writer()?
            .send(&AgentCommand::Answer {
                id: id.to_owned(),
                answer: answer.to_owned(),
            })
            .await?;
        self.leave_waiting(DriverState::WaitingAnswer);
        Ok(())
    }

    /// Multimodal: request the accumulated audio transcript.
    pub async fn request_audio_transcript(&self) -> Result<(), PilotError> {
        self.writer()?.send(&AgentCommand::GetAudioTranscript).await
    }

    /// Multimodal: request the latest video frame.
    pub async fn request_video_frame(&self) -> Result<(), PilotError> {
        self.writer()?.send(&AgentCommand::GetVideoFrame).await
    }

    fn writer(&self) -> Result<Arc<CommandWriter>, PilotError> {
        self.writer
            .lock()
            .clone()
            .ok_or_else(|| PilotError::Connection {
                message: "agent process is not running".into(),
            })
    }

    fn leave_waiting(&self, waiting: DriverState) {
        let mut state = self.state.lock();
        if *state == waiting {
            *state = DriverState::Running;
        }
    }

    async fn run_process(
        &self,
        goal: String,
        cancel: &CancellationToken,
    ) -> Result<DriverOutcome, PilotError> {
        // The spawned process gets an explicit environment map, not the
        // parent environment, so credential scoping is explicit.
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env_clear()
            .envs(&self.config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PilotError::Connection {
                message: format!("failed to spawn agent process: {e}"),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| PilotError::Connection {
            message: "agent process stdin unavailable".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| PilotError::Connection {
            message: "agent process stdout unavailable".into(),
        })?;

        let writer = Arc::new(CommandWriter {
            stdin: tokio::sync::Mutex::new(stdin),
        });
        *self.writer.lock() = Some(writer.clone());

        // Reader: one line at a time, decoded, handed to the dispatch loop
        let (tx, mut rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let reader_cancel = cancel.clone();
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                tokio::select! {
                    () = reader_cancel.cancelled() => break,
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            if line.trim().is_empty() {
                                continue;
                            }
                            if tx.send(codec::decode_event(&line)).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) | Err(_) => break,
                    }
                }
            }
        });

        // Handshake: a bounded wait for the ready event
        let ready_timeout = Duration::from_millis(self.config.ready_timeout_ms);
        match tokio::time::timeout(ready_timeout, self.await_ready(&mut rx)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                self.teardown(&mut child, None).await;
                reader.abort();
                return Err(error);
            }
            Err(_) => {
                self.teardown(&mut child, None).await;
                reader.abort();
                return Err(PilotError::Timeout {
                    operation: "ready handshake".into(),
                    timeout_ms: self.config.ready_timeout_ms,
                });
            }
        }

        *self.state.lock() = DriverState::Running;
        let start = AgentCommand::Start {
            goal,
            session_id: None,
            audio: self.config.multimodal.audio,
            video: self.config.multimodal.video,
        };
        if let Err(error) = writer.send(&start).await {
            self.teardown(&mut child, None).await;
            reader.abort();
            return Err(error);
        }
        debug!("start command sent");

        // Dispatch: translate events into state transitions until terminal
        let grace = Duration::from_millis(self.config.stop_grace_ms);
        loop {
            tokio::select! {
                // Cancellation also stops the reader task, closing the
                // channel; poll the cancel branch first so a stop is never
                // mistaken for the process exiting on its own.
                biased;
                () = cancel.cancelled() => {
                    self.teardown(&mut child, Some(&writer)).await;
                    return Ok(DriverOutcome::Stopped);
                }
                received = rx.recv() => match received {
                    None => {
                        let code = child.wait().await.ok().and_then(|s| s.code());
                        return Err(PilotError::ProcessExited { code });
                    }
                    Some(Err(protocol_error)) => {
                        // One malformed line never stops the run
                        self.handlers.report_error(&protocol_error);
                    }
                    Some(Ok(event)) => match self.dispatch(event, &writer).await {
                        Ok(Some(summary)) => {
                            // The process exits on its own after finished;
                            // give it the grace window, then make sure
                            let _ = tokio::time::timeout(grace, child.wait()).await;
                            self.teardown(&mut child, None).await;
                            return Ok(DriverOutcome::Finished(summary));
                        }
                        Ok(None) => {}
                        Err(error) => {
                            self.teardown(&mut child, None).await;
                            return Err(error);
                        }
                    },
                }
            }
        }
    }

    /// Consume events until `ready`, skipping reported protocol errors.
    async fn await_ready(
        &self,
        rx: &mut mpsc::Receiver<Result<AgentEvent, PilotError>>,
    ) -> Result<(), PilotError> {
        loop {
            match rx.recv().await {
                None => return Err(PilotError::ProcessExited { code: None }),
                Some(Err(protocol_error)) => self.handlers.report_error(&protocol_error),
                Some(Ok(AgentEvent::Ready {
                    version,
                    protocol_version,
                })) => {
                    info!(version = %version, protocol_version, "agent process ready");
                    return Ok(());
                }
                Some(Ok(event)) => {
                    warn!(?event, "event before ready ignored");
                }
            }
        }
    }

    /// Apply one event to the state machine.
    ///
    /// Returns `Some(summary)` on the terminal finished event, `Err` on a
    /// fatal fault, and `None` otherwise.
    async fn dispatch(
        &self,
        event: AgentEvent,
        writer: &Arc<CommandWriter>,
    ) -> Result<Option<RunSummary>, PilotError> {
        self.handlers.notify_event(&event);

        match event {
            AgentEvent::Ready { .. } => {
                debug!("duplicate ready event ignored");
            }

            AgentEvent::StateChange { state } => match state.as_str() {
                "running" => self.leave_waiting(DriverState::Paused),
                "paused" => {
                    let mut current = self.state.lock();
                    if *current == DriverState::Running {
                        *current = DriverState::Paused;
                    }
                }
                other => debug!(state = other, "unmapped process state"),
            },

            AgentEvent::Thinking { text } => {
                self.handlers.notify_thinking(&text);
            }

            AgentEvent::Action { actions, step } => {
                self.current_step.store(step, Ordering::SeqCst);
                if let Some(executor) = &self.executor {
                    // Executor failures are surfaced, not fatal
                    if let Err(error) = executor.execute(&actions).await {
                        warn!(error = %error, "action execution failed");
                        self.handlers.report_error(&error);
                    }
                }
            }

            AgentEvent::Confirm { id, message } => {
                *self.state.lock() = DriverState::WaitingConfirmation;
                if let Some(handler) = self.handlers.confirm.clone() {
                    match handler(message).await {
                        Ok(approved) => {
                            writer.send(&AgentCommand::Confirm { id, approved }).await?;
                            self.leave_waiting(DriverState::WaitingConfirmation);
                        }
                        Err(error) => {
                            // Stay waiting for a manual respond_confirm
                            warn!(error = %error, "confirm handler failed");
                            self.handlers.report_error(&error);
                        }
                    }
                }
            }

            AgentEvent::AskQuestion { id, question } => {
                *self.state.lock() = DriverState::WaitingAnswer;
                let Some(handler) = self.handlers.ask_user.clone() else {
                    // A silently dropped question would strand the agent
                    return Err(PilotError::NoHandler {
                        kind: HandlerKind::AskUser,
                    });
                };
                match handler(question).await {
                    Ok(answer) => {
                        writer.send(&AgentCommand::Answer { id, answer }).await?;
                        self.leave_waiting(DriverState::WaitingAnswer);
                    }
                    Err(error) => {
                        // Stay waiting for a manual respond_answer
                        warn!(error = %error, "ask-user handler failed");
                        self.handlers.report_error(&error);
                    }
                }
            }

            AgentEvent::Finished {
                success,
                reason,
                summary,
                step,
            } => {
                self.current_step.store(step, Ordering::SeqCst);
                return Ok(Some(RunSummary {
                    success,
                    reason,
                    summary,
                    step,
                }));
            }

            AgentEvent::Error {
                code,
                message,
                recoverable,
                step,
            } => {
                let error = PilotError::Agent {
                    code,
                    message,
                    step,
                };
                if recoverable {
                    self.handlers.report_error(&error);
                } else {
                    return Err(error);
                }
            }

            // Informational events update auxiliary state only
            AgentEvent::ScreenshotCaptured { step } => {
                self.current_step.store(step, Ordering::SeqCst);
            }
            AgentEvent::SessionCreated { session_id } => {
                *self.session_id.lock() = Some(session_id);
            }
            AgentEvent::AudioTranscript { .. }
            | AgentEvent::VideoFrame { .. }
            | AgentEvent::SpeechStarted
            | AgentEvent::SpeechFinished
            | AgentEvent::TurnDetected => {}
        }

        Ok(None)
    }

    /// Terminate the process: optionally send the stop command, give it
    /// the grace window, then force-kill. Always reaps the child.
    async fn teardown(&self, child: &mut Child, writer: Option<&Arc<CommandWriter>>) {
        if let Some(writer) = writer {
            let _ = writer.send(&AgentCommand::Stop).await;
        }
        let grace = Duration::from_millis(self.config.stop_grace_ms);
        if tokio::time::timeout(grace, child.wait()).await.is_err() {
            warn!("agent process did not exit in time, killing");
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    }
}
