//! Tuning knobs for the desktop loops.
//!
//! Plain serde structs with per-field defaults so partial JSON config
//! deep-merges cleanly over compiled defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Default inter-step delay in milliseconds.
pub const DEFAULT_STEP_DELAY_MS: u64 = 1000;
/// Default ready-handshake timeout in milliseconds.
pub const DEFAULT_READY_TIMEOUT_MS: u64 = 10_000;
/// Default graceful-stop window before force kill, in milliseconds.
pub const DEFAULT_STOP_GRACE_MS: u64 = 3_000;

/// Configuration for the HTTP-driven [`AgentLoop`].
///
/// [`AgentLoop`]: https://docs.rs/pilot-desktop
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopConfig {
    /// Step budget; `0` means unlimited (default: 0).
    #[serde(default)]
    pub max_steps: u32,
    /// Inter-step delay in ms; `0` skips the sleep (default: 1000).
    #[serde(default = "default_step_delay_ms")]
    pub step_delay_ms: u64,
}

fn default_step_delay_ms() -> u64 {
    DEFAULT_STEP_DELAY_MS
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_steps: 0,
            step_delay_ms: DEFAULT_STEP_DELAY_MS,
        }
    }
}

/// Multimodal feature flags sent with the subprocess start command.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultimodalFlags {
    /// Enable audio transcript events.
    #[serde(default)]
    pub audio: bool,
    /// Enable video frame events.
    #[serde(default)]
    pub video: bool,
}

/// Configuration for the subprocess-driven [`AgentDriver`].
///
/// [`AgentDriver`]: https://docs.rs/pilot-desktop
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// How long to wait for the `ready` event before failing startup
    /// (default: 10000).
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Graceful-exit window after the stop command before force kill
    /// (default: 3000).
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
    /// Explicit environment for the spawned process. The process does NOT
    /// inherit the parent environment, so credential scoping is explicit.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Multimodal stream flags for the start command.
    #[serde(default)]
    pub multimodal: MultimodalFlags,
}

fn default_ready_timeout_ms() -> u64 {
    DEFAULT_READY_TIMEOUT_MS
}
fn default_stop_grace_ms() -> u64 {
    DEFAULT_STOP_GRACE_MS
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            ready_timeout_ms: DEFAULT_READY_TIMEOUT_MS,
            stop_grace_ms: DEFAULT_STOP_GRACE_MS,
            env: HashMap::new(),
            multimodal: MultimodalFlags::default(),
        }
    }
}
