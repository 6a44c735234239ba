//! Error taxonomy for the Pilot client SDK.
//!
//! One structured [`PilotError`] enum built on [`thiserror`] covers all error
//! domains: HTTP transport classification, subprocess wire protocol failures,
//! and loop-level faults. Classification helpers ([`PilotError::is_retryable`],
//! [`PilotError::retry_after`]) drive the retrying transport.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Which caller-supplied handler was required but missing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HandlerKind {
    /// Free-text question handler.
    AskUser,
    /// Boolean confirmation handler.
    Confirm,
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AskUser => write!(f, "ask-user"),
            Self::Confirm => write!(f, "confirm"),
        }
    }
}

/// Top-level error type for the Pilot SDK.
#[derive(Debug, Error)]
pub enum PilotError {
    /// Authentication failure (HTTP 401).
    #[error("authentication failed: {message}")]
    Auth {
        /// Server-provided detail.
        message: String,
    },

    /// Resource does not exist (HTTP 404).
    #[error("not found: {resource}")]
    NotFound {
        /// Resource that was requested.
        resource: String,
    },

    /// Operation not allowed (HTTP 403).
    #[error("permission denied: {message}")]
    PermissionDenied {
        /// Server-provided detail.
        message: String,
    },

    /// Rate limited (HTTP 429).
    #[error("rate limited: {message}")]
    RateLimited {
        /// Server-provided detail.
        message: String,
        /// Server-supplied retry hint, when present.
        retry_after: Option<Duration>,
    },

    /// Request validation failure (HTTP 422).
    #[error("validation failed ({} field(s))", .errors.len())]
    Validation {
        /// Field name → validation messages.
        errors: HashMap<String, Vec<String>>,
    },

    /// Generic server error (HTTP 5xx).
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided detail.
        message: String,
    },

    /// A turn failed while the session was executing.
    #[error("execution failed in session {session_id} at step {step}: {message}")]
    Execution {
        /// Session the failure belongs to.
        session_id: String,
        /// Step at which the failure occurred.
        step: u32,
        /// Failure detail.
        message: String,
    },

    /// An operation exceeded its deadline.
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        /// What timed out (e.g. `ready handshake`).
        operation: String,
        /// Deadline in milliseconds.
        timeout_ms: u64,
    },

    /// Connection or transport failure.
    #[error("connection failed: {message}")]
    Connection {
        /// Underlying transport detail.
        message: String,
    },

    /// A wire message could not be decoded (unknown or malformed).
    #[error("protocol error: {message}")]
    Protocol {
        /// Decode failure detail.
        message: String,
        /// Truncated preview of the offending line, when available.
        line: Option<String>,
    },

    /// The configured step budget was exhausted without a finished decision.
    #[error("step limit of {limit} exceeded")]
    StepLimitExceeded {
        /// Configured maximum step count.
        limit: u32,
    },

    /// The agent asked for input but no handler was registered.
    #[error("no {kind} handler registered")]
    NoHandler {
        /// Which handler was required.
        kind: HandlerKind,
    },

    /// The agent process exited without a terminal event.
    #[error("agent process exited unexpectedly (code {})", .code.map_or_else(|| "unknown".to_owned(), |c| c.to_string()))]
    ProcessExited {
        /// Process exit code, when observable.
        code: Option<i32>,
    },

    /// Non-recoverable error reported by the agent on the wire.
    #[error("{code}: {message}")]
    Agent {
        /// Machine-readable error code from the agent.
        code: String,
        /// Human-readable message from the agent.
        message: String,
        /// Step at which the agent failed, when reported.
        step: Option<u32>,
    },
}

impl PilotError {
    /// Whether the retrying transport should retry this fault locally.
    ///
    /// Rate limits, 5xx-class server errors, and transport failures are
    /// retryable; everything else propagates immediately.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Server { .. } | Self::Connection { .. }
        )
    }

    /// Server-supplied retry hint, when present.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Machine-readable code for logging and callbacks.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Auth { .. } => "auth",
            Self::NotFound { .. } => "not_found",
            Self::PermissionDenied { .. } => "permission_denied",
            Self::RateLimited { .. } => "rate_limited",
            Self::Validation { .. } => "validation",
            Self::Server { .. } => "server",
            Self::Execution { .. } => "execution",
            Self::Timeout { .. } => "timeout",
            Self::Connection { .. } => "connection",
            Self::Protocol { .. } => "protocol",
            Self::StepLimitExceeded { .. } => "step_limit_exceeded",
            Self::NoHandler { .. } => "no_handler",
            Self::ProcessExited { .. } => "process_exited",
            Self::Agent { code, .. } => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn retryable_classification() {
        assert!(
            PilotError::RateLimited {
                message: "slow down".into(),
                retry_after: None
            }
            .is_retryable()
        );
        assert!(
            PilotError::Server {
                status: 503,
                message: "unavailable".into()
            }
            .is_retryable()
        );
        assert!(
            PilotError::Connection {
                message: "refused".into()
            }
            .is_retryable()
        );
        assert!(
            !PilotError::Auth {
                message: "bad key".into()
            }
            .is_retryable()
        );
        assert!(!PilotError::NotFound { resource: "sess".into() }.is_retryable());
    }

    #[test]
    fn retry_after_only_on_rate_limit() {
        let err = PilotError::RateLimited {
            message: "slow down".into(),
            retry_after: Some(Duration::from_secs(30)),
        };
        assert_eq!(err.retry_after(), Some(Duration::from_secs(30)));
        let err = PilotError::Server {
            status: 500,
            message: "boom".into(),
        };
        assert_eq!(err.retry_after(), None);
    }

    #[test]
    fn agent_error_display_is_code_colon_message() {
        let err = PilotError::Agent {
            code: "E1".into(),
            message: "boom".into(),
            step: Some(5),
        };
        assert_eq!(err.to_string(), "E1: boom");
    }

    #[test]
    fn no_handler_display() {
        let err = PilotError::NoHandler {
            kind: HandlerKind::AskUser,
        };
        assert_eq!(err.to_string(), "no ask-user handler registered");
    }

    #[test]
    fn validation_holds_field_map() {
        let mut errors = HashMap::new();
        let _ = errors.insert("goal".to_owned(), vec!["must not be empty".to_owned()]);
        let err = PilotError::Validation { errors };
        assert_matches!(err, PilotError::Validation { ref errors } if errors.contains_key("goal"));
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn process_exited_display() {
        let err = PilotError::ProcessExited { code: Some(1) };
        assert_eq!(err.to_string(), "agent process exited unexpectedly (code 1)");
        let err = PilotError::ProcessExited { code: None };
        assert_eq!(
            err.to_string(),
            "agent process exited unexpectedly (code unknown)"
        );
    }
}
