//! Session types for the remote agent service.
//!
//! A session identifies one agent run. It is created by the HTTP client and
//! referenced by the loops only through its id and step URL.

use serde::{Deserialize, Serialize};

/// One agent run on the remote service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque session identifier.
    pub id: String,
    /// Routing URL for the per-session step endpoint.
    pub step_url: String,
    /// Goal / task text the session was created with.
    pub goal: String,
}

/// Request body for session creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    /// Goal / task text for the agent.
    pub goal: String,
    /// Optional free-form metadata forwarded to the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Lifecycle state of a remote session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Created but not yet running.
    Pending,
    /// Actively stepping.
    Running,
    /// Finished successfully.
    Completed,
    /// Terminated with an error.
    Failed,
}

/// Status snapshot returned by the status endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Current lifecycle state.
    pub state: SessionState,
    /// Server-side step counter.
    #[serde(default)]
    pub step: u32,
    /// Failure detail when `state` is `failed`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_roundtrip() {
        let session = Session {
            id: "sess-1".into(),
            step_url: "https://api.example.com/sessions/sess-1/step".into(),
            goal: "book a flight".into(),
        };
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(session, back);
    }

    #[test]
    fn status_parses_snake_case_state() {
        let status: SessionStatus =
            serde_json::from_str(r#"{"state":"running","step":7}"#).unwrap();
        assert_eq!(status.state, SessionState::Running);
        assert_eq!(status.step, 7);
        assert!(status.error.is_none());
    }

    #[test]
    fn create_request_omits_unset_metadata() {
        let request = CreateSessionRequest {
            goal: "test".into(),
            metadata: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"goal":"test"}"#);
    }
}
