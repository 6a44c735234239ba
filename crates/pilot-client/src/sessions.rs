//! Typed session and step calls.
//!
//! The session endpoints are a consumed contract: the service owns their
//! semantics, this module owns the request/response types and routing. The
//! step call POSTs to the per-session step URL the service handed back at
//! creation time.

use reqwest::Method;
use tracing::{debug, instrument};

use pilot_core::{
    CreateSessionRequest, PilotError, Session, SessionStatus, StepDecision, StepRequest,
};

use crate::http::ApiClient;

impl ApiClient {
    /// Create a new agent session.
    #[instrument(skip(self, request), fields(goal_len = request.goal.len()))]
    pub async fn create_session(
        &self,
        request: &CreateSessionRequest,
    ) -> Result<Session, PilotError> {
        let body = serde_json::to_value(request).map_err(|e| PilotError::Protocol {
            message: format!("encode failed: {e}"),
            line: None,
        })?;
        let session: Session = self
            .request_json(Method::POST, &self.url("/sessions"), Some(body))
            .await?;
        debug!(session_id = %session.id, "session created");
        Ok(session)
    }

    /// Fetch an existing session by id.
    pub async fn get_session(&self, session_id: &str) -> Result<Session, PilotError> {
        self.request_json(
            Method::GET,
            &self.url(&format!("/sessions/{session_id}")),
            None,
        )
        .await
    }

    /// Delete a session, releasing its remote resources.
    pub async fn delete_session(&self, session_id: &str) -> Result<(), PilotError> {
        self.request_empty(
            Method::DELETE,
            &self.url(&format!("/sessions/{session_id}")),
            None,
        )
        .await
    }

    /// Send a free-text message into a running session.
    pub async fn send_message(&self, session_id: &str, message: &str) -> Result<(), PilotError> {
        self.request_empty(
            Method::POST,
            &self.url(&format!("/sessions/{session_id}/messages")),
            Some(serde_json::json!({ "message": message })),
        )
        .await
    }

    /// Fetch the current status snapshot of a session.
    pub async fn get_status(&self, session_id: &str) -> Result<SessionStatus, PilotError> {
        self.request_json(
            Method::GET,
            &self.url(&format!("/sessions/{session_id}/status")),
            None,
        )
        .await
    }

    /// Submit one turn to the session's step endpoint.
    ///
    /// The request carries the fresh screenshot plus any one-shot
    /// message/answer fields; the response is the agent's decision for
    /// the turn.
    #[instrument(skip(self, request), fields(session_id = %session.id))]
    pub async fn step(
        &self,
        session: &Session,
        request: &StepRequest,
    ) -> Result<StepDecision, PilotError> {
        let body = serde_json::to_value(request).map_err(|e| PilotError::Protocol {
            message: format!("encode failed: {e}"),
            line: None,
        })?;
        self.request_json(Method::POST, &session.step_url, Some(body))
            .await
    }
}
