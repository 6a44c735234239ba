//! Turn request/response types for the HTTP step endpoint.
//!
//! A "turn" is one perception → decision → action cycle. The loop POSTs a
//! [`StepRequest`] (screenshot plus one-shot message/answer fields) and gets
//! back a [`StepDecision`], whose [`Disposition`] drives the next state
//! transition in a fixed priority order.

use serde::{Deserialize, Serialize};

use crate::actions::Action;

/// Request body for one turn against the remote step endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StepRequest {
    /// Base64-encoded screenshot in the surface's pixel space.
    pub screenshot: String,
    /// Session the turn belongs to.
    pub session_id: String,
    /// One-shot caller message, cleared after being sent once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// One-shot answer to a previous ask-user question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_response: Option<String>,
}

/// The agent's decision for one turn.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepDecision {
    /// Ordered actions to execute (possibly empty).
    #[serde(default)]
    pub actions: Vec<Action>,
    /// Free-text reasoning trace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
    /// Whether the agent considers the task complete.
    #[serde(default)]
    pub finished: bool,
    /// Question the agent wants the user to answer before proceeding.
    #[serde(default, rename = "askUser", skip_serializing_if = "Option::is_none")]
    pub ask_user: Option<String>,
    /// Server-side step counter.
    #[serde(default)]
    pub step: u32,
}

/// What a decision means for the loop's next transition.
///
/// At most one of {finished, ask-user, actions} drives the transition;
/// the priority order is fixed: finished first, then ask-user, then actions.
#[derive(Debug, PartialEq)]
pub enum Disposition<'a> {
    /// The run is complete; return the decision to the caller.
    Finished,
    /// Suspend the turn and obtain an answer from the caller.
    AskUser(&'a str),
    /// Execute the ordered action list.
    Actions(&'a [Action]),
    /// Nothing to do this turn; advance to the next one.
    Idle,
}

impl StepDecision {
    /// Classify this decision by the fixed priority order.
    ///
    /// `finished` wins over a populated `ask_user`, which wins over a
    /// non-empty action list. An empty decision is [`Disposition::Idle`].
    #[must_use]
    pub fn disposition(&self) -> Disposition<'_> {
        if self.finished {
            return Disposition::Finished;
        }
        if let Some(question) = self.ask_user.as_deref() {
            return Disposition::AskUser(question);
        }
        if self.actions.is_empty() {
            Disposition::Idle
        } else {
            Disposition::Actions(&self.actions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finished_wins_over_ask_user() {
        let decision = StepDecision {
            finished: true,
            ask_user: Some("Which account?".into()),
            ..Default::default()
        };
        assert_eq!(decision.disposition(), Disposition::Finished);
    }

    #[test]
    fn ask_user_wins_over_actions() {
        let decision = StepDecision {
            ask_user: Some("Which account?".into()),
            actions: vec![Action::Finished],
            ..Default::default()
        };
        assert_eq!(
            decision.disposition(),
            Disposition::AskUser("Which account?")
        );
    }

    #[test]
    fn actions_when_present() {
        let decision = StepDecision {
            actions: vec![Action::Click {
                x: 1,
                y: 2,
                button: None,
            }],
            ..Default::default()
        };
        assert!(matches!(decision.disposition(), Disposition::Actions(a) if a.len() == 1));
    }

    #[test]
    fn empty_decision_is_idle() {
        assert_eq!(StepDecision::default().disposition(), Disposition::Idle);
    }

    #[test]
    fn decision_parses_wire_form() {
        let decision: StepDecision = serde_json::from_str(
            r#"{"actions":[{"type":"click","x":10,"y":20}],"thinking":"looking","finished":false,"askUser":null,"step":3}"#,
        )
        .unwrap();
        assert_eq!(decision.step, 3);
        assert_eq!(decision.thinking.as_deref(), Some("looking"));
        assert!(decision.ask_user.is_none());
        assert_eq!(decision.actions.len(), 1);
    }

    #[test]
    fn decision_tolerates_missing_fields() {
        let decision: StepDecision = serde_json::from_str(r#"{"finished":true}"#).unwrap();
        assert!(decision.finished);
        assert!(decision.actions.is_empty());
        assert_eq!(decision.step, 0);
    }

    #[test]
    fn request_omits_one_shot_fields_when_unset() {
        let request = StepRequest {
            screenshot: "aGVsbG8=".into(),
            session_id: "sess-1".into(),
            message: None,
            user_response: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("message"));
        assert!(!json.contains("user_response"));
    }

    #[test]
    fn request_carries_user_response() {
        let request = StepRequest {
            screenshot: "aGVsbG8=".into(),
            session_id: "sess-1".into(),
            message: None,
            user_response: Some("personal".into()),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""user_response":"personal""#));
    }
}
