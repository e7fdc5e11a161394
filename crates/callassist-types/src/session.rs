use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::demo::DemoState;
use crate::{ConversationTurn, DEFAULT_LLM_MODEL, DEFAULT_TRANSCRIPT_INPUT};

/// Browser session token (32 lowercase hex characters)
pub type SessionId = String;

/// Generate a fresh random session token
pub fn new_session_id() -> SessionId {
    Uuid::new_v4().simple().to_string()
}

/// Per-browser state. Any field missing from a stored record is filled with
/// its default when the record is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Rendered HTML of the most recent report
    pub ai_response: String,
    pub conversation_history: Vec<ConversationTurn>,
    pub transcript_input: String,
    pub mlflow_experiment_id: String,
    pub llm_model: String,
    pub processing: bool,
    pub demo_state: DemoState,
    pub last_activity: DateTime<Utc>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            ai_response: String::new(),
            conversation_history: Vec::new(),
            transcript_input: DEFAULT_TRANSCRIPT_INPUT.to_string(),
            mlflow_experiment_id: String::new(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            processing: false,
            demo_state: DemoState::default(),
            last_activity: Utc::now(),
        }
    }
}

impl SessionState {
    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }

    /// Append a processed turn (most recent last) and make it the current response
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.ai_response = turn.response.clone();
        self.conversation_history.push(turn);
    }

    pub fn clear_history(&mut self) {
        self.conversation_history.clear();
    }

    /// True when every field other than the activity timestamp holds its default
    pub fn is_default(&self) -> bool {
        let mut defaults = Self::default();
        defaults.last_activity = self.last_activity;
        *self == defaults
    }
}
