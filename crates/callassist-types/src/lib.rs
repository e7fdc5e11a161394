//! Core types and structures for callassist
//!
//! This crate provides the session record, conversation turns, demo
//! progression and the router's result types shared by every other crate.

use serde::{Deserialize, Deserializer, Serialize};

pub mod demo;
pub mod session;

pub use demo::{DemoState, DemoTurn};
pub use session::{new_session_id, SessionId, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Placeholder shown in the transcript box of a fresh session
pub const DEFAULT_TRANSCRIPT_INPUT: &str = "Put a transcript you would like to analyze here";

/// Serving endpoint used when the form does not name a model
pub const DEFAULT_LLM_MODEL: &str = "databricks-claude-3-7-sonnet";

/// Report substituted when the agent produced none
pub const NO_INFORMATION_FOUND: &str = "No relevant information was found.";

/// Maximum number of tool-calling rounds the router may take per request
pub const DEFAULT_MAX_ITERS: usize = 3;

// ============================================================================
// Conversation Types
// ============================================================================

/// Helper function to deserialize string or null values
pub fn deserialize_string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// One processed transcript and the rendered answer it produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub transcript: String,
    /// Rendered HTML of the agent's report
    pub response: String,
    #[serde(deserialize_with = "deserialize_string_or_null", default)]
    pub queried_table: String,
}

impl ConversationTurn {
    pub fn new(transcript: impl Into<String>, response: impl Into<String>, queried_table: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            response: response.into(),
            queried_table: queried_table.into(),
        }
    }
}

// ============================================================================
// Router Types
// ============================================================================

/// Raw output fields as the agent produced them. Either may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterOutput {
    #[serde(default)]
    pub queried_table: Option<String>,
    #[serde(default)]
    pub relevant_information: Option<String>,
}

impl RouterOutput {
    /// Fill missing fields with their documented defaults
    pub fn into_response(self) -> RouterResponse {
        let relevant_information = match self.relevant_information {
            Some(report) if !report.trim().is_empty() => report,
            _ => NO_INFORMATION_FOUND.to_string(),
        };

        RouterResponse {
            queried_table: self.queried_table.unwrap_or_default(),
            relevant_information,
        }
    }
}

/// Router result after default-filling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterResponse {
    pub queried_table: String,
    /// Markdown report
    pub relevant_information: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_output_defaults() {
        let response = RouterOutput::default().into_response();
        assert_eq!(response.queried_table, "");
        assert_eq!(response.relevant_information, NO_INFORMATION_FOUND);
    }

    #[test]
    fn test_router_output_blank_report_is_replaced() {
        let output = RouterOutput {
            queried_table: Some("customer_profiles".to_string()),
            relevant_information: Some("   \n".to_string()),
        };
        let response = output.into_response();
        assert_eq!(response.queried_table, "customer_profiles");
        assert_eq!(response.relevant_information, NO_INFORMATION_FOUND);
    }

    #[test]
    fn test_router_output_keeps_fields() {
        let output: RouterOutput = serde_json::from_str(
            r##"{"queried_table": "transcripts", "relevant_information": "# Report"}"##,
        )
        .unwrap();
        let response = output.into_response();
        assert_eq!(response.queried_table, "transcripts");
        assert_eq!(response.relevant_information, "# Report");
    }

    #[test]
    fn test_turn_null_table_reads_as_empty() {
        let turn: ConversationTurn =
            serde_json::from_str(r#"{"transcript": "hi", "response": "<p>x</p>", "queried_table": null}"#)
                .unwrap();
        assert_eq!(turn.queried_table, "");
    }
}
