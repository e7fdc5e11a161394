use serde::{Deserialize, Serialize};

use super::{ChatMessage, ToolDefinition};

/// Tool definition for chat API
#[derive(Debug, Serialize)]
pub(crate) struct Tool {
    #[serde(rename = "type")]
    pub tool_type: &'static str,
    pub function: FunctionDef,
}

/// Function definition within a tool
#[derive(Debug, Serialize)]
pub(crate) struct FunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl From<ToolDefinition> for Tool {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            tool_type: "function",
            function: FunctionDef {
                name: tool.name,
                description: tool.description,
                parameters: tool.parameters,
            },
        }
    }
}

/// Chat API request structure
#[derive(Debug, Serialize)]
pub(crate) struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Tool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<&'static str>,
    pub max_tokens: u32,
}

/// Token usage information from API response
#[derive(Debug, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Chat API response structure
#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    pub choices: Vec<Choice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Choice structure within chat response
#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    pub message: ChatMessage,
}
