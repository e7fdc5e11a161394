use std::sync::Arc;

use anyhow::{Context, Result};
use callassist_llm_api::{ChatMessage, LlmClient};
use callassist_toolcore::{ToolContext, ToolRegistry};
use callassist_types::{ConversationTurn, RouterOutput, RouterResponse, DEFAULT_MAX_ITERS};
use serde::Serialize;
use serde_json::Value;

/// System prompt describing the router's job and its output contract
pub const ROUTER_INSTRUCTIONS: &str = "\
You handle an ongoing, live call transcript and decide which tools to call to find \
information that helps the call agent handle the conversation with the customer.

- Prioritize the call_agent_ask to find information useful to the call agent and to \
decide which tables to use in the SQL query.
- Check conversation_history to see which tables were already queried and reuse those \
results. Do not re-query.
- Answer directly without calling any tool if no tools are required given the information.
- Prepare relevant_information to help the call agent solve issues, reach upsell goals \
and prioritize calls.

When you are done, reply with only a JSON object with two string fields:
{\"queried_table\": \"<table(s) you queried, or empty>\", \"relevant_information\": \"<report>\"}

relevant_information is formatted like a report in Markdown and is also your response. \
Use actual newlines, not \\n characters. If necessary, add a recommended response for the \
call agent to say.";

const FINAL_ANSWER_PROMPT: &str = "\
The tool budget for this request is used up. Using the information gathered so far, \
reply now with the JSON object containing queried_table and relevant_information.";

/// What the router is asked to work on
#[derive(Debug, Clone, Serialize)]
pub struct RouterInput {
    pub transcript: String,
    pub call_agent_ask: Option<String>,
    pub conversation_history: Vec<ConversationTurn>,
}

impl RouterInput {
    /// An empty or blank ask is treated as no ask
    pub fn new(
        transcript: impl Into<String>,
        call_agent_ask: Option<String>,
        conversation_history: Vec<ConversationTurn>,
    ) -> Self {
        Self {
            transcript: transcript.into(),
            call_agent_ask: call_agent_ask.filter(|ask| !ask.trim().is_empty()),
            conversation_history,
        }
    }
}

/// Bounded tool-calling loop over a chat model
pub struct TranscriptRouter {
    llm: Arc<dyn LlmClient>,
    registry: ToolRegistry,
    max_iters: usize,
}

impl TranscriptRouter {
    pub fn new(llm: Arc<dyn LlmClient>, registry: ToolRegistry) -> Self {
        Self {
            llm,
            registry,
            max_iters: DEFAULT_MAX_ITERS,
        }
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn max_iters(&self) -> usize {
        self.max_iters
    }

    /// Run the loop and return the default-filled answer
    pub async fn route(&self, input: &RouterInput, context: &ToolContext) -> Result<RouterResponse> {
        let inputs = serde_json::to_string_pretty(input).context("Failed to encode router inputs")?;
        let mut messages = vec![ChatMessage::system(ROUTER_INSTRUCTIONS), ChatMessage::user(inputs)];
        let tools = self.registry.tool_definitions();

        for iteration in 1..=self.max_iters {
            let response = self
                .llm
                .chat(messages.clone(), tools.clone())
                .await
                .with_context(|| format!("Chat request to {} failed", self.llm.model()))?;
            let message = response.message;

            let Some(tool_calls) = message.tool_calls.clone().filter(|calls| !calls.is_empty()) else {
                tracing::info!(session = %context.session_id, iteration, "Router finished");
                return Ok(parse_router_output(&message.content).into_response());
            };

            messages.push(message);
            for tool_call in tool_calls {
                tracing::info!(
                    session = %context.session_id,
                    tool = %tool_call.function.name,
                    iteration,
                    max_iters = self.max_iters,
                    "Calling tool"
                );

                let result = self
                    .registry
                    .execute_tool(&tool_call.function.name, &tool_call.function.arguments, context)
                    .await;
                if !result.success {
                    tracing::warn!(
                        session = %context.session_id,
                        tool = %tool_call.function.name,
                        error = result.error.as_deref().unwrap_or(""),
                        "Tool call failed"
                    );
                }

                messages.push(ChatMessage::tool(
                    tool_call.id,
                    tool_call.function.name,
                    result.observation(),
                ));
            }
        }

        tracing::info!(
            session = %context.session_id,
            max_iters = self.max_iters,
            "Tool budget exhausted, asking for final answer"
        );
        messages.push(ChatMessage::user(FINAL_ANSWER_PROMPT));
        let response = self
            .llm
            .chat(messages, Vec::new())
            .await
            .with_context(|| format!("Final chat request to {} failed", self.llm.model()))?;

        Ok(parse_router_output(&response.message.content).into_response())
    }
}

/// Read the model's final answer.
///
/// Accepts a bare JSON object, one wrapped in a markdown code fence, or one
/// embedded in surrounding prose. Anything else is taken as the report itself.
pub fn parse_router_output(content: &str) -> RouterOutput {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return RouterOutput::default();
    }

    let candidates = [Some(trimmed), strip_code_fence(trimmed), embedded_object(trimmed)];
    for candidate in candidates.into_iter().flatten() {
        if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(candidate) {
            return RouterOutput {
                queried_table: fields.get("queried_table").and_then(field_text),
                relevant_information: fields.get("relevant_information").and_then(field_text),
            };
        }
    }

    RouterOutput {
        queried_table: None,
        relevant_information: Some(trimmed.to_string()),
    }
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let body = text.strip_prefix("```")?;
    let body = body.strip_suffix("```")?;
    // Drop the info string (e.g. "json") on the opening line
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    Some(body.trim())
}

fn embedded_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

fn field_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string).unwrap_or_else(|| item.to_string()))
                .collect::<Vec<_>>()
                .join(", "),
        ),
        other => Some(other.to_string()),
    }
}
