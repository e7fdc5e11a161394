use anyhow::{Context, Result};
use async_trait::async_trait;
use callassist_logging::RequestLogger;

use super::wire::{ChatRequest, ChatResponse};
use super::{ChatMessage, LlmClient, LlmError, LlmResponse, TokenUsage, ToolDefinition};

const MAX_TOKENS: u32 = 4096;

/// Chat client for a model-serving endpoint speaking the OpenAI-compatible API
pub struct ServingChatClient {
    completions_url: String,
    token: String,
    model: String,
    client: reqwest::Client,
    request_logger: Option<RequestLogger>,
}

impl ServingChatClient {
    pub fn new(
        completions_url: String,
        token: String,
        model: String,
        client: reqwest::Client,
        request_logger: Option<RequestLogger>,
    ) -> Self {
        Self {
            completions_url,
            token,
            model,
            client,
            request_logger,
        }
    }

    fn build_chat_request(&self, messages: Vec<ChatMessage>, tools: Vec<ToolDefinition>) -> ChatRequest {
        let tool_choice = if tools.is_empty() { None } else { Some("auto") };

        ChatRequest {
            model: self.model.clone(),
            messages,
            tools: tools.into_iter().map(Into::into).collect(),
            tool_choice,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[async_trait]
impl LlmClient for ServingChatClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, messages: Vec<ChatMessage>, tools: Vec<ToolDefinition>) -> Result<LlmResponse> {
        let request = self.build_chat_request(messages, tools);

        // Log request to file for persistent debugging
        let request_timestamp = match &self.request_logger {
            Some(logger) => {
                let body = serde_json::to_value(&request)?;
                match logger.log_request(&self.completions_url, &body, &self.model, &self.token) {
                    Ok(ts) => Some(ts),
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to write request log");
                        None
                    }
                }
            }
            None => None,
        };

        let response = self
            .client
            .post(&self.completions_url)
            .bearer_auth(&self.token)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to reach serving endpoint for model {}", self.model))?;

        let status = response.status();
        let response_text = response.text().await?;

        if let (Some(logger), Some(ts)) = (&self.request_logger, request_timestamp) {
            if let Err(e) = logger.log_response(status, &response_text, ts, &self.model) {
                tracing::warn!(error = %e, "Failed to write response log");
            }
        }

        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: response_text,
            }
            .into());
        }

        let chat_response: ChatResponse = serde_json::from_str(&response_text)
            .context("Failed to decode chat completion response")?;

        let message = chat_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or(LlmError::EmptyResponse)?;

        Ok(LlmResponse {
            message,
            usage: chat_response.usage.map(|usage| TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ServingChatClient {
        ServingChatClient::new(
            "http://localhost/serving-endpoints/chat/completions".to_string(),
            "token".to_string(),
            "databricks-claude-3-7-sonnet".to_string(),
            reqwest::Client::new(),
            None,
        )
    }

    #[test]
    fn test_request_without_tools_omits_tool_choice() {
        let request = client().build_chat_request(vec![ChatMessage::user("hi")], vec![]);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert_eq!(json["model"], "databricks-claude-3-7-sonnet");
    }

    #[test]
    fn test_request_with_tools() {
        let tool = ToolDefinition {
            name: "sql_lookup".to_string(),
            description: "Query tables".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        };
        let request = client().build_chat_request(vec![ChatMessage::user("hi")], vec![tool]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["tool_choice"], "auto");
        assert_eq!(json["tools"][0]["type"], "function");
        assert_eq!(json["tools"][0]["function"]["name"], "sql_lookup");
    }
}
