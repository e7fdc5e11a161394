use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_TOKEN: &str = "dapi-test-token";

/// Mock server utilities for testing the serving chat client
pub struct ServingMockServer {
    server: MockServer,
}

impl ServingMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Mock a plain assistant answer
    pub async fn mock_completion(&self, content: &str) {
        self.mount(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": content
        }))))
        .await;
    }

    /// Mock an assistant turn that calls one tool
    pub async fn mock_tool_call(&self, tool_name: &str, arguments: Value) {
        self.mount(ResponseTemplate::new(200).set_body_json(completion_body(json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_1",
                "type": "function",
                "function": {"name": tool_name, "arguments": arguments.to_string()}
            }]
        }))))
        .await;
    }

    /// Mock an endpoint error
    pub async fn mock_error(&self, status: u16, message: &str) {
        self.mount(ResponseTemplate::new(status).set_body_json(json!({
            "error_code": "BAD_REQUEST",
            "message": message
        })))
        .await;
    }

    async fn mount(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path("/serving-endpoints/chat/completions"))
            .and(header("authorization", format!("Bearer {}", TEST_TOKEN).as_str()))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }
}

pub fn completion_body(message: Value) -> Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "databricks-claude-3-7-sonnet",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 12, "completion_tokens": 34, "total_tokens": 46}
    })
}
