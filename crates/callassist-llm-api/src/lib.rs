//! # callassist-llm-api
//!
//! Client for chat models hosted behind a model-serving workspace that
//! exposes the OpenAI-compatible `chat/completions` API.
//!
//! ## Features
//!
//! - **Unified Interface**: the router only sees the `LlmClient` trait
//! - **Per-request models**: `ClientFactory` builds a client for whichever
//!   serving endpoint the caller picked, validating the name first
//! - **Request logging**: optional per-call request/response log files
//!
//! ## Example
//!
//! ```rust,no_run
//! use callassist_llm_api::{ClientFactory, ServingConfig};
//! use callassist_llm_api::client::ChatMessage;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServingConfig::new("https://example.cloud.databricks.com", "dapi-token");
//!     let factory = ClientFactory::new(config, None)?;
//!     let client = factory.create("databricks-claude-3-7-sonnet")?;
//!
//!     let response = client.chat(vec![ChatMessage::user("Hello!")], vec![]).await?;
//!     println!("Response: {}", response.message.content);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;

// Re-export commonly used types
pub use client::{
    ChatMessage, FunctionCall, LlmClient, LlmError, LlmResponse, ServingChatClient, TokenUsage,
    ToolCall, ToolDefinition,
};

pub use config::{normalize_host, validate_model_name, ClientFactory, ServingConfig};
