use std::sync::Arc;

use callassist_logging::RequestLogger;

use crate::client::{LlmClient, LlmError, ServingChatClient};
use crate::config::{validate_model_name, ServingConfig};

/// Client factory for creating LLM clients, one per selected model
#[derive(Clone)]
pub struct ClientFactory {
    config: ServingConfig,
    http: reqwest::Client,
    request_logger: Option<RequestLogger>,
}

impl ClientFactory {
    /// Create a factory sharing one HTTP connection pool across clients
    pub fn new(config: ServingConfig, request_logger: Option<RequestLogger>) -> anyhow::Result<Self> {
        let http = config.http_client()?;
        Ok(Self {
            config,
            http,
            request_logger,
        })
    }

    pub fn config(&self) -> &ServingConfig {
        &self.config
    }

    /// Create a chat client for `model`
    ///
    /// # Errors
    /// `LlmError::InvalidModel` when the name is not a valid endpoint name and
    /// `LlmError::NotConfigured` when no workspace host is set.
    pub fn create(&self, model: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
        validate_model_name(model)?;

        if !self.config.is_configured() {
            return Err(LlmError::NotConfigured("no workspace host set".to_string()));
        }

        Ok(Arc::new(ServingChatClient::new(
            self.config.chat_completions_url(),
            self.config.token.clone(),
            model.to_string(),
            self.http.clone(),
            self.request_logger.clone(),
        )))
    }
}
