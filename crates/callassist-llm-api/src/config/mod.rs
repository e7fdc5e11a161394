use std::time::Duration;

use crate::client::LlmError;

pub mod factory;
pub use factory::ClientFactory;

/// Default timeout applied to every serving call
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Connection settings for the model-serving workspace
#[derive(Debug, Clone)]
pub struct ServingConfig {
    /// Workspace base URL, e.g. `https://example.cloud.databricks.com`
    pub host: String,
    pub token: String,
    pub request_timeout: Duration,
}

impl ServingConfig {
    pub fn new(host: impl AsRef<str>, token: impl Into<String>) -> Self {
        Self {
            host: normalize_host(host.as_ref()),
            token: token.into(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        !self.host.is_empty()
    }

    /// OpenAI-compatible chat completions URL shared by all chat endpoints
    pub fn chat_completions_url(&self) -> String {
        format!("{}/serving-endpoints/chat/completions", self.host)
    }

    /// Invocation URL of a single serving endpoint
    pub fn invocations_url(&self, endpoint: &str) -> String {
        format!("{}/serving-endpoints/{}/invocations", self.host, endpoint)
    }

    /// Build an HTTP client carrying the configured timeout
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder().timeout(self.request_timeout).build()
    }
}

/// Normalize a workspace host: trim whitespace and trailing slashes, and
/// default to https when no scheme is given. Empty input stays empty.
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.is_empty() {
        return String::new();
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

/// Serving endpoint names are non-empty and made of ASCII alphanumerics,
/// `-`, `_` and `.`
pub fn validate_model_name(name: &str) -> Result<(), LlmError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));

    if valid {
        Ok(())
    } else {
        Err(LlmError::InvalidModel(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host_adds_scheme() {
        assert_eq!(
            normalize_host("e2-demo-west.cloud.databricks.com/"),
            "https://e2-demo-west.cloud.databricks.com"
        );
    }

    #[test]
    fn test_normalize_host_keeps_http() {
        assert_eq!(normalize_host("http://127.0.0.1:8080//"), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_normalize_host_empty() {
        assert_eq!(normalize_host("  "), "");
        assert!(!ServingConfig::new("", "").is_configured());
    }

    #[test]
    fn test_urls() {
        let config = ServingConfig::new("https://host.example", "t");
        assert_eq!(
            config.chat_completions_url(),
            "https://host.example/serving-endpoints/chat/completions"
        );
        assert_eq!(
            config.invocations_url("gemma3n"),
            "https://host.example/serving-endpoints/gemma3n/invocations"
        );
    }

    #[test]
    fn test_validate_model_name() {
        assert!(validate_model_name("databricks-claude-3-7-sonnet").is_ok());
        assert!(validate_model_name("databricks-meta-llama-3.3-70b-instruct").is_ok());
        assert!(validate_model_name("my_endpoint").is_ok());
        assert!(validate_model_name("").is_err());
        assert!(validate_model_name("../admin").is_err());
        assert!(validate_model_name("model name").is_err());
    }
}
