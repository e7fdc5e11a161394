use anyhow::Result;
use async_trait::async_trait;
use callassist_llm_api::ToolDefinition;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::tool_context::ToolContext;

/// Tool parameters
#[derive(Debug, Clone, Default)]
pub struct ToolParameters {
    pub data: HashMap<String, Value>,
}

impl ToolParameters {
    pub fn from_json(json_str: &str) -> Result<Self> {
        // Some models send an empty string for a call without arguments
        if json_str.trim().is_empty() {
            return Ok(Self::default());
        }
        let data: HashMap<String, Value> = serde_json::from_str(json_str)?;
        Ok(Self { data })
    }

    pub fn get_required<T>(&self, key: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self
            .data
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("Required parameter '{}' missing", key))?;

        serde_json::from_value(value.clone())
            .map_err(|e| anyhow::anyhow!("Failed to parse parameter '{}': {}", key, e))
    }
}

/// Tool execution result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub content: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(content: String) -> Self {
        Self {
            success: true,
            content,
            error: None,
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            content: String::new(),
            error: Some(error),
        }
    }

    /// Text handed back to the model as the tool message
    pub fn observation(&self) -> String {
        match &self.error {
            Some(error) => format!("Error: {}", error),
            None => self.content.clone(),
        }
    }
}

/// Tool parameter definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDefinition {
    pub param_type: String,
    pub description: String,
    pub required: bool,
}

/// Tool trait that all tools must implement
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name of the tool (must be unique)
    fn name(&self) -> &str;

    /// Description shown to the model
    fn description(&self) -> &str;

    /// Parameter definitions
    fn parameters(&self) -> HashMap<String, ParameterDefinition>;

    /// Execute the tool
    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult;

    /// Function-calling definition with a JSON schema built from `parameters`
    fn to_definition(&self) -> ToolDefinition {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        // Sorted so the schema is stable between calls
        let params: BTreeMap<String, ParameterDefinition> = self.parameters().into_iter().collect();
        for (name, param_def) in params {
            properties.insert(
                name.clone(),
                serde_json::json!({
                    "type": param_def.param_type,
                    "description": param_def.description,
                }),
            );

            if param_def.required {
                required.push(name);
            }
        }

        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required
            }),
        }
    }
}

/// Helper macro for creating parameter definitions
#[macro_export]
macro_rules! param {
    ($name:expr, $type:expr, $desc:expr, required) => {
        (
            $name.to_string(),
            $crate::ParameterDefinition {
                param_type: $type.to_string(),
                description: $desc.to_string(),
                required: true,
            },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameters_from_empty_string() {
        let params = ToolParameters::from_json("  ").unwrap();
        assert!(params.data.is_empty());
    }

    #[test]
    fn test_get_required_missing() {
        let params = ToolParameters::from_json("{}").unwrap();
        let err = params.get_required::<String>("sql_query").unwrap_err();
        assert!(err.to_string().contains("sql_query"));
    }

    #[test]
    fn test_observation() {
        assert_eq!(ToolResult::success("[]".to_string()).observation(), "[]");
        assert_eq!(ToolResult::error("boom".to_string()).observation(), "Error: boom");
    }

    #[test]
    fn test_param_macro() {
        let (name, def) = param!("sql_query", "string", "Query to run", required);
        assert_eq!(name, "sql_query");
        assert!(def.required);
        assert_eq!(def.param_type, "string");
    }
}
