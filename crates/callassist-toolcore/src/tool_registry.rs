use std::collections::HashMap;
use std::sync::Arc;

use callassist_llm_api::ToolDefinition;

use crate::tool::{Tool, ToolParameters, ToolResult};
use crate::tool_context::ToolContext;

/// Registry for managing and discovering tools
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.get_tool_names())
            .finish()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool, replacing any tool with the same name
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_arc(Arc::new(tool));
    }

    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Get tool names, sorted
    pub fn get_tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Execute a tool by name with JSON-encoded arguments
    pub async fn execute_tool(&self, name: &str, arguments: &str, context: &ToolContext) -> ToolResult {
        let Some(tool) = self.get_tool(name) else {
            return ToolResult::error(format!("Tool '{}' not found", name));
        };

        match ToolParameters::from_json(arguments) {
            Ok(params) => tool.execute(params, context).await,
            Err(e) => ToolResult::error(format!("Invalid arguments for '{}': {}", name, e)),
        }
    }

    /// All tool definitions, sorted by name so requests stay stable
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut tools: Vec<_> = self.tools.iter().collect();
        tools.sort_by_key(|(name, _)| name.as_str());
        tools.into_iter().map(|(_, tool)| tool.to_definition()).collect()
    }
}
