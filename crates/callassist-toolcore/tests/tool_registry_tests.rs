use std::collections::HashMap;

use callassist_toolcore::{param, ParameterDefinition, Tool, ToolContext, ToolParameters, ToolRegistry, ToolResult};
use pretty_assertions::assert_eq;

// Mock tool implementations for testing
#[derive(Debug, Clone)]
struct TestTool {
    name: String,
    description: String,
    parameters: HashMap<String, ParameterDefinition>,
    should_fail: bool,
}

impl TestTool {
    fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: HashMap::new(),
            should_fail: false,
        }
    }

    fn with_parameters(mut self, parameters: HashMap<String, ParameterDefinition>) -> Self {
        self.parameters = parameters;
        self
    }

    fn failing(mut self) -> Self {
        self.should_fail = true;
        self
    }
}

#[async_trait::async_trait]
impl Tool for TestTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        self.parameters.clone()
    }

    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult {
        if self.should_fail {
            ToolResult::error("Test tool failed intentionally".to_string())
        } else {
            ToolResult::success(format!(
                "Executed {} with {} parameters for {}",
                self.name,
                params.data.len(),
                context.session_id
            ))
        }
    }
}

fn create_test_context() -> ToolContext {
    ToolContext::new("test_session")
}

#[tokio::test]
async fn test_registry_initialization() {
    let registry = ToolRegistry::new();
    assert_eq!(registry.get_tool_names().len(), 0);
    assert!(registry.get_tool("any_tool").is_none());
    assert!(registry.tool_definitions().is_empty());
}

#[tokio::test]
async fn test_single_tool_registration() {
    let mut registry = ToolRegistry::new();
    registry.register(TestTool::new("test_tool", "A test tool for testing"));

    assert_eq!(registry.get_tool_names(), vec!["test_tool"]);
    assert_eq!(registry.get_tool("test_tool").unwrap().name(), "test_tool");
}

#[tokio::test]
async fn test_registering_same_name_replaces_tool() {
    let mut registry = ToolRegistry::new();
    registry.register(TestTool::new("tool", "first"));
    registry.register(TestTool::new("tool", "second"));

    assert_eq!(registry.get_tool_names().len(), 1);
    assert_eq!(registry.get_tool("tool").unwrap().description(), "second");
}

#[tokio::test]
async fn test_execute_tool_passes_arguments_and_context() {
    let mut registry = ToolRegistry::new();
    registry.register(TestTool::new("tool", "d"));

    let result = registry
        .execute_tool("tool", r#"{"a": 1, "b": "two"}"#, &create_test_context())
        .await;

    assert!(result.success);
    assert_eq!(result.content, "Executed tool with 2 parameters for test_session");
}

#[tokio::test]
async fn test_execute_unknown_tool() {
    let registry = ToolRegistry::new();
    let result = registry.execute_tool("missing", "{}", &create_test_context()).await;

    assert!(!result.success);
    assert_eq!(result.error.as_deref(), Some("Tool 'missing' not found"));
}

#[tokio::test]
async fn test_execute_with_malformed_arguments() {
    let mut registry = ToolRegistry::new();
    registry.register(TestTool::new("tool", "d"));

    let result = registry.execute_tool("tool", "{not json", &create_test_context()).await;
    assert!(!result.success);
    assert!(result.error.unwrap().starts_with("Invalid arguments for 'tool'"));
}

#[tokio::test]
async fn test_failing_tool_reports_error() {
    let mut registry = ToolRegistry::new();
    registry.register(TestTool::new("bad", "d").failing());

    let result = registry.execute_tool("bad", "{}", &create_test_context()).await;
    assert_eq!(result.observation(), "Error: Test tool failed intentionally");
}

#[tokio::test]
async fn test_tool_definitions_are_sorted_with_schema() {
    let mut registry = ToolRegistry::new();
    let params: HashMap<String, ParameterDefinition> = [
        param!("query", "string", "What to run", required),
        param!("limit", "integer", "Row cap", required),
    ]
    .into_iter()
    .collect();

    registry.register(TestTool::new("zeta", "last"));
    registry.register(TestTool::new("alpha", "first").with_parameters(params));

    let definitions = registry.tool_definitions();
    let names: Vec<&str> = definitions.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["alpha", "zeta"]);

    let schema = &definitions[0].parameters;
    assert_eq!(schema["type"], "object");
    assert_eq!(schema["required"], serde_json::json!(["limit", "query"]));
    assert_eq!(schema["properties"]["limit"]["type"], "integer");
    assert_eq!(schema["properties"]["query"]["type"], "string");
}
