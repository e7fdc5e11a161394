/// Tool execution context
///
/// Carries the browser session a tool call belongs to, for log correlation.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    pub session_id: String,
}

impl ToolContext {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}
