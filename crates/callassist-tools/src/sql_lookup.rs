use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use callassist_toolcore::{param, ParameterDefinition, Tool, ToolContext, ToolParameters, ToolResult};

use crate::sql_backend::{LookupOutcome, SqlBackend};

pub const SQL_LOOKUP_TOOL_NAME: &str = "sql_lookup";

/// Catalog and schema holding the two demo tables
pub const DEFAULT_CATALOG_SCHEMA: &str = "demo_catalog.agents";

/// Runs a model-written query against the transcripts and customer profile tables
pub struct SqlLookupTool {
    backend: Arc<dyn SqlBackend>,
    description: String,
}

impl SqlLookupTool {
    pub fn new(backend: Arc<dyn SqlBackend>, catalog_schema: &str) -> Self {
        Self {
            backend,
            description: describe_tables(catalog_schema),
        }
    }
}

fn describe_tables(catalog_schema: &str) -> String {
    format!(
        "Query the following tables to find more information based on the provided transcript. \
Decide which table to use based on the call agent's ask and the transcript situation.\n\n\
Available tables:\n\n\
1. {cs}.transcripts which has agent_name, customer_name, tone, topic, transcript\n\
2. {cs}.customer_profiles which has customer_name, total_calls, complaint_calls, avg_sentiment_score, \
avg_category_confidence, estimated_support_cost, product_calls, technical_calls, qualiity_calls, other_calls, \
customer_lifetime_value, profit_margin, profitability_class, recommended_action\n\n\
Use {cs}.transcripts to find past call conversations to see how other agents handled a situation when \
requested by the agent.\n\n\
Use {cs}.customer_profiles to find customer information.",
        cs = catalog_schema
    )
}

#[async_trait]
impl Tool for SqlLookupTool {
    fn name(&self) -> &str {
        SQL_LOOKUP_TOOL_NAME
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> HashMap<String, ParameterDefinition> {
        HashMap::from([param!(
            "sql_query",
            "string",
            "A single SQL SELECT statement using fully qualified table names",
            required
        )])
    }

    async fn execute(&self, params: ToolParameters, context: &ToolContext) -> ToolResult {
        let sql_query: String = match params.get_required("sql_query") {
            Ok(query) => query,
            Err(e) => return ToolResult::error(e.to_string()),
        };

        tracing::info!(session = %context.session_id, query = %sql_query, "Running sql_lookup");

        match self.backend.execute(&sql_query).await {
            Ok(outcome) => {
                if let LookupOutcome::Unavailable(_) = &outcome {
                    tracing::info!(session = %context.session_id, "sql_lookup answered with mock data");
                }
                let rows = outcome.into_rows();
                match serde_json::to_string(&rows) {
                    Ok(content) => ToolResult::success(content),
                    Err(e) => ToolResult::error(format!("Failed to encode rows: {}", e)),
                }
            }
            Err(e) => {
                tracing::warn!(session = %context.session_id, error = %e, "sql_lookup failed");
                ToolResult::error(e.to_string())
            }
        }
    }
}
