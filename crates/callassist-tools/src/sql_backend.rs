use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

/// One result row: column name to value
pub type Row = Map<String, Value>;

/// Key of the single record returned when no warehouse can be reached
pub const MOCK_DATA_KEY: &str = "mock_data";

/// Build the mock-data sentinel record
pub fn mock_data_record() -> Row {
    let mut row = Row::new();
    row.insert(
        MOCK_DATA_KEY.to_string(),
        Value::String("This is mock data since the SQL warehouse is not available".to_string()),
    );
    row
}

/// Result of a lookup, making the degraded mode explicit
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Available(Vec<Row>),
    Unavailable(Row),
}

impl LookupOutcome {
    pub fn unavailable() -> Self {
        Self::Unavailable(mock_data_record())
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Available(rows) => rows,
            Self::Unavailable(sentinel) => vec![sentinel],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SqlError {
    #[error("statement {state}: {message}")]
    Statement { state: String, message: String },

    #[error("warehouse returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to warehouse failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected statement response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Executes SQL text somewhere and returns rows
#[async_trait]
pub trait SqlBackend: Send + Sync {
    async fn execute(&self, sql_query: &str) -> Result<LookupOutcome, SqlError>;
}

/// Backend used when no warehouse is configured
#[derive(Debug, Default, Clone)]
pub struct UnavailableBackend;

#[async_trait]
impl SqlBackend for UnavailableBackend {
    async fn execute(&self, _sql_query: &str) -> Result<LookupOutcome, SqlError> {
        Ok(LookupOutcome::unavailable())
    }
}

/// Connection settings for the SQL statement execution API
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    pub host: String,
    pub token: String,
    pub warehouse_id: Option<String>,
    /// Server-side wait before the statement is cancelled, e.g. `30s`
    pub wait_timeout: String,
    pub row_limit: u32,
}

impl WarehouseConfig {
    pub fn new(host: impl Into<String>, token: impl Into<String>, warehouse_id: Option<String>) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            token: token.into(),
            warehouse_id: warehouse_id.filter(|id| !id.trim().is_empty()),
            wait_timeout: "30s".to_string(),
            row_limit: 1000,
        }
    }

    pub fn statements_url(&self) -> String {
        format!("{}/api/2.0/sql/statements", self.host)
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    #[serde(default)]
    statement_id: Option<String>,
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<StatementErrorBody>,
}

#[derive(Debug, Deserialize)]
struct StatementErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    schema: Schema,
}

#[derive(Debug, Deserialize)]
struct Schema {
    #[serde(default)]
    columns: Vec<Column>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
    #[serde(default)]
    type_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Vec<Vec<Value>>,
}

/// SQL warehouse reached through the statement execution REST API
pub struct WarehouseBackend {
    config: WarehouseConfig,
    client: reqwest::Client,
}

impl WarehouseBackend {
    pub fn new(config: WarehouseConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }
}

#[async_trait]
impl SqlBackend for WarehouseBackend {
    async fn execute(&self, sql_query: &str) -> Result<LookupOutcome, SqlError> {
        let warehouse_id = match &self.config.warehouse_id {
            Some(id) if !self.config.host.is_empty() => id,
            _ => {
                tracing::info!("SQL warehouse not configured, returning mock data");
                return Ok(LookupOutcome::unavailable());
            }
        };

        let body = serde_json::json!({
            "statement": sql_query,
            "warehouse_id": warehouse_id,
            "wait_timeout": self.config.wait_timeout,
            "on_wait_timeout": "CANCEL",
            "format": "JSON_ARRAY",
            "disposition": "INLINE",
            "row_limit": self.config.row_limit,
        });

        let response = match self
            .client
            .post(self.config.statements_url())
            .bearer_auth(&self.config.token)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() => {
                tracing::warn!(error = %e, "SQL warehouse unreachable, returning mock data");
                return Ok(LookupOutcome::unavailable());
            }
            Err(e) => return Err(e.into()),
        };

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(SqlError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let statement: StatementResponse = serde_json::from_str(&text)?;
        tracing::debug!(
            statement_id = statement.statement_id.as_deref().unwrap_or("?"),
            state = %statement.status.state,
            "Statement finished"
        );
        rows_from_statement(statement).map(LookupOutcome::Available)
    }
}

fn rows_from_statement(statement: StatementResponse) -> Result<Vec<Row>, SqlError> {
    if statement.status.state != "SUCCEEDED" {
        let message = statement
            .status
            .error
            .and_then(|e| e.message)
            .unwrap_or_else(|| "no error message".to_string());
        return Err(SqlError::Statement {
            state: statement.status.state,
            message,
        });
    }

    let columns = statement
        .manifest
        .map(|manifest| manifest.schema.columns)
        .unwrap_or_default();
    let data = statement.result.map(|result| result.data_array).unwrap_or_default();

    Ok(data
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .zip(cells)
                .map(|(column, cell)| {
                    let value = convert_cell(column.type_name.as_deref(), cell);
                    (column.name.clone(), value)
                })
                .collect()
        })
        .collect())
}

/// JSON_ARRAY results carry every cell as a string; restore numbers and
/// booleans from the column type. DECIMAL stays a string since it can be
/// wider than an f64.
fn convert_cell(type_name: Option<&str>, cell: Value) -> Value {
    let converted = match (&cell, type_name.unwrap_or("STRING")) {
        (Value::String(text), "BYTE" | "SHORT" | "INT" | "LONG") => text.parse::<i64>().ok().map(Value::from),
        (Value::String(text), "FLOAT" | "DOUBLE") => text
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number),
        (Value::String(text), "BOOLEAN") => text.parse::<bool>().ok().map(Value::Bool),
        _ => None,
    };

    converted.unwrap_or(cell)
}
