use clap::Parser;
use std::path::PathBuf;

use callassist_tools::DEFAULT_CATALOG_SCHEMA;
use callassist_types::{DEFAULT_LLM_MODEL, DEFAULT_MAX_ITERS};

/// CLI arguments for the call assistant server
#[derive(Parser, Debug, Clone)]
#[command(name = "callassist")]
#[command(about = "Call Assist - live call transcript analysis with a tool-using agent")]
#[command(version = "0.1.0")]
pub struct Cli {
    /// Address to bind the web server to
    #[arg(long, default_value = "0.0.0.0", env = "CALLASSIST_BIND")]
    pub bind: String,

    /// Web server port
    #[arg(long, default_value = "5000", env = "CALLASSIST_PORT")]
    pub port: u16,

    /// Workspace host serving models, the SQL warehouse and experiment tracking
    #[arg(long, value_name = "URL", env = "DATABRICKS_HOST", default_value = "")]
    pub databricks_host: String,

    /// Bearer token for the workspace
    #[arg(long, value_name = "TOKEN", env = "DATABRICKS_TOKEN", default_value = "", hide_env_values = true)]
    pub databricks_token: String,

    /// SQL warehouse used by the sql_lookup tool. Without it the tool returns mock data.
    #[arg(long, value_name = "ID", env = "DATABRICKS_WAREHOUSE_ID")]
    pub warehouse_id: Option<String>,

    /// Catalog and schema holding the transcripts and customer_profiles tables
    #[arg(long, default_value = DEFAULT_CATALOG_SCHEMA, env = "CALLASSIST_CATALOG_SCHEMA")]
    pub catalog_schema: String,

    /// Model selected when the form does not name one
    #[arg(long, default_value = DEFAULT_LLM_MODEL, env = "CALLASSIST_DEFAULT_MODEL")]
    pub default_model: String,

    /// Serving endpoint used to transcribe uploaded audio
    #[arg(long, default_value = "gemma3n", env = "CALLASSIST_TRANSCRIPTION_ENDPOINT")]
    pub transcription_endpoint: String,

    /// Experiment that runs are logged to when the form leaves the field empty
    #[arg(long, value_name = "ID", env = "MLFLOW_EXPERIMENT_ID")]
    pub mlflow_experiment_id: Option<String>,

    /// Disable experiment tracking entirely
    #[arg(long)]
    pub no_tracking: bool,

    /// Maximum tool-calling rounds per transcript
    #[arg(long, default_value_t = DEFAULT_MAX_ITERS)]
    pub max_iters: usize,

    /// Timeout for every outbound HTTP call, in seconds
    #[arg(long, default_value_t = 120)]
    pub request_timeout_secs: u64,

    /// Sessions idle longer than this are dropped
    #[arg(long, default_value_t = 24)]
    pub session_ttl_hours: u64,

    /// Largest accepted audio upload, in MiB
    #[arg(long, default_value_t = 50)]
    pub max_upload_mb: usize,

    /// Serve page assets from this directory instead of the built-in ones
    #[arg(long, value_name = "PATH")]
    pub static_dir: Option<PathBuf>,

    /// Directory that receives request/response log files
    #[arg(long, value_name = "PATH", default_value = ".")]
    pub log_dir: PathBuf,

    /// Write every model request and response to files under <log-dir>/logs
    #[arg(long)]
    pub log_requests: bool,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Include error details in user-facing messages and echo logged model
    /// requests to the console
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["callassist"]).unwrap();
        assert_eq!(cli.port, 5000);
        assert_eq!(cli.max_iters, 3);
        assert_eq!(cli.catalog_schema, "demo_catalog.agents");
        assert_eq!(cli.transcription_endpoint, "gemma3n");
        assert!(!cli.no_tracking);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "callassist",
            "--port",
            "8081",
            "--max-iters",
            "5",
            "--no-tracking",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.port, 8081);
        assert_eq!(cli.max_iters, 5);
        assert!(cli.no_tracking);
        assert!(cli.debug);
    }
}
