use anyhow::{bail, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use callassist_llm_api::{normalize_host, validate_model_name, ServingConfig};
use callassist_tools::WarehouseConfig;

use crate::cli::Cli;

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub host: String,
    pub token: String,
    pub warehouse_id: Option<String>,
    pub catalog_schema: String,
    pub default_model: String,
    pub transcription_endpoint: String,
    pub default_experiment_id: Option<String>,
    pub tracking_enabled: bool,
    pub max_iters: usize,
    pub request_timeout: Duration,
    pub session_ttl: Duration,
    pub max_upload_bytes: usize,
    pub static_dir: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub log_requests: bool,
    pub debug: bool,
}

impl AppConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let bind_addr: SocketAddr = format!("{}:{}", cli.bind, cli.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", cli.bind, cli.port))?;

        validate_model_name(&cli.default_model).context("Invalid --default-model")?;
        validate_model_name(&cli.transcription_endpoint).context("Invalid --transcription-endpoint")?;

        if cli.max_iters == 0 {
            bail!("--max-iters must be at least 1");
        }
        if cli.request_timeout_secs == 0 {
            bail!("--request-timeout-secs must be at least 1");
        }
        if cli.session_ttl_hours == 0 {
            bail!("--session-ttl-hours must be at least 1");
        }
        if cli.max_upload_mb == 0 {
            bail!("--max-upload-mb must be at least 1");
        }

        let host = normalize_host(&cli.databricks_host);

        Ok(Self {
            bind_addr,
            tracking_enabled: !cli.no_tracking && !host.is_empty(),
            host,
            token: cli.databricks_token.clone(),
            warehouse_id: non_blank(cli.warehouse_id.as_deref()),
            catalog_schema: cli.catalog_schema.clone(),
            default_model: cli.default_model.clone(),
            transcription_endpoint: cli.transcription_endpoint.clone(),
            default_experiment_id: non_blank(cli.mlflow_experiment_id.as_deref()),
            max_iters: cli.max_iters,
            request_timeout: Duration::from_secs(cli.request_timeout_secs),
            session_ttl: Duration::from_secs(cli.session_ttl_hours * 60 * 60),
            max_upload_bytes: cli.max_upload_mb * 1024 * 1024,
            static_dir: cli.static_dir.clone(),
            log_dir: cli.log_dir.clone(),
            log_requests: cli.log_requests,
            debug: cli.debug,
        })
    }

    pub fn serving_config(&self) -> ServingConfig {
        ServingConfig::new(&self.host, self.token.clone()).with_timeout(self.request_timeout)
    }

    pub fn warehouse_config(&self) -> WarehouseConfig {
        WarehouseConfig::new(self.host.clone(), self.token.clone(), self.warehouse_id.clone())
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
