use anyhow::{Context, Result};
use axum::Router;
use colored::Colorize;
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use callassist_llm_api::ClientFactory;
use callassist_logging::{mask_token, RequestLogger};
use callassist_toolcore::ToolRegistry;
use callassist_tools::{SqlLookupTool, WarehouseBackend};

use crate::config::AppConfig;
use crate::tracking::{DisabledTracker, MlflowTracker, RunTracker};
use crate::transcription::ServingTranscriber;
use crate::web::routes::{self, AppState, RouteSettings};
use crate::web::session_store::{spawn_purge_task, SessionStore};

/// Web server instance
pub struct WebServer {
    config: AppConfig,
    state: AppState,
}

impl WebServer {
    /// Wire every collaborator from `config`
    pub fn new(config: AppConfig) -> Result<Self> {
        let serving = config.serving_config();
        let http = serving.http_client().context("Failed to build HTTP client")?;

        let request_logger = if config.log_requests {
            Some(RequestLogger::new(config.log_dir.clone(), config.debug)?)
        } else {
            None
        };
        let factory = ClientFactory::new(serving.clone(), request_logger)?;

        let warehouse = WarehouseBackend::new(config.warehouse_config(), http.clone());
        let mut tools = ToolRegistry::new();
        tools.register(SqlLookupTool::new(Arc::new(warehouse), &config.catalog_schema));

        let tracker: Arc<dyn RunTracker> = if config.tracking_enabled {
            Arc::new(MlflowTracker::new(config.host.clone(), config.token.clone(), http.clone()))
        } else {
            Arc::new(DisabledTracker)
        };

        let invocations_url = serving
            .is_configured()
            .then(|| serving.invocations_url(&config.transcription_endpoint));
        let transcriber = ServingTranscriber::new(invocations_url, config.token.clone(), http);

        let settings = RouteSettings {
            default_model: config.default_model.clone(),
            default_experiment_id: config.default_experiment_id.clone(),
            max_iters: config.max_iters,
            debug: config.debug,
            max_upload_bytes: config.max_upload_bytes,
            static_dir: config.static_dir.clone(),
        };

        let state = AppState::new(
            Arc::new(SessionStore::new()),
            Arc::new(factory),
            tools,
            tracker,
            Arc::new(transcriber),
        )
        .with_settings(settings);

        Ok(Self { config, state })
    }

    /// Router with CORS and request tracing applied
    pub fn app(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        routes::create_router(self.state.clone())
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    fn print_banner(&self) {
        let config = &self.config;
        let or_none = |value: Option<&str>| value.unwrap_or("(none)").to_string();

        println!("{}", "📞 Call Assist web server".bright_cyan().bold());
        println!("   Address: {}", format!("http://{}", config.bind_addr).green());
        println!(
            "   Workspace: {}",
            if config.host.is_empty() { "(not configured)" } else { config.host.as_str() }
        );
        println!("   Token: {}", mask_token(&config.token).bright_black());
        println!("   Default model: {}", config.default_model.cyan());
        println!(
            "   SQL warehouse: {} ({})",
            or_none(config.warehouse_id.as_deref()),
            config.catalog_schema
        );
        println!(
            "   Tracking: {} (default experiment {})",
            if config.tracking_enabled { "enabled".green() } else { "disabled".yellow() },
            or_none(config.default_experiment_id.as_deref())
        );
        println!("   Transcription endpoint: {}", config.transcription_endpoint);
        if let Some(dir) = &config.static_dir {
            println!("   Serving static files from: {}", dir.display());
        }
        if config.log_requests {
            println!("   Request logs: {}", config.log_dir.join("logs").display());
        }
        if config.warehouse_id.is_none() {
            println!(
                "{}",
                "   ⚠️  No SQL warehouse configured, sql_lookup will return mock data".yellow()
            );
        }
    }

    /// Start the web server
    pub async fn start(self) -> Result<()> {
        self.print_banner();

        let purge_task = spawn_purge_task(self.state.sessions.clone(), self.config.session_ttl);
        let app = self.app();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.config.bind_addr))?;
        tracing::info!(addr = %self.config.bind_addr, "Listening");

        let served = axum::serve(listener, app).await;
        purge_task.abort();
        served?;

        Ok(())
    }
}
