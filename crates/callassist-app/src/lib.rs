//! Call Assist web application
//!
//! Serves the transcript page, runs the transcript router for each submitted
//! transcript, proxies audio to a transcription endpoint and brackets every
//! request with an experiment-tracking run.

pub mod cli;
pub mod config;
pub mod markdown;
pub mod tracking;
pub mod transcription;
pub mod web;

pub use cli::Cli;
pub use config::AppConfig;
pub use markdown::{render_or_preformatted, MarkdownRenderer, ReportRenderer};
pub use tracking::{DisabledTracker, MlflowTracker, RunHandle, RunStatus, RunTracker, TrackingError};
pub use transcription::{AudioFormat, ServingTranscriber, Transcriber, TranscriptionError};
pub use web::WebServer;

use anyhow::Result;

/// Validate the CLI into a config and serve until shutdown
pub async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::from_cli(&cli)?;
    let server = WebServer::new(config)?;
    server.start().await
}
