// Logging module - tracing setup and outbound request logging
pub mod request_logger;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use request_logger::RequestLogger;

/// Safely truncate a string to a maximum number of characters
pub fn safe_truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        // Reserve space for "..." suffix
        let trunc_chars = max_chars.saturating_sub(3);
        format!("{}...", s.chars().take(trunc_chars).collect::<String>())
    }
}

/// Mask a bearer token for display, keeping only a short prefix
pub fn mask_token(token: &str) -> String {
    if token.is_empty() {
        return "(none)".to_string();
    }
    format!("{}***", token.chars().take(6).collect::<String>())
}

/// Get or create the logs directory under `base`
pub fn get_logs_dir(base: &Path) -> Result<PathBuf> {
    let logs_dir = base.join("logs");

    if !logs_dir.exists() {
        std::fs::create_dir_all(&logs_dir)
            .with_context(|| format!("Failed to create logs directory {}", logs_dir.display()))?;
    }

    Ok(logs_dir)
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("Invalid log level")?;

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_ansi(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(level = default_level, "Logging initialized");
    Ok(())
}
