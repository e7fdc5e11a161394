use anyhow::{Context, Result};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use crate::{get_logs_dir, mask_token, safe_truncate};

const CONSOLE_PREVIEW_CHARS: usize = 5000;

/// Writes outbound model-serving requests and their responses to files, and
/// optionally echoes them to the console.
#[derive(Debug, Clone)]
pub struct RequestLogger {
    logs_dir: PathBuf,
    verbose: bool,
}

impl RequestLogger {
    pub fn new(base_dir: PathBuf, verbose: bool) -> Result<Self> {
        let logs_dir = get_logs_dir(&base_dir)?;
        Ok(Self { logs_dir, verbose })
    }

    pub fn logs_dir(&self) -> &PathBuf {
        &self.logs_dir
    }

    /// Log an HTTP request to file. Returns the timestamp used in the file
    /// name so the matching response can share it.
    pub fn log_request(
        &self,
        url: &str,
        body: &serde_json::Value,
        model: &str,
        token: &str,
    ) -> Result<i64> {
        let timestamp = chrono::Utc::now().timestamp_millis();
        let filename = format!("req-{}-{}.txt", timestamp, file_safe(model));
        let file_path = self.logs_dir.join(&filename);

        let mut log_content = String::new();
        log_content.push_str("HTTP REQUEST LOG\n");
        log_content.push_str("================\n\n");
        log_content.push_str(&format!("Timestamp: {}\n", timestamp));
        log_content.push_str(&format!("Model: {}\n\n", model));

        // Parse URL to show host and port
        if let Ok(parsed_url) = reqwest::Url::parse(url) {
            log_content.push_str(&format!("URL: {}\n", url));
            log_content.push_str(&format!("Host: {}\n", parsed_url.host_str().unwrap_or("unknown")));
            log_content.push_str(&format!(
                "Port: {}\n",
                parsed_url
                    .port_or_known_default()
                    .map(|p| p.to_string())
                    .unwrap_or_else(|| "unknown".to_string())
            ));
            log_content.push_str(&format!("Scheme: {}\n\n", parsed_url.scheme()));
        } else {
            log_content.push_str(&format!("URL: {}\n\n", url));
        }

        log_content.push_str("Headers:\n");
        log_content.push_str("  Content-Type: application/json\n");
        log_content.push_str(&format!("  Authorization: Bearer {}\n\n", mask_token(token)));

        log_content.push_str("Request Body:\n");
        let pretty = serde_json::to_string_pretty(body).unwrap_or_else(|e| format!("Error serializing request: {}", e));
        log_content.push_str(&pretty);
        log_content.push('\n');

        fs::write(&file_path, log_content)
            .with_context(|| format!("Failed to write request log to {}", file_path.display()))?;

        if self.verbose {
            println!("\n{}", "═".repeat(80).bright_cyan());
            println!("{} {}", "🔍 REQUEST".bright_cyan().bold(), url);
            println!("{}", safe_truncate(&pretty, CONSOLE_PREVIEW_CHARS));
            println!("{}", format!("📝 Request logged to: {}", filename).bright_blue());
        }

        Ok(timestamp)
    }

    /// Log an HTTP response to file, pairing it with the request timestamp
    pub fn log_response(
        &self,
        status: reqwest::StatusCode,
        body: &str,
        request_timestamp: i64,
        model: &str,
    ) -> Result<()> {
        let filename = format!("resp-{}-{}.txt", request_timestamp, file_safe(model));
        let file_path = self.logs_dir.join(&filename);

        let mut log_content = String::new();
        log_content.push_str("HTTP RESPONSE LOG\n");
        log_content.push_str("=================\n\n");
        log_content.push_str(&format!("Timestamp: {}\n", request_timestamp));
        log_content.push_str(&format!("Model: {}\n\n", model));
        log_content.push_str(&format!(
            "Status: {} {}\n\n",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ));

        log_content.push_str("Response Body:\n");
        // Try to pretty-print JSON, fall back to raw text
        let rendered = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json_val| serde_json::to_string_pretty(&json_val).ok())
            .unwrap_or_else(|| body.to_string());
        log_content.push_str(&rendered);
        log_content.push('\n');

        log_content.push_str("\n---\n");
        log_content.push_str(&format!("Response Size: {} bytes\n", body.len()));

        fs::write(&file_path, log_content)
            .with_context(|| format!("Failed to write response log to {}", file_path.display()))?;

        if self.verbose {
            println!(
                "{} {} {}",
                "📥 RESPONSE".bright_green().bold(),
                status.as_u16(),
                safe_truncate(&rendered, CONSOLE_PREVIEW_CHARS)
            );
            println!("{}", format!("📄 Response logged to: {}", filename).bright_blue());
            println!("{}", "═".repeat(80).bright_green());
        }

        Ok(())
    }
}

fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}
