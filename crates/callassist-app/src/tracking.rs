//! Experiment tracking
//!
//! Each processing request is bracketed by a run on an MLflow tracking
//! server: the run is created before the agent is called, gets a small batch
//! of params and metrics, and is closed with its final status. Tracking is
//! best-effort and never fails a request on its own, except that an
//! experiment id typed into the form is validated up front.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Terminal status written when a run is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// A started run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHandle {
    pub run_id: String,
    pub experiment_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TrackingError {
    #[error("experiment {id} is not usable: {reason}")]
    InvalidExperiment { id: String, reason: String },

    #[error("tracking server returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to tracking server failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected tracking response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("experiment tracking is disabled")]
    Disabled,
}

#[async_trait]
pub trait RunTracker: Send + Sync {
    /// False when runs can never be started
    fn is_enabled(&self) -> bool {
        true
    }

    /// Check that `experiment_id` names a live experiment
    async fn set_experiment(&self, experiment_id: &str) -> Result<(), TrackingError>;

    async fn start_run(&self, experiment_id: &str) -> Result<RunHandle, TrackingError>;

    async fn log_batch(
        &self,
        run: &RunHandle,
        params: &[(&str, String)],
        metrics: &[(&str, f64)],
    ) -> Result<(), TrackingError>;

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<(), TrackingError>;
}

/// Tracker used when no tracking server is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledTracker;

#[async_trait]
impl RunTracker for DisabledTracker {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn set_experiment(&self, experiment_id: &str) -> Result<(), TrackingError> {
        tracing::debug!(experiment_id, "Tracking disabled, experiment id not checked");
        Ok(())
    }

    async fn start_run(&self, _experiment_id: &str) -> Result<RunHandle, TrackingError> {
        Err(TrackingError::Disabled)
    }

    async fn log_batch(
        &self,
        _run: &RunHandle,
        _params: &[(&str, String)],
        _metrics: &[(&str, f64)],
    ) -> Result<(), TrackingError> {
        Err(TrackingError::Disabled)
    }

    async fn end_run(&self, _run: &RunHandle, _status: RunStatus) -> Result<(), TrackingError> {
        Err(TrackingError::Disabled)
    }
}

#[derive(Debug, Deserialize)]
struct GetExperimentResponse {
    experiment: Experiment,
}

#[derive(Debug, Deserialize)]
struct Experiment {
    #[serde(default)]
    lifecycle_stage: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: Run,
}

#[derive(Debug, Deserialize)]
struct Run {
    info: RunInfo,
}

#[derive(Debug, Deserialize)]
struct RunInfo {
    run_id: String,
}

/// MLflow REST client
pub struct MlflowTracker {
    host: String,
    token: String,
    client: reqwest::Client,
}

impl MlflowTracker {
    pub fn new(host: impl Into<String>, token: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            host: host.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.host, endpoint)
    }

    async fn post(&self, endpoint: &str, body: serde_json::Value) -> Result<String, TrackingError> {
        let response = self
            .client
            .post(self.url(endpoint))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(TrackingError::Api {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl RunTracker for MlflowTracker {
    async fn set_experiment(&self, experiment_id: &str) -> Result<(), TrackingError> {
        let invalid = |reason: String| TrackingError::InvalidExperiment {
            id: experiment_id.to_string(),
            reason,
        };

        let response = self
            .client
            .get(self.url("experiments/get"))
            .bearer_auth(&self.token)
            .query(&[("experiment_id", experiment_id)])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(invalid(format!("{} {}", status.as_u16(), text)));
        }

        let found: GetExperimentResponse = serde_json::from_str(&text)?;
        match found.experiment.lifecycle_stage.as_deref() {
            Some("deleted") => Err(invalid("experiment is deleted".to_string())),
            _ => Ok(()),
        }
    }

    async fn start_run(&self, experiment_id: &str) -> Result<RunHandle, TrackingError> {
        let body = json!({
            "experiment_id": experiment_id,
            "start_time": now_millis(),
            "tags": [{"key": "mlflow.source.name", "value": "callassist"}],
        });
        let text = self.post("runs/create", body).await?;
        let created: CreateRunResponse = serde_json::from_str(&text)?;

        tracing::info!(run_id = %created.run.info.run_id, experiment_id, "Started tracking run");
        Ok(RunHandle {
            run_id: created.run.info.run_id,
            experiment_id: experiment_id.to_string(),
        })
    }

    async fn log_batch(
        &self,
        run: &RunHandle,
        params: &[(&str, String)],
        metrics: &[(&str, f64)],
    ) -> Result<(), TrackingError> {
        let timestamp = now_millis();
        let params: Vec<_> = params
            .iter()
            .map(|(key, value)| json!({"key": key, "value": value}))
            .collect();
        let metrics: Vec<_> = metrics
            .iter()
            .map(|(key, value)| json!({"key": key, "value": value, "timestamp": timestamp, "step": 0}))
            .collect();

        self.post(
            "runs/log-batch",
            json!({"run_id": run.run_id, "params": params, "metrics": metrics}),
        )
        .await?;
        Ok(())
    }

    async fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<(), TrackingError> {
        self.post(
            "runs/update",
            json!({"run_id": run.run_id, "status": status.as_str(), "end_time": now_millis()}),
        )
        .await?;
        tracing::info!(run_id = %run.run_id, status = status.as_str(), "Ended tracking run");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_status_strings() {
        assert_eq!(RunStatus::Finished.as_str(), "FINISHED");
        assert_eq!(RunStatus::Failed.as_str(), "FAILED");
    }

    #[test]
    fn test_url_trims_slash() {
        let tracker = MlflowTracker::new("https://host.example/", "t", reqwest::Client::new());
        assert_eq!(tracker.url("runs/create"), "https://host.example/api/2.0/mlflow/runs/create");
    }

    #[tokio::test]
    async fn test_disabled_tracker_accepts_any_experiment() {
        let tracker = DisabledTracker;
        assert!(!tracker.is_enabled());
        assert!(tracker.set_experiment("123").await.is_ok());
        assert!(matches!(tracker.start_run("123").await, Err(TrackingError::Disabled)));
    }
}
