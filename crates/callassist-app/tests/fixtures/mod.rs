#![allow(dead_code)]

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;

use callassist::tracking::{RunHandle, RunStatus, RunTracker, TrackingError};
use callassist::transcription::{AudioFormat, Transcriber, TranscriptionError};
use callassist::web::{create_router, AppState, ModelProvider, RouteSettings, SessionStore, SESSION_COOKIE};
use callassist::ReportRenderer;
use callassist_llm_api::{
    validate_model_name, ChatMessage, FunctionCall, LlmClient, LlmError, LlmResponse, ToolCall, ToolDefinition,
};
use callassist_toolcore::ToolRegistry;
use callassist_tools::{SqlLookupTool, UnavailableBackend, DEFAULT_CATALOG_SCHEMA};

// ============================================================================
// Chat model
// ============================================================================

/// Replays canned assistant messages across every client it hands out
#[derive(Default)]
pub struct ScriptedModels {
    replies: Mutex<VecDeque<ChatMessage>>,
    calls: Mutex<usize>,
}

impl ScriptedModels {
    pub fn new(replies: Vec<ChatMessage>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn next(&self) -> Result<ChatMessage> {
        *self.calls.lock().unwrap() += 1;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| anyhow::anyhow!("serving endpoint unavailable"))
    }
}

struct ScriptedClient {
    model: String,
    models: Arc<ScriptedModels>,
}

#[async_trait]
impl LlmClient for ScriptedClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, _messages: Vec<ChatMessage>, _tools: Vec<ToolDefinition>) -> Result<LlmResponse> {
        let message = self.models.next()?;
        Ok(LlmResponse { message, usage: None })
    }
}

/// Provider wrapper so the `Arc<ScriptedModels>` can be shared with the test
pub struct ScriptedProvider(pub Arc<ScriptedModels>);

impl ModelProvider for ScriptedProvider {
    fn client(&self, model: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
        validate_model_name(model)?;
        Ok(Arc::new(ScriptedClient {
            model: model.to_string(),
            models: self.0.clone(),
        }))
    }
}

pub fn answer(queried_table: &str, report: &str) -> ChatMessage {
    ChatMessage::assistant(
        serde_json::json!({
            "queried_table": queried_table,
            "relevant_information": report,
        })
        .to_string(),
    )
}

pub fn sql_call(sql: &str) -> ChatMessage {
    let mut message = ChatMessage::assistant("");
    message.tool_calls = Some(vec![ToolCall {
        id: "call_1".to_string(),
        tool_type: "function".to_string(),
        function: FunctionCall {
            name: "sql_lookup".to_string(),
            arguments: serde_json::json!({ "sql_query": sql }).to_string(),
        },
    }]);
    message
}

// ============================================================================
// Tracker
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum TrackerEvent {
    SetExperiment(String),
    StartRun(String),
    LogBatch(Vec<String>),
    EndRun(RunStatus),
}

/// Records every call; rejects experiment "bad" and optionally fails run starts
#[derive(Default)]
pub struct RecordingTracker {
    pub events: Mutex<Vec<TrackerEvent>>,
    pub fail_start: bool,
}

impl RecordingTracker {
    pub fn events(&self) -> Vec<TrackerEvent> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: TrackerEvent) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait]
impl RunTracker for RecordingTracker {
    async fn set_experiment(&self, experiment_id: &str) -> Result<(), TrackingError> {
        self.record(TrackerEvent::SetExperiment(experiment_id.to_string()));
        if experiment_id == "bad" {
            return Err(TrackingError::InvalidExperiment {
                id: experiment_id.to_string(),
                reason: "RESOURCE_DOES_NOT_EXIST".to_string(),
            });
        }
        Ok(())
    }

    async fn start_run(&self, experiment_id: &str) -> Result<RunHandle, TrackingError> {
        self.record(TrackerEvent::StartRun(experiment_id.to_string()));
        if self.fail_start {
            return Err(TrackingError::Api {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(RunHandle {
            run_id: "run-1".to_string(),
            experiment_id: experiment_id.to_string(),
        })
    }

    async fn log_batch(
        &self,
        _run: &RunHandle,
        params: &[(&str, String)],
        _metrics: &[(&str, f64)],
    ) -> Result<(), TrackingError> {
        self.record(TrackerEvent::LogBatch(
            params.iter().map(|(key, value)| format!("{}={}", key, value)).collect(),
        ));
        Ok(())
    }

    async fn end_run(&self, _run: &RunHandle, status: RunStatus) -> Result<(), TrackingError> {
        self.record(TrackerEvent::EndRun(status));
        Ok(())
    }
}

// ============================================================================
// Transcriber and renderer
// ============================================================================

pub struct FixedTranscriber(pub &'static str);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _format: AudioFormat, _audio: &[u8]) -> Result<String, TranscriptionError> {
        Ok(self.0.to_string())
    }
}

pub struct FailingRenderer;

impl ReportRenderer for FailingRenderer {
    fn render(&self, _markdown: &str) -> Result<String, fmt::Error> {
        Err(fmt::Error)
    }
}

// ============================================================================
// App harness
// ============================================================================

pub struct TestApp {
    pub sessions: Arc<SessionStore>,
    pub models: Arc<ScriptedModels>,
    pub tracker: Arc<RecordingTracker>,
    pub state: AppState,
}

impl TestApp {
    pub fn new(replies: Vec<ChatMessage>) -> Self {
        Self::with_tracker(replies, RecordingTracker::default())
    }

    pub fn with_tracker(replies: Vec<ChatMessage>, tracker: RecordingTracker) -> Self {
        let sessions = Arc::new(SessionStore::new());
        let models = ScriptedModels::new(replies);
        let tracker = Arc::new(tracker);

        let mut tools = ToolRegistry::new();
        tools.register(SqlLookupTool::new(Arc::new(UnavailableBackend), DEFAULT_CATALOG_SCHEMA));

        let state = AppState::new(
            sessions.clone(),
            Arc::new(ScriptedProvider(models.clone())),
            tools,
            tracker.clone(),
            Arc::new(FixedTranscriber("Customer: hello, my package is late.")),
        );

        Self {
            sessions,
            models,
            tracker,
            state,
        }
    }

    pub fn with_settings(mut self, settings: RouteSettings) -> Self {
        self.state = self.state.with_settings(settings);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.state = self.state.with_renderer(renderer);
        self
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }
}

// ============================================================================
// HTTP helpers
// ============================================================================

fn percent_encode(value: &str) -> String {
    let mut encoded = String::new();
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => encoded.push(byte as char),
            b' ' => encoded.push('+'),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

pub fn form_body(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={}", percent_encode(key), percent_encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

pub fn form_request(uri: &str, fields: &[(&str, &str)], token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
    }
    builder.body(Body::from(form_body(fields))).unwrap()
}

pub const BOUNDARY: &str = "callassist-test-boundary";

pub fn multipart_request(field: &str, filename: &str, content: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process_audio")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Plain text fields posted as `multipart/form-data`, the way a browser
/// sends a `FormData` object
pub fn multipart_form_request(uri: &str, fields: &[(&str, &str)], token: Option<&str>) -> Request<Body> {
    let mut body = String::new();
    for (name, value) in fields {
        body.push_str(&format!(
            "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
            BOUNDARY, name, value
        ));
    }
    body.push_str(&format!("--{}--\r\n", BOUNDARY));

    let mut builder = Request::builder().method("POST").uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token));
    }
    builder.body(Body::from(body)).unwrap()
}

/// Session token from the response's Set-Cookie header
pub fn cookie_token(response: &Response<Body>) -> Option<String> {
    let value = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = value.split(';').next()?;
    let (name, token) = pair.split_once('=')?;
    (name == SESSION_COOKIE).then(|| token.to_string())
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
