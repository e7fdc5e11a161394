use axum::{
    async_trait,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::FormRejection,
        DefaultBodyLimit, FromRequest, Multipart, Request, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tower_http::services::ServeDir;

use callassist_agents::{RouterInput, TranscriptRouter};
use callassist_llm_api::{ClientFactory, LlmClient, LlmError};
use callassist_toolcore::{ToolContext, ToolRegistry};
use callassist_types::{ConversationTurn, DemoState, RouterResponse, DEFAULT_LLM_MODEL, DEFAULT_MAX_ITERS};

use crate::markdown::{render_or_preformatted, MarkdownRenderer, ReportRenderer};
use crate::tracking::{RunHandle, RunStatus, RunTracker};
use crate::transcription::{AudioFormat, Transcriber};
use crate::web::session_store::{session_cookie, session_token, SessionContext, SessionStore};
use crate::web::template::render_index;

const SCRIPT_JS: &str = include_str!("../../web/static/js/script.js");
const STYLE_CSS: &str = include_str!("../../web/static/css/style.css");

const PROCESSING_USER_MESSAGE: &str = "Sorry, an error occurred while processing your transcript. Please try again.";

/// Hands out a chat client for the model named in the form
pub trait ModelProvider: Send + Sync {
    fn client(&self, model: &str) -> Result<Arc<dyn LlmClient>, LlmError>;
}

impl ModelProvider for ClientFactory {
    fn client(&self, model: &str) -> Result<Arc<dyn LlmClient>, LlmError> {
        self.create(model)
    }
}

/// Handler settings fixed at startup
#[derive(Debug, Clone)]
pub struct RouteSettings {
    pub default_model: String,
    pub default_experiment_id: Option<String>,
    pub max_iters: usize,
    pub debug: bool,
    pub max_upload_bytes: usize,
    /// Serve `/static` from disk instead of the built-in assets
    pub static_dir: Option<PathBuf>,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_LLM_MODEL.to_string(),
            default_experiment_id: None,
            max_iters: DEFAULT_MAX_ITERS,
            debug: false,
            max_upload_bytes: 50 * 1024 * 1024,
            static_dir: None,
        }
    }
}

/// Application state shared across routes
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub models: Arc<dyn ModelProvider>,
    pub tools: ToolRegistry,
    pub tracker: Arc<dyn RunTracker>,
    pub transcriber: Arc<dyn Transcriber>,
    pub renderer: Arc<dyn ReportRenderer>,
    pub settings: Arc<RouteSettings>,
}

impl AppState {
    pub fn new(
        sessions: Arc<SessionStore>,
        models: Arc<dyn ModelProvider>,
        tools: ToolRegistry,
        tracker: Arc<dyn RunTracker>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            sessions,
            models,
            tools,
            tracker,
            transcriber,
            renderer: Arc::new(MarkdownRenderer),
            settings: Arc::new(RouteSettings::default()),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ReportRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_settings(mut self, settings: RouteSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}

/// Create router with all routes
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(serve_index))
        .route("/process_transcript", post(process_transcript))
        .route("/process_audio", post(process_audio))
        .route("/clear_history", post(clear_history));

    router = match &state.settings.static_dir {
        Some(dir) => router.nest_service("/static", ServeDir::new(dir)),
        None => router
            .route("/static/js/script.js", get(serve_script))
            .route("/static/css/style.css", get(serve_style)),
    };

    router
        .layer(DefaultBodyLimit::max(state.settings.max_upload_bytes))
        .with_state(state)
}

/// Attach the session cookie when a new token was issued
fn with_session_cookie(mut response: Response, session: &SessionContext) -> Response {
    if session.is_new {
        if let Ok(value) = HeaderValue::from_str(&session_cookie(&session.id)) {
            response.headers_mut().insert(header::SET_COOKIE, value);
        }
    }
    response
}

/// GET / - Reset the session and render the page
async fn serve_index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    let session = state.sessions.load_or_init(token.as_deref(), true).await;
    tracing::info!(session = %session.id, "Serving index with fresh session");

    with_session_cookie(Html(render_index(&session.state)).into_response(), &session)
}

async fn serve_script() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/javascript; charset=utf-8")], SCRIPT_JS)
}

async fn serve_style() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/css; charset=utf-8")], STYLE_CSS)
}

/// Form fields posted by the transcript form
///
/// Accepted both urlencoded and as `multipart/form-data`, which is what a
/// browser sends when it posts a `FormData` object directly.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TranscriptForm {
    #[serde(default)]
    pub transcript: String,
    #[serde(default)]
    pub call_agent_ask: String,
    #[serde(default)]
    pub mlflow_experiment_id: String,
    #[serde(default)]
    pub llm_model: Option<String>,
}

impl TranscriptForm {
    fn set_field(&mut self, name: &str, value: String) {
        match name {
            "transcript" => self.transcript = value,
            "call_agent_ask" => self.call_agent_ask = value,
            "mlflow_experiment_id" => self.mlflow_experiment_id = value,
            "llm_model" => self.llm_model = Some(value),
            _ => {}
        }
    }
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.trim_start().to_ascii_lowercase().starts_with("multipart/form-data"))
}

#[async_trait]
impl<S> FromRequest<S> for TranscriptForm
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(req.headers()) {
            let Form(form) = Form::<TranscriptForm>::from_request(req, state).await?;
            return Ok(form);
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut form = TranscriptForm::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            let value = field.text().await?;
            form.set_field(&name, value);
        }
        Ok(form)
    }
}

#[derive(Debug, Serialize)]
struct TranscriptReply {
    success: bool,
    response: String,
    demo_state: DemoState,
}

/// POST /process_transcript - Run the router on a transcript
async fn process_transcript(
    State(state): State<AppState>,
    headers: HeaderMap,
    form: Result<TranscriptForm, AppError>,
) -> Response {
    let token = session_token(&headers);
    let mut session = state.sessions.load_or_init(token.as_deref(), false).await;

    let form = match form {
        Ok(form) => form,
        Err(err) => {
            let demo_state = session.state.demo_state.clone();
            return with_session_cookie(err.into_reply(Some(demo_state), state.settings.debug), &session);
        }
    };

    let model = form
        .llm_model
        .clone()
        .unwrap_or_else(|| state.settings.default_model.clone());
    tracing::info!(
        session = %session.id,
        transcript_chars = form.transcript.chars().count(),
        has_ask = !form.call_agent_ask.trim().is_empty(),
        experiment_id = %form.mlflow_experiment_id,
        model = %model,
        "Process transcript request received"
    );

    session.state.transcript_input = form.transcript.clone();
    session.state.mlflow_experiment_id = form.mlflow_experiment_id.clone();
    session.state.llm_model = model.clone();
    session.state.processing = true;
    state.sessions.save(&session).await;

    let result = handle_transcript(&state, &mut session, &form, &model).await;

    session.state.processing = false;
    state.sessions.save(&session).await;

    let demo_state = session.state.demo_state.clone();
    let response = match result {
        Ok(rendered) => Json(TranscriptReply {
            success: true,
            response: rendered,
            demo_state,
        })
        .into_response(),
        Err(err) => err.into_reply(Some(demo_state), state.settings.debug),
    };

    with_session_cookie(response, &session)
}

async fn handle_transcript(
    state: &AppState,
    session: &mut SessionContext,
    form: &TranscriptForm,
    model: &str,
) -> Result<String, AppError> {
    let submitted_experiment = form.mlflow_experiment_id.trim();
    let experiment_id = if submitted_experiment.is_empty() {
        state.settings.default_experiment_id.clone()
    } else {
        if let Err(e) = state.tracker.set_experiment(submitted_experiment).await {
            tracing::warn!(session = %session.id, error = %e, "Error setting MLflow experiment");
            return Err(AppError::InvalidExperiment(submitted_experiment.to_string()));
        }
        Some(submitted_experiment.to_string())
    };

    let llm = state.models.client(model).map_err(|e| {
        tracing::warn!(session = %session.id, model, error = %e, "Error configuring LLM model");
        AppError::ModelConfig(model.to_string())
    })?;
    let router = TranscriptRouter::new(llm, state.tools.clone()).with_max_iters(state.settings.max_iters);

    let run = match experiment_id {
        Some(experiment_id) if state.tracker.is_enabled() => {
            match state.tracker.start_run(&experiment_id).await {
                Ok(run) => Some(run),
                Err(e) => {
                    tracing::warn!(session = %session.id, error = %e, "Could not start tracking run, continuing without one");
                    None
                }
            }
        }
        _ => None,
    };

    let started = Instant::now();
    let input = RouterInput::new(
        form.transcript.clone(),
        Some(form.call_agent_ask.clone()),
        session.state.conversation_history.clone(),
    );
    let outcome = router.route(&input, &ToolContext::new(session.id.clone())).await;

    if let Some(run) = &run {
        finish_run(state, run, &outcome, model, &input, started).await;
    }

    let answer = outcome.map_err(AppError::Processing)?;
    tracing::info!(
        session = %session.id,
        queried_table = %answer.queried_table,
        elapsed_secs = started.elapsed().as_secs_f64(),
        "Transcript processing completed"
    );

    let rendered = render_or_preformatted(state.renderer.as_ref(), &answer.relevant_information);
    session
        .state
        .push_turn(ConversationTurn::new(form.transcript.clone(), rendered.clone(), answer.queried_table));

    if let Some(turn) = session.state.demo_state.record_transcript(&form.transcript) {
        tracing::info!(
            session = %session.id,
            turn = turn.number(),
            current_turn = session.state.demo_state.current_turn,
            "Demo turn processed"
        );
    }

    Ok(rendered)
}

/// Log the request's params and metrics on the run, then close it
async fn finish_run(
    state: &AppState,
    run: &RunHandle,
    outcome: &anyhow::Result<RouterResponse>,
    model: &str,
    input: &RouterInput,
    started: Instant,
) {
    let queried_table = outcome
        .as_ref()
        .map(|answer| answer.queried_table.clone())
        .unwrap_or_default();
    let params = [
        ("llm_model", model.to_string()),
        ("has_call_agent_ask", input.call_agent_ask.is_some().to_string()),
        ("queried_table", queried_table),
    ];
    let metrics = [
        ("latency_seconds", started.elapsed().as_secs_f64()),
        ("transcript_chars", input.transcript.chars().count() as f64),
    ];

    if let Err(e) = state.tracker.log_batch(run, &params, &metrics).await {
        tracing::warn!(run_id = %run.run_id, error = %e, "Failed to log run data");
    }

    let status = if outcome.is_ok() {
        RunStatus::Finished
    } else {
        RunStatus::Failed
    };
    if let Err(e) = state.tracker.end_run(run, status).await {
        tracing::warn!(run_id = %run.run_id, error = %e, "Failed to end tracking run");
    }
}

/// POST /process_audio - Transcribe an uploaded WAV or MP3 file
async fn process_audio(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut multipart = multipart?;
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("audio_file") {
            let filename = field.file_name().unwrap_or_default().to_string();
            // Reject by name before buffering the upload
            let format =
                AudioFormat::from_filename(&filename).ok_or_else(|| AppError::UnsupportedAudio(filename.clone()))?;
            let bytes = field.bytes().await?;
            upload = Some((filename, format, bytes));
            break;
        }
    }

    let (filename, format, bytes) = upload.ok_or(AppError::MissingAudio)?;
    tracing::info!(filename = %filename, bytes = bytes.len(), "Received audio file");

    let transcript = state
        .transcriber
        .transcribe(format, &bytes)
        .await
        .map_err(|e| AppError::Audio(e.into()))?;

    Ok(Json(serde_json::json!({
        "success": true,
        "transcript": transcript,
    })))
}

/// POST /clear_history - Forget processed transcripts
async fn clear_history(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let token = session_token(&headers);
    let session = state.sessions.clear_history(token.as_deref()).await;
    tracing::info!(session = %session.id, "Conversation history cleared");

    with_session_cookie(Json(serde_json::json!({ "success": true })).into_response(), &session)
}

/// Failures surfaced to the browser as `{success: false, error, ...}`
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid MLflow experiment ID: {0}")]
    InvalidExperiment(String),

    #[error("Error configuring LLM model: {0}")]
    ModelConfig(String),

    #[error("An error occurred during processing: {0:#}")]
    Processing(anyhow::Error),

    #[error("No audio file provided")]
    MissingAudio,

    #[error("Error: Received file with unsupported format: {0}. Only WAV or MP3 formats are supported.")]
    UnsupportedAudio(String),

    #[error("Invalid form submission: {0}")]
    Form(#[from] FormRejection),

    #[error("Invalid multipart request: {0}")]
    MultipartRequest(#[from] MultipartRejection),

    #[error("Error reading upload: {0}")]
    Upload(#[from] MultipartError),

    #[error("An error occurred during audio processing: {0:#}")]
    Audio(anyhow::Error),
}

#[derive(Debug, Serialize)]
struct ErrorReply {
    success: bool,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    demo_state: Option<DemoState>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidExperiment(_) | AppError::MissingAudio | AppError::UnsupportedAudio(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Form(rejection) => rejection.status(),
            AppError::MultipartRequest(rejection) => rejection.status(),
            AppError::Upload(err) => err.status(),
            AppError::ModelConfig(_) | AppError::Processing(_) | AppError::Audio(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn user_message(&self, debug: bool) -> Option<String> {
        match self {
            AppError::InvalidExperiment(id) => Some(format!("Please check the MLflow experiment ID: {}", id)),
            AppError::ModelConfig(model) => Some(format!("Failed to configure the selected model: {}", model)),
            AppError::Processing(err) if debug => {
                Some(format!("{} Error details: {:#}", PROCESSING_USER_MESSAGE, err))
            }
            AppError::Processing(_) => Some(PROCESSING_USER_MESSAGE.to_string()),
            _ => None,
        }
    }

    /// Build the JSON error response, optionally carrying the demo state
    pub fn into_reply(self, demo_state: Option<DemoState>, debug: bool) -> Response {
        let status = self.status();
        match &self {
            AppError::Processing(err) | AppError::Audio(err) => {
                tracing::error!(error = ?err, "{}", self);
            }
            _ => tracing::warn!(status = status.as_u16(), "{}", self),
        }

        let body = ErrorReply {
            success: false,
            error: self.to_string(),
            user_message: self.user_message(debug),
            demo_state,
        };
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.into_reply(None, false)
    }
}
