use async_trait::async_trait;
use base64::Engine;
use serde_json::{json, Value};
use std::time::Instant;

/// Audio containers the transcription endpoint accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
}

impl AudioFormat {
    /// Detect the format from the upload's filename, ignoring case
    pub fn from_filename(filename: &str) -> Option<Self> {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".wav") {
            Some(AudioFormat::Wav)
        } else if lower.ends_with(".mp3") {
            Some(AudioFormat::Mp3)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mp3 => "mp3",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TranscriptionError {
    #[error("transcription endpoint is not configured")]
    NotConfigured,

    #[error("transcription endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("request to transcription endpoint failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected transcription response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("transcription response has no predictions")]
    MissingPredictions,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, format: AudioFormat, audio: &[u8]) -> Result<String, TranscriptionError>;
}

/// Speech-to-text model behind a serving endpoint's invocations URL
pub struct ServingTranscriber {
    invocations_url: Option<String>,
    token: String,
    client: reqwest::Client,
}

impl ServingTranscriber {
    /// `invocations_url` is `None` when no workspace host is configured
    pub fn new(invocations_url: Option<String>, token: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            invocations_url,
            token: token.into(),
            client,
        }
    }
}

/// Build the dataframe_split payload for one audio clip
pub fn transcription_payload(format: AudioFormat, audio: &[u8]) -> Value {
    let audio_base64 = base64::engine::general_purpose::STANDARD.encode(audio);
    json!({
        "dataframe_split": {
            "columns": ["text", "audio_base64", "image_base64"],
            "data": [[format!("transcribe the {} audio", format.extension()), audio_base64, ""]]
        }
    })
}

/// Pull the transcript out of `predictions.predictions`
pub fn extract_transcript(response: &Value) -> Result<String, TranscriptionError> {
    let predictions = response
        .get("predictions")
        .and_then(|outer| outer.get("predictions"))
        .ok_or(TranscriptionError::MissingPredictions)?;

    let transcript = match predictions {
        Value::String(text) => text.clone(),
        Value::Array(items) => match items.iter().find_map(Value::as_str) {
            Some(first) => first.to_string(),
            None => predictions.to_string(),
        },
        other => other.to_string(),
    };
    Ok(transcript)
}

#[async_trait]
impl Transcriber for ServingTranscriber {
    async fn transcribe(&self, format: AudioFormat, audio: &[u8]) -> Result<String, TranscriptionError> {
        let url = self.invocations_url.as_deref().ok_or(TranscriptionError::NotConfigured)?;

        tracing::info!(format = format.extension(), bytes = audio.len(), "Sending audio for transcription");
        let started = Instant::now();

        let response = self
            .client
            .post(url)
            .bearer_auth(&self.token)
            .json(&transcription_payload(format, audio))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        tracing::info!(elapsed_secs = started.elapsed().as_secs_f64(), status = status.as_u16(), "Transcription finished");

        if !status.is_success() {
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        let body: Value = serde_json::from_str(&text)?;
        extract_transcript(&body)
    }
}
