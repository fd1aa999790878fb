// Audio transcription: student speech → text, via OpenAI Whisper.
// Uploads are forwarded from memory; nothing is written to disk.

pub mod handlers;

use std::path::Path;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const OPENAI_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";
const WHISPER_MODEL: &str = "whisper-1";
const HTTP_TIMEOUT_SECS: u64 = 120;

/// Lower-case extensions the provider accepts.
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "ogg", "flac", "webm", "mp4"];

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
}

/// Provider output.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

#[async_trait]
pub trait Transcriber: Send + Sync {
    /// `language: None` lets the provider detect it.
    async fn transcribe(
        &self,
        file_name: &str,
        audio: Bytes,
        language: Option<&str>,
    ) -> Result<Transcript, TranscriptionError>;
}

/// Lower-cased extension of `file_name` if it is an accepted audio format.
pub fn audio_extension(file_name: &str) -> Option<String> {
    let extension = Path::new(file_name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS
        .contains(&extension.as_str())
        .then_some(extension)
}

#[derive(Clone)]
pub struct WhisperClient {
    client: Client,
    api_key: String,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
                .build()
                .expect("Failed to build HTTP client"),
            api_key,
        }
    }
}

#[async_trait]
impl Transcriber for WhisperClient {
    async fn transcribe(
        &self,
        file_name: &str,
        audio: Bytes,
        language: Option<&str>,
    ) -> Result<Transcript, TranscriptionError> {
        let mut form = Form::new()
            .part("file", Part::bytes(audio.to_vec()).file_name(file_name.to_string()))
            .text("model", WHISPER_MODEL)
            .text("response_format", "verbose_json");
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        let response = self
            .client
            .post(OPENAI_TRANSCRIPTIONS_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let transcript: Transcript = response.json().await?;
        debug!(
            "Transcribed '{}' ({} chars, language={:?})",
            file_name,
            transcript.text.len(),
            transcript.language
        );
        Ok(transcript)
    }
}
