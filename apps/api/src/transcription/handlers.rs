use std::time::Instant;

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::state::AppState;
use crate::transcription::{audio_extension, ALLOWED_EXTENSIONS};

const DEFAULT_LANGUAGE: &str = "es";
/// Language value that asks the provider to detect the language.
const AUTO_LANGUAGE: &str = "auto";

#[derive(Debug, Serialize)]
pub struct TranscriptionResponse {
    pub transcription: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Seconds spent in the handler, provider call included.
    pub processing_time: f64,
}

/// POST /transcription/transcribe
///
/// Multipart form: `file` (audio) and optional `language` (`es` by default, `auto` to detect).
pub async fn handle_transcribe(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<TranscriptionResponse>, AppError> {
    let transcriber = state.transcriber.clone().ok_or_else(|| {
        AppError::ServiceUnavailable("Transcription is not configured".to_string())
    })?;

    let started = Instant::now();
    let mut upload: Option<(String, Bytes)> = None;
    let mut language = DEFAULT_LANGUAGE.to_string();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                upload = Some((file_name, data));
            }
            "language" => {
                let value = field.text().await.map_err(multipart_error)?;
                if !value.trim().is_empty() {
                    language = value.trim().to_string();
                }
            }
            _ => {}
        }
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;

    if audio_extension(&file_name).is_none() {
        return Err(AppError::Validation(format!(
            "Unsupported audio format. Allowed: {}",
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    let max_bytes = state.config.max_upload_bytes;
    if data.len() > max_bytes {
        return Err(AppError::PayloadTooLarge(format!(
            "File too large. Maximum allowed: {:.1}MB",
            max_bytes as f64 / 1024.0 / 1024.0
        )));
    }

    let language = (language != AUTO_LANGUAGE).then_some(language);
    let transcript = transcriber
        .transcribe(&file_name, data, language.as_deref())
        .await
        .map_err(|e| AppError::Transcription(e.to_string()))?;

    let processing_time = started.elapsed().as_secs_f64();
    info!("Transcribed '{file_name}' in {processing_time:.2}s");

    Ok(Json(TranscriptionResponse {
        transcription: transcript.text,
        language: transcript.language,
        duration: transcript.duration,
        processing_time,
    }))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::Validation(err.body_text())
    }
}
