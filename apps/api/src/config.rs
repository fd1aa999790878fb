use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_CORS_ORIGINS: &str =
    "http://localhost:3000,http://localhost:5173,http://frontend,http://localhost";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Overrides the Gemini endpoint (proxies, local mocks).
    pub gemini_base_url: Option<String>,
    pub google_tts_api_key: String,
    /// Whisper transcription is disabled when unset.
    pub openai_api_key: Option<String>,
    /// Label for assistant turns in the flattened prompt.
    pub assistant_name: String,
    pub tts_voice: String,
    pub audio_output_dir: String,
    pub generation_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Empty means permissive CORS.
    pub cors_origins: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_model: env_or("GEMINI_MODEL", "gemini-2.5-flash"),
            gemini_base_url: optional_env("GEMINI_BASE_URL"),
            google_tts_api_key: require_env("GOOGLE_TTS_API_KEY")?,
            openai_api_key: optional_env("OPENAI_API_KEY"),
            assistant_name: env_or("ASSISTANT_NAME", "Tortuga Seleccionadora"),
            tts_voice: env_or("TTS_VOICE", "es-US-Neural2-B"),
            audio_output_dir: env_or("AUDIO_OUTPUT_DIR", "uploads/respuestas"),
            generation_timeout: Duration::from_secs(parse_env("GENERATION_TIMEOUT_SECS", 60)?),
            synthesis_timeout: Duration::from_secs(parse_env("SYNTHESIS_TIMEOUT_SECS", 30)?),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            cors_origins: parse_origins(&env_or("CORS_ORIGINS", DEFAULT_CORS_ORIGINS)),
            port: parse_env("PORT", 8000)?,
            rust_log: env_or("RUST_LOG", "info"),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank both mean "not configured".
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} must be a valid number, got '{raw}'")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated origin list. A lone `*` yields an empty list (permissive).
fn parse_origins(raw: &str) -> Vec<String> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect();

    if origins.iter().any(|origin| origin == "*") {
        Vec::new()
    } else {
        origins
    }
}
