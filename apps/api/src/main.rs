mod config;
mod conversation;
mod errors;
mod llm_client;
mod routes;
mod speech;
mod state;
mod transcription;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::http::HeaderValue;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::conversation::generator::GeminiGenerator;
use crate::conversation::orchestrator::{Orchestrator, OrchestratorSettings};
use crate::conversation::prompts::SYSTEM_PROMPT;
use crate::conversation::store::TranscriptStore;
use crate::conversation::verdict::PhraseVerdictExtractor;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::speech::archive::AudioArchive;
use crate::speech::google::GoogleTts;
use crate::speech::SpeechService;
use crate::state::AppState;
use crate::transcription::{Transcriber, WhisperClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Turtlector API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let mut llm = LlmClient::new(config.gemini_api_key.clone(), config.gemini_model.clone());
    if let Some(base_url) = &config.gemini_base_url {
        llm = llm.with_base_url(base_url.clone());
        info!("LLM endpoint overridden: {base_url}");
    }
    info!("LLM client initialized (model: {})", llm.model());
    let generator = Arc::new(GeminiGenerator::new(llm, config.assistant_name.clone()));

    // Initialize speech synthesis
    let tts = GoogleTts::new(config.google_tts_api_key.clone(), &config.tts_voice);
    info!("TTS client initialized (voice: {})", tts.voice());
    let archive = AudioArchive::open(&config.audio_output_dir).with_context(|| {
        format!(
            "Failed to prepare audio output directory '{}'",
            config.audio_output_dir
        )
    })?;
    let archived = archive
        .list()
        .await
        .context("Failed to list audio output directory")?;
    info!("{} archived audio file(s) found", archived.len());
    let synthesizer = Arc::new(SpeechService::new(Arc::new(tts), archive));

    // Initialize transcription (optional)
    let transcriber: Option<Arc<dyn Transcriber>> = match &config.openai_api_key {
        Some(key) => {
            info!("Transcription client initialized");
            Some(Arc::new(WhisperClient::new(key.clone())))
        }
        None => {
            warn!("OPENAI_API_KEY not set; /transcription/transcribe will answer 503");
            None
        }
    };

    // Conversation core: one store for the whole process
    let orchestrator = Orchestrator::new(
        Arc::new(TranscriptStore::new()),
        generator,
        synthesizer,
        Arc::new(PhraseVerdictExtractor::new()),
        OrchestratorSettings {
            system_prompt: SYSTEM_PROMPT.to_string(),
            assistant_name: config.assistant_name.clone(),
            generation_timeout: config.generation_timeout,
            synthesis_timeout: config.synthesis_timeout,
        },
    );

    let cors = build_cors(&config.cors_origins)?;

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        transcriber,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Restricts CORS to the configured origins; an empty list is permissive.
fn build_cors(origins: &[String]) -> Result<CorsLayer> {
    if origins.is_empty() {
        return Ok(CorsLayer::permissive());
    }

    let origins = origins
        .iter()
        .map(|origin| {
            origin
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS origin '{origin}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any))
}
