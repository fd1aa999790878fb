use std::sync::Arc;

use crate::config::Config;
use crate::conversation::orchestrator::Orchestrator;
use crate::transcription::Transcriber;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Owns the transcript store; built once at startup.
    pub orchestrator: Arc<Orchestrator>,
    /// `None` when no transcription key is configured.
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub config: Config,
}
