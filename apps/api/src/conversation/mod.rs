// Conversation core: transcript store, verdict extraction, prompt flattening
// and the orchestrator that drives generation → extraction → synthesis.
// Provider calls go through the ResponseGenerator / SpeechSynthesizer seams only.

pub mod generator;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod prompts;
pub mod store;
pub mod verdict;

use thiserror::Error;

use crate::conversation::generator::GenerationError;
use crate::speech::SynthesisError;

/// Failure kinds surfaced by the conversation core.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("message cannot be empty")]
    InvalidInput,

    #[error("conversation {0} not found")]
    NotFound(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),
}
