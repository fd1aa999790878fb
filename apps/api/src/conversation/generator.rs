//! Response Generator boundary: turns the dialogue so far into the next
//! assistant utterance.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

use crate::conversation::models::Turn;
use crate::conversation::prompts::flatten_dialogue;
use crate::llm_client::{LlmClient, LlmError};

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation provider call failed: {0}")]
    Provider(String),

    #[error("generation provider returned no text")]
    EmptyOutput,

    #[error("generation provider did not answer within {0:?}")]
    Timeout(Duration),
}

impl From<LlmError> for GenerationError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::EmptyContent => GenerationError::EmptyOutput,
            other => GenerationError::Provider(other.to_string()),
        }
    }
}

/// Produces the next assistant turn. Never substitutes a default reply:
/// empty output is an error.
///
/// Carried by the orchestrator as `Arc<dyn ResponseGenerator>`.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        user_text: &str,
    ) -> Result<String, GenerationError>;
}

/// Gemini-backed generator: flattens the history into one prompt per call.
pub struct GeminiGenerator {
    llm: LlmClient,
    assistant_name: String,
}

impl GeminiGenerator {
    pub fn new(llm: LlmClient, assistant_name: impl Into<String>) -> Self {
        Self {
            llm,
            assistant_name: assistant_name.into(),
        }
    }
}

#[async_trait]
impl ResponseGenerator for GeminiGenerator {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        user_text: &str,
    ) -> Result<String, GenerationError> {
        let prompt = flatten_dialogue(system_prompt, history, user_text, &self.assistant_name);
        let response = self.llm.call(&prompt).await?;

        match response.text() {
            Some(text) => Ok(text),
            None => {
                warn!(
                    "Gemini returned no text (finish_reason={:?})",
                    response.finish_reason()
                );
                Err(LlmError::EmptyContent.into())
            }
        }
    }
}
