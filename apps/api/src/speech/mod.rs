//! Speech synthesis: text in, MP3 bytes out.
//!
//! `SpeechSynthesizer` is the seam the orchestrator depends on. `SpeechService`
//! implements it by validating input, calling a `TtsProvider` and keeping a
//! numbered copy of every clip in the `AudioArchive`.

pub mod archive;
pub mod google;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::speech::archive::AudioArchive;

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("text to synthesize is empty")]
    EmptyText,

    #[error("synthesis provider call failed: {0}")]
    Provider(String),

    #[error("synthesis provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Converts an utterance into audio bytes.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

/// A network text-to-speech backend. Receives already-validated, trimmed text.
#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError>;
}

pub struct SpeechService {
    provider: Arc<dyn TtsProvider>,
    archive: AudioArchive,
}

impl SpeechService {
    pub fn new(provider: Arc<dyn TtsProvider>, archive: AudioArchive) -> Self {
        Self { provider, archive }
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechService {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let audio = self.provider.synthesize(text).await?;

        // The archive is a debugging trail; losing a copy never fails the reply.
        match self.archive.store(&audio).await {
            Ok(path) => debug!("Saved synthesized audio to {}", path.display()),
            Err(e) => warn!("Failed to archive synthesized audio: {e}"),
        }

        Ok(audio)
    }
}
