//! Conversation Orchestrator: one `send` runs the whole turn pipeline.
//!
//! Flow: validate → resolve conversation → append user turn → generate →
//!       strip emphasis → append assistant turn → extract verdict → synthesize.
//!
//! Completion is never stored. It is re-derived from the latest assistant turn,
//! and a conversation stays writable after a verdict.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::conversation::generator::{GenerationError, ResponseGenerator};
use crate::conversation::models::{ConversationSummary, Recommendation, Role, Turn};
use crate::conversation::store::TranscriptStore;
use crate::conversation::verdict::{strip_emphasis, VerdictExtractor};
use crate::conversation::ConversationError;
use crate::speech::{SpeechSynthesizer, SynthesisError};

/// Fixed confidence for phrase-matched verdicts.
const PHRASE_MATCH_CONFIDENCE: f32 = 1.0;

/// Unified result of a successful `send`.
#[derive(Debug, Clone)]
pub struct ChatResult {
    pub reply_text: String,
    pub conversation_id: String,
    pub is_complete: bool,
    pub recommended_career: Option<String>,
    pub recommended_faculty: Option<String>,
    pub audio: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub system_prompt: String,
    pub assistant_name: String,
    pub generation_timeout: Duration,
    pub synthesis_timeout: Duration,
}

pub struct Orchestrator {
    store: Arc<TranscriptStore>,
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    extractor: Arc<dyn VerdictExtractor>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    pub fn new(
        store: Arc<TranscriptStore>,
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        extractor: Arc<dyn VerdictExtractor>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            store,
            generator,
            synthesizer,
            extractor,
            settings,
        }
    }

    /// Runs one student turn through generation, extraction and synthesis.
    ///
    /// On generation failure the user turn stays in history and no assistant
    /// turn is added. On synthesis failure the assistant turn is already in
    /// history but the call still fails.
    pub async fn send(
        &self,
        conversation_id: &str,
        user_text: &str,
    ) -> Result<ChatResult, ConversationError> {
        if user_text.trim().is_empty() {
            return Err(ConversationError::InvalidInput);
        }

        let conversation = self.store.get_or_create(conversation_id).await;
        let conversation_id = conversation.id().to_string();
        let _send_guard = conversation.lock_sends().await;

        let history = conversation.turns().await;
        conversation.push(Role::User, user_text).await;
        info!(
            conversation_id = %conversation_id,
            turns = history.len() + 1,
            "Student message received"
        );

        // Generation
        let generated = match tokio::time::timeout(
            self.settings.generation_timeout,
            self.generator
                .generate(&self.settings.system_prompt, &history, user_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.settings.generation_timeout)),
        };

        let reply_text = generated
            .and_then(|text| {
                let cleaned = strip_emphasis(&text).trim().to_string();
                if cleaned.is_empty() {
                    Err(GenerationError::EmptyOutput)
                } else {
                    Ok(cleaned)
                }
            })
            .map_err(|e| {
                error!(conversation_id = %conversation_id, stage = "generation", "{e}");
                ConversationError::Generation(e)
            })?;

        conversation.push(Role::Assistant, reply_text.as_str()).await;

        let verdict = self.extractor.extract(&reply_text);
        if verdict.complete {
            info!(
                conversation_id = %conversation_id,
                faculty = %verdict.faculty,
                career = %verdict.career,
                "Verdict reached"
            );
        }

        // Synthesis
        let audio = match tokio::time::timeout(
            self.settings.synthesis_timeout,
            self.synthesizer.synthesize(&reply_text),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(SynthesisError::Timeout(self.settings.synthesis_timeout)),
        }
        .map_err(|e| {
            error!(conversation_id = %conversation_id, stage = "synthesis", "{e}");
            ConversationError::Synthesis(e)
        })?;

        let (recommended_faculty, recommended_career) = if verdict.complete {
            (Some(verdict.faculty), Some(verdict.career))
        } else {
            (None, None)
        };

        Ok(ChatResult {
            reply_text,
            conversation_id,
            is_complete: verdict.complete,
            recommended_career,
            recommended_faculty,
            audio,
        })
    }

    /// Ordered turns of an existing conversation.
    pub async fn history(&self, conversation_id: &str) -> Result<Vec<Turn>, ConversationError> {
        self.store.get(conversation_id).await
    }

    pub async fn delete(&self, conversation_id: &str) -> Result<(), ConversationError> {
        self.store.delete(conversation_id).await?;
        info!(conversation_id = %conversation_id, "Conversation deleted");
        Ok(())
    }

    /// One summary per conversation, oldest first.
    pub async fn summaries(&self) -> Vec<ConversationSummary> {
        self.store
            .list()
            .await
            .into_iter()
            .map(|snapshot| {
                let (career_recommendation, completed_at) = self.recommendation_for(&snapshot.turns);
                ConversationSummary {
                    conversation_id: snapshot.id,
                    total_messages: snapshot.turns.len(),
                    career_recommendation,
                    created_at: snapshot.created_at,
                    completed_at,
                }
            })
            .collect()
    }

    /// Derives the verdict from the last turn, if it is an assistant turn.
    fn recommendation_for(
        &self,
        turns: &[Turn],
    ) -> (Option<Recommendation>, Option<DateTime<Utc>>) {
        let Some(last) = turns.last().filter(|t| t.role == Role::Assistant) else {
            return (None, None);
        };

        let verdict = self.extractor.extract(&last.content);
        if !verdict.complete {
            return (None, None);
        }

        let recommendation = Recommendation {
            career: verdict.career,
            faculty: verdict.faculty,
            confidence: PHRASE_MATCH_CONFIDENCE,
            reasoning: format!("Determinado por la {}", self.settings.assistant_name),
        };
        (Some(recommendation), Some(last.timestamp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::verdict::PhraseVerdictExtractor;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted replies and records every history it was given.
    struct ScriptedGenerator {
        replies: Mutex<VecDeque<Result<String, GenerationError>>>,
        seen_history_lens: Mutex<Vec<usize>>,
    }

    impl ScriptedGenerator {
        fn new(replies: Vec<Result<String, GenerationError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen_history_lens: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ResponseGenerator for ScriptedGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            history: &[Turn],
            _user_text: &str,
        ) -> Result<String, GenerationError> {
            self.seen_history_lens.lock().unwrap().push(history.len());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(GenerationError::EmptyOutput))
        }
    }

    struct SlowGenerator;

    #[async_trait]
    impl ResponseGenerator for SlowGenerator {
        async fn generate(
            &self,
            _system_prompt: &str,
            _history: &[Turn],
            _user_text: &str,
        ) -> Result<String, GenerationError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok("demasiado tarde".to_string())
        }
    }

    struct EchoSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for EchoSynthesizer {
        async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
            Ok(text.as_bytes().to_vec())
        }
    }

    struct SlowSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for SlowSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            tokio::time::sleep(Duration::from_secs(600)).await;
            Ok(Vec::new())
        }
    }

    struct BrokenSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for BrokenSynthesizer {
        async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, SynthesisError> {
            Err(SynthesisError::Provider("voice not found".to_string()))
        }
    }

    fn settings() -> OrchestratorSettings {
        OrchestratorSettings {
            system_prompt: "SYS".to_string(),
            assistant_name: "Tortuga Seleccionadora".to_string(),
            generation_timeout: Duration::from_secs(5),
            synthesis_timeout: Duration::from_secs(5),
        }
    }

    fn orchestrator(
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> (Orchestrator, Arc<TranscriptStore>) {
        let store = Arc::new(TranscriptStore::new());
        let orchestrator = Orchestrator::new(
            store.clone(),
            generator,
            synthesizer,
            Arc::new(PhraseVerdictExtractor::new()),
            settings(),
        );
        (orchestrator, store)
    }

    const VERDICT_REPLY: &str = "¡Eres una persona lógica y curiosa! \
        Tú perteneces a la Facultad **FIEC** y a la carrera **Ingeniería en Computación**. ¡Éxitos!";

    #[tokio::test]
    async fn test_send_appends_both_turns_and_returns_audio() {
        let generator = ScriptedGenerator::new(vec![Ok("¡Hola! Soy la *Tortuga*.".to_string())]);
        let (orchestrator, store) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let result = orchestrator.send("", "Hola").await.unwrap();

        assert_eq!(result.reply_text, "¡Hola! Soy la Tortuga.");
        assert!(!result.is_complete);
        assert!(result.recommended_career.is_none());
        assert!(result.recommended_faculty.is_none());
        assert_eq!(result.audio, result.reply_text.as_bytes());

        let turns = store.get(&result.conversation_id).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Hola");
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "¡Hola! Soy la Tortuga.");
    }

    #[tokio::test]
    async fn test_history_excludes_the_new_user_turn() {
        let generator = ScriptedGenerator::new(vec![
            Ok("Pregunta 1".to_string()),
            Ok("Pregunta 2".to_string()),
        ]);
        let (orchestrator, _) = orchestrator(generator.clone(), Arc::new(EchoSynthesizer));

        let first = orchestrator.send("", "Hola").await.unwrap();
        orchestrator
            .send(&first.conversation_id, "Me gustan las matemáticas")
            .await
            .unwrap();

        assert_eq!(*generator.seen_history_lens.lock().unwrap(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_verdict_reply_reports_completion() {
        let generator = ScriptedGenerator::new(vec![Ok(VERDICT_REPLY.to_string())]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let result = orchestrator.send("c1", "Me encanta programar").await.unwrap();

        assert!(result.is_complete);
        assert_eq!(result.recommended_faculty.as_deref(), Some("FIEC"));
        assert_eq!(
            result.recommended_career.as_deref(),
            Some("Ingeniería en Computación")
        );
        assert!(!result.reply_text.contains('*'));
    }

    #[tokio::test]
    async fn test_empty_message_is_invalid_input() {
        let generator = ScriptedGenerator::new(vec![]);
        let (orchestrator, store) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let err = orchestrator.send("c1", "   ").await.unwrap_err();

        assert!(matches!(err, ConversationError::InvalidInput));
        assert!(store.get("c1").await.is_err());
    }

    #[tokio::test]
    async fn test_empty_generation_keeps_user_turn_only() {
        let generator = ScriptedGenerator::new(vec![Err(GenerationError::EmptyOutput)]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(
            err,
            ConversationError::Generation(GenerationError::EmptyOutput)
        ));

        let turns = orchestrator.history("c1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, Role::User);
        assert_eq!(turns[0].content, "Hola");
    }

    #[tokio::test]
    async fn test_emphasis_only_reply_counts_as_empty() {
        let generator = ScriptedGenerator::new(vec![Ok(" **** ".to_string())]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(err, ConversationError::Generation(_)));
        assert_eq!(orchestrator.history("c1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let generator = ScriptedGenerator::new(vec![Err(GenerationError::Provider(
            "401 unauthorized".to_string(),
        ))]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(
            err,
            ConversationError::Generation(GenerationError::Provider(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_timeout_maps_to_generation_failure() {
        let (orchestrator, _) = orchestrator(Arc::new(SlowGenerator), Arc::new(EchoSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(
            err,
            ConversationError::Generation(GenerationError::Timeout(_))
        ));
        assert_eq!(orchestrator.history("c1").await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_synthesis_timeout_maps_to_synthesis_failure() {
        let generator = ScriptedGenerator::new(vec![Ok("¿Qué te apasiona?".to_string())]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(SlowSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(
            err,
            ConversationError::Synthesis(SynthesisError::Timeout(_))
        ));

        let turns = orchestrator.history("c1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
        assert_eq!(turns[1].content, "¿Qué te apasiona?");
    }

    #[tokio::test]
    async fn test_synthesis_failure_keeps_assistant_turn() {
        let generator = ScriptedGenerator::new(vec![Ok("¿Qué te apasiona?".to_string())]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(BrokenSynthesizer));

        let err = orchestrator.send("c1", "Hola").await.unwrap_err();
        assert!(matches!(err, ConversationError::Synthesis(_)));

        let turns = orchestrator.history("c1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[1].role, Role::Assistant);
    }

    #[tokio::test]
    async fn test_conversation_stays_writable_after_verdict() {
        let generator = ScriptedGenerator::new(vec![
            Ok(VERDICT_REPLY.to_string()),
            Ok("¡Con gusto! Hasta pronto.".to_string()),
        ]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        let first = orchestrator.send("c1", "Listo").await.unwrap();
        assert!(first.is_complete);

        let second = orchestrator.send("c1", "¡Gracias!").await.unwrap();
        assert!(!second.is_complete);
        assert_eq!(orchestrator.history("c1").await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_summaries_derive_recommendation_from_last_turn() {
        let generator = ScriptedGenerator::new(vec![
            Ok(VERDICT_REPLY.to_string()),
            Ok("¿Qué materias te gustan?".to_string()),
        ]);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));

        orchestrator.send("done", "Listo").await.unwrap();
        orchestrator.send("open", "Hola").await.unwrap();

        let summaries = orchestrator.summaries().await;
        assert_eq!(summaries.len(), 2);

        let done = summaries.iter().find(|s| s.conversation_id == "done").unwrap();
        let recommendation = done.career_recommendation.as_ref().unwrap();
        assert_eq!(recommendation.faculty, "FIEC");
        assert_eq!(recommendation.career, "Ingeniería en Computación");
        assert_eq!(recommendation.confidence, 1.0);
        assert_eq!(recommendation.reasoning, "Determinado por la Tortuga Seleccionadora");
        assert_eq!(done.total_messages, 2);
        assert!(done.completed_at.is_some());

        let open = summaries.iter().find(|s| s.conversation_id == "open").unwrap();
        assert!(open.career_recommendation.is_none());
        assert!(open.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_summary_ignores_verdict_when_last_turn_is_user() {
        let (orchestrator, store) =
            orchestrator(ScriptedGenerator::new(vec![]), Arc::new(EchoSynthesizer));
        store.append("c1", Role::Assistant, VERDICT_REPLY).await;
        store.append("c1", Role::User, "¿En serio?").await;

        let summaries = orchestrator.summaries().await;
        assert!(summaries[0].career_recommendation.is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_conversation() {
        let (orchestrator, _) =
            orchestrator(ScriptedGenerator::new(vec![]), Arc::new(EchoSynthesizer));
        let err = orchestrator.delete("unknown-id").await.unwrap_err();
        assert!(matches!(err, ConversationError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_concurrent_sends_on_same_id_do_not_interleave() {
        let replies = (0..6).map(|i| Ok(format!("respuesta {i}"))).collect();
        let generator = ScriptedGenerator::new(replies);
        let (orchestrator, _) = orchestrator(generator, Arc::new(EchoSynthesizer));
        let orchestrator = Arc::new(orchestrator);

        let mut handles = Vec::new();
        for i in 0..6 {
            let orchestrator = orchestrator.clone();
            handles.push(tokio::spawn(async move {
                orchestrator.send("shared", &format!("mensaje {i}")).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let turns = orchestrator.history("shared").await.unwrap();
        assert_eq!(turns.len(), 12);
        for pair in turns.chunks(2) {
            assert_eq!(pair[0].role, Role::User);
            assert_eq!(pair[1].role, Role::Assistant);
        }
    }
}
