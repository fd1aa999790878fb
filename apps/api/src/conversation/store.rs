//! Transcript Store: in-memory registry of conversations and their turns.
//!
//! One coarse `RwLock` guards the id → conversation map (insert, delete, snapshot).
//! Each conversation guards its own turn list, so appends to different
//! conversations never contend and a reader never sees a half-written turn.
//! Lifetime is the process lifetime; nothing is persisted.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::conversation::models::{Role, Turn};
use crate::conversation::ConversationError;

/// A single conversation: ordered turns plus a gate that serializes sends.
#[derive(Debug)]
pub struct Conversation {
    id: String,
    created_at: DateTime<Utc>,
    turns: RwLock<Vec<Turn>>,
    send_gate: Mutex<()>,
}

impl Conversation {
    fn new(id: String) -> Self {
        Self {
            id,
            created_at: Utc::now(),
            turns: RwLock::new(Vec::new()),
            send_gate: Mutex::new(()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Snapshot of the turns in append order.
    pub async fn turns(&self) -> Vec<Turn> {
        self.turns.read().await.clone()
    }

    /// Appends a turn stamped with the current time, clamped so timestamps
    /// never go backwards within the conversation.
    pub async fn push(&self, role: Role, content: impl Into<String>) -> Turn {
        let mut turns = self.turns.write().await;
        let mut timestamp = Utc::now();
        if let Some(last) = turns.last() {
            if last.timestamp > timestamp {
                timestamp = last.timestamp;
            }
        }

        let turn = Turn {
            role,
            content: content.into(),
            timestamp,
        };
        turns.push(turn.clone());
        turn
    }

    /// Held by the orchestrator for the duration of one send, so two sends on
    /// the same id cannot interleave their history.
    pub async fn lock_sends(&self) -> MutexGuard<'_, ()> {
        self.send_gate.lock().await
    }
}

/// Point-in-time copy of one conversation, used to build summaries.
#[derive(Debug, Clone)]
pub struct ConversationSnapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<Turn>,
}

/// Owner of every conversation in the process.
#[derive(Debug, Default)]
pub struct TranscriptStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves `id` to its conversation, creating it when unknown.
    /// A blank id always creates a fresh conversation under a new random id.
    pub async fn get_or_create(&self, id: &str) -> Arc<Conversation> {
        let id = id.trim();

        if !id.is_empty() {
            if let Some(existing) = self.conversations.read().await.get(id) {
                return Arc::clone(existing);
            }
        }

        let mut conversations = self.conversations.write().await;
        let key = if id.is_empty() {
            Uuid::new_v4().to_string()
        } else {
            id.to_string()
        };

        let conversation = conversations
            .entry(key)
            .or_insert_with_key(|key| {
                debug!(conversation_id = %key, "Creating conversation");
                Arc::new(Conversation::new(key.clone()))
            });
        Arc::clone(conversation)
    }

    /// Appends a turn, creating the conversation if needed.
    #[allow(dead_code)]
    pub async fn append(&self, id: &str, role: Role, content: impl Into<String>) -> Turn {
        let conversation = self.get_or_create(id).await;
        conversation.push(role, content).await
    }

    /// Returns the turns of an existing conversation.
    pub async fn get(&self, id: &str) -> Result<Vec<Turn>, ConversationError> {
        let id = id.trim();
        let conversation = self
            .conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ConversationError::NotFound(id.to_string()))?;
        Ok(conversation.turns().await)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ConversationError> {
        let id = id.trim();
        self.conversations
            .write()
            .await
            .remove(id)
            .map(|_| debug!(conversation_id = %id, "Deleted conversation"))
            .ok_or_else(|| ConversationError::NotFound(id.to_string()))
    }

    /// Snapshots every conversation, oldest first.
    pub async fn list(&self) -> Vec<ConversationSnapshot> {
        let conversations: Vec<Arc<Conversation>> =
            self.conversations.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            snapshots.push(ConversationSnapshot {
                id: conversation.id().to_string(),
                created_at: conversation.created_at(),
                turns: conversation.turns().await,
            });
        }

        snapshots.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        snapshots
    }
}
