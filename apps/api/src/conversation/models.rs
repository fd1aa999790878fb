use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One immutable utterance in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// Terminal faculty + career verdict derived from an assistant turn.
/// Never stored on its own; recomputed from the turn it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub career: String,
    pub faculty: String,
    /// Phrase matching carries no partial signal, so this is always 1.0.
    pub confidence: f32,
    pub reasoning: String,
}

/// Read-only projection of a conversation for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSummary {
    pub conversation_id: String,
    pub total_messages: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_recommendation: Option<Recommendation>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}
