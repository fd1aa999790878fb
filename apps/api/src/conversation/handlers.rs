//! Axum route handlers for the Chat API.

use axum::{
    extract::{Path, State},
    Json,
};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::conversation::models::{ConversationSummary, Turn};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
    /// Empty or missing starts a new conversation.
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub response: String,
    pub conversation_id: String,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_career: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommended_faculty: Option<String>,
    /// MP3 bytes of `response`, base64-encoded.
    pub audio_base64: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /chat/send
///
/// Sends a student message and returns the assistant reply with its audio.
pub async fn handle_send(
    State(state): State<AppState>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, AppError> {
    let conversation_id = request.conversation_id.unwrap_or_default();

    let result = state
        .orchestrator
        .send(&conversation_id, &request.message)
        .await?;

    Ok(Json(SendMessageResponse {
        response: result.reply_text,
        conversation_id: result.conversation_id,
        is_complete: result.is_complete,
        recommended_career: result.recommended_career,
        recommended_faculty: result.recommended_faculty,
        audio_base64: base64::engine::general_purpose::STANDARD.encode(&result.audio),
    }))
}

/// GET /chat/conversation/:id
pub async fn handle_get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<Turn>>, AppError> {
    let turns = state.orchestrator.history(&conversation_id).await?;
    Ok(Json(turns))
}

/// DELETE /chat/conversation/:id
pub async fn handle_delete_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.orchestrator.delete(&conversation_id).await?;
    Ok(Json(json!({ "message": "Conversation deleted" })))
}

/// GET /chat/conversations
pub async fn handle_list_conversations(
    State(state): State<AppState>,
) -> Json<Vec<ConversationSummary>> {
    Json(state.orchestrator.summaries().await)
}
