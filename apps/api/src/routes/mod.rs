pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::conversation::handlers;
use crate::state::AppState;
use crate::transcription::handlers as transcription_handlers;

/// Room for multipart boundaries and the `language` field on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .route("/health", get(health::health_handler))
        // Chat API
        .route("/chat/send", post(handlers::handle_send))
        .route(
            "/chat/conversation/:id",
            get(handlers::handle_get_conversation).delete(handlers::handle_delete_conversation),
        )
        .route("/chat/conversations", get(handlers::handle_list_conversations))
        // Transcription API
        .route(
            "/transcription/transcribe",
            post(transcription_handlers::handle_transcribe)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .with_state(state)
}
