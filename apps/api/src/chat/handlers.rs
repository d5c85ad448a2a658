use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::SendOutcome;
use crate::clones::get_clone;
use crate::errors::AppError;
use crate::models::message::ChatMessageRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct TranscriptResponse {
    pub messages: Vec<ChatMessageRow>,
    pub pending: bool,
}

#[derive(Deserialize)]
pub struct SendMessageRequest {
    pub user_id: Uuid,
    pub message: String,
}

/// GET /api/v1/clones/:id/chat
///
/// Opens (or resumes) the chat session for this clone and replaces its
/// transcript with the persisted history.
pub async fn handle_load_chat(
    State(state): State<AppState>,
    Path(clone_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<TranscriptResponse>, AppError> {
    // Ownership check; a foreign clone reads as not found.
    let clone = get_clone(&state.db, clone_id, params.user_id).await?;
    if !clone.is_chat_ready() {
        return Err(AppError::Validation(
            "Clone is still training and cannot chat yet".to_string(),
        ));
    }

    let session = state.sessions.get_or_create(clone_id, params.user_id).await;
    let messages = session.load(state.messages.as_ref()).await?;
    Ok(Json(TranscriptResponse {
        messages,
        pending: session.is_pending(),
    }))
}

/// POST /api/v1/clones/:id/chat
///
/// Runs one exchange through the pipeline. Clones that have not finished
/// training are not chat-eligible.
pub async fn handle_send_message(
    State(state): State<AppState>,
    Path(clone_id): Path<Uuid>,
    Json(req): Json<SendMessageRequest>,
) -> Result<Json<SendOutcome>, AppError> {
    let clone = get_clone(&state.db, clone_id, req.user_id).await?;
    if !clone.is_chat_ready() {
        return Err(AppError::Validation(
            "Clone is still training and cannot chat yet".to_string(),
        ));
    }

    let session = state.sessions.get_or_create(clone_id, req.user_id).await;
    let outcome = session
        .send(
            state.messages.as_ref(),
            state.inference.as_ref(),
            &clone,
            &req.message,
        )
        .await?;
    Ok(Json(outcome))
}
