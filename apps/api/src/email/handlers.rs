use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ConfirmationEmailRequest {
    pub email: String,
    pub name: Option<String>,
    pub confirmation_url: String,
}

/// POST /api/v1/email/confirmation
pub async fn handle_send_confirmation(
    State(state): State<AppState>,
    Json(req): Json<ConfirmationEmailRequest>,
) -> Result<StatusCode, AppError> {
    if req.email.trim().is_empty() {
        return Err(AppError::Validation("Recipient email must not be empty".to_string()));
    }
    state
        .mailer
        .send_confirmation(&req.email, req.name.as_deref(), &req.confirmation_url)
        .await?;
    Ok(StatusCode::ACCEPTED)
}
