pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::chat::handlers as chat_handlers;
use crate::clones::handlers as clone_handlers;
use crate::email::handlers as email_handlers;
use crate::state::AppState;
use crate::uploads::handlers as upload_handlers;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Clone directory
        .route(
            "/api/v1/clones",
            get(clone_handlers::handle_list_clones).post(clone_handlers::handle_create_clone),
        )
        // Chat exchange pipeline
        .route(
            "/api/v1/clones/:id/chat",
            get(chat_handlers::handle_load_chat).post(chat_handlers::handle_send_message),
        )
        // Screenshot uploads
        .route("/api/v1/uploads", post(upload_handlers::handle_upload))
        // Confirmation email
        .route(
            "/api/v1/email/confirmation",
            post(email_handlers::handle_send_confirmation),
        )
        .with_state(state)
}
