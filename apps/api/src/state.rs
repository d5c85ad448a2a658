use std::sync::Arc;

use sqlx::PgPool;

use crate::chat::store::MessageStore;
use crate::chat::ChatSessions;
use crate::email::Mailer;
use crate::inference::InferenceGateway;
use crate::uploads::store::{FileStore, ObjectStore};

/// Shared application state injected into all route handlers via Axum
/// extractors. Gateways are trait objects constructed once at startup;
/// no module-level singletons, so the pipelines stay testable in isolation.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Chat message persistence seam.
    pub messages: Arc<dyn MessageStore>,
    /// Screenshot object-storage seam.
    pub objects: Arc<dyn ObjectStore>,
    /// Uploaded-file metadata seam.
    pub files: Arc<dyn FileStore>,
    /// Clone reply generation seam.
    pub inference: Arc<dyn InferenceGateway>,
    pub mailer: Mailer,
    /// Live chat sessions keyed by (clone, user).
    pub sessions: ChatSessions,
}
