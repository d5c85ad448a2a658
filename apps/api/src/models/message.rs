use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One turn in a conversation. Immutable once written; transcripts are
/// ordered by `created_at` ascending.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ChatMessageRow {
    pub id: Uuid,
    pub clone_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessageRow {
    /// Synthesizes a local (not yet persisted) turn with a client-generated
    /// id and timestamp, for optimistic display before the write confirms.
    pub fn local(clone_id: Uuid, user_id: Uuid, role: Role, message: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            clone_id,
            user_id,
            role,
            message: message.to_string(),
            created_at: Utc::now(),
        }
    }
}
