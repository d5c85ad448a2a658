use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::message::{ChatMessageRow, Role};

/// A new turn to persist. Rows are append-only; nothing ever updates or
/// deletes a chat message.
#[derive(Debug)]
pub struct NewMessage<'a> {
    pub clone_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
    pub message: &'a str,
}

/// The persistence seam of the chat exchange pipeline. Carried in `AppState`
/// as `Arc<dyn MessageStore>` so tests can substitute an in-memory fake.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Single-row insert, returning the stored row including generated fields.
    async fn insert(&self, new: NewMessage<'_>) -> Result<ChatMessageRow, AppError>;

    /// All messages for one (clone, user) pair, ascending by `created_at`.
    async fn list(&self, clone_id: Uuid, user_id: Uuid) -> Result<Vec<ChatMessageRow>, AppError>;
}

/// Postgres-backed message store used in production.
#[derive(Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(&self, new: NewMessage<'_>) -> Result<ChatMessageRow, AppError> {
        Ok(sqlx::query_as::<_, ChatMessageRow>(
            r#"
            INSERT INTO chat_messages (clone_id, user_id, role, message)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(new.clone_id)
        .bind(new.user_id)
        .bind(new.role)
        .bind(new.message)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn list(&self, clone_id: Uuid, user_id: Uuid) -> Result<Vec<ChatMessageRow>, AppError> {
        Ok(sqlx::query_as::<_, ChatMessageRow>(
            r#"
            SELECT * FROM chat_messages
            WHERE clone_id = $1 AND user_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(clone_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }
}
