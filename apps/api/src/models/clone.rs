use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Training lifecycle of a clone. Chat is only enabled once training
/// has completed; the transition itself happens outside the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TrainingStatus {
    Pending,
    Completed,
}

/// One AI clone, owned exclusively by the user who created it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CloneRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub personality_description: Option<String>,
    pub avatar_url: Option<String>,
    pub training_status: TrainingStatus,
    /// Informational only; set at creation, never recomputed by the core.
    pub accuracy_score: i32,
    pub uploaded_image_count: i32,
    pub message_count: i32,
    pub last_active: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CloneRow {
    pub fn is_chat_ready(&self) -> bool {
        self.training_status == TrainingStatus::Completed
    }
}
