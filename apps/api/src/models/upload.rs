use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata for one stored screenshot. Created only after the object write
/// succeeded; never updated.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UploadedFileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub created_at: DateTime<Utc>,
}
