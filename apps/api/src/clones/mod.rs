//! Clone directory — loads and creates clone records scoped to one user.
//!
//! Every create is followed by a full re-list rather than an in-place append:
//! a simpler consistency model at the cost of one extra round trip.

pub mod handlers;

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::clone::{CloneRow, TrainingStatus};

/// Fields for a new clone. `uploaded_image_count` is only present on the
/// enhanced creation path, where screenshots were uploaded first and the
/// clone starts out chat-ready.
#[derive(Debug)]
pub struct NewClone<'a> {
    pub name: &'a str,
    pub personality_description: Option<&'a str>,
    pub uploaded_image_count: Option<i32>,
}

/// All clones owned by `user_id`, newest first.
pub async fn list_clones(pool: &PgPool, user_id: Uuid) -> Result<Vec<CloneRow>, AppError> {
    Ok(sqlx::query_as::<_, CloneRow>(
        "SELECT * FROM ai_clones WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?)
}

/// One clone by id, scoped to its owner. A clone belonging to another user
/// is indistinguishable from a missing one.
pub async fn get_clone(pool: &PgPool, clone_id: Uuid, user_id: Uuid) -> Result<CloneRow, AppError> {
    sqlx::query_as::<_, CloneRow>("SELECT * FROM ai_clones WHERE id = $1 AND user_id = $2")
        .bind(clone_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Clone {clone_id} not found")))
}

/// Creates a clone. Plain creation starts in `pending` training status;
/// creation with an uploaded image count starts `completed` with a derived
/// accuracy score. A single insert, atomic at the gateway — no rollback path.
pub async fn create_clone(
    pool: &PgPool,
    user_id: Uuid,
    new: NewClone<'_>,
) -> Result<CloneRow, AppError> {
    validate_clone_name(new.name)?;

    let (status, accuracy, image_count) = match new.uploaded_image_count {
        Some(count) => (TrainingStatus::Completed, accuracy_score(count), count),
        None => (TrainingStatus::Pending, 0, 0),
    };

    let row = sqlx::query_as::<_, CloneRow>(
        r#"
        INSERT INTO ai_clones
            (user_id, name, personality_description, training_status,
             accuracy_score, uploaded_image_count)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(new.name.trim())
    .bind(new.personality_description)
    .bind(status)
    .bind(accuracy)
    .bind(image_count)
    .fetch_one(pool)
    .await?;

    info!("Created clone {} for user {user_id}", row.id);
    Ok(row)
}

pub fn validate_clone_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Clone name must not be empty".to_string()));
    }
    Ok(())
}

/// Accuracy heuristic for the enhanced creation path: 60 base points plus 2
/// per uploaded screenshot, capped at 95.
pub fn accuracy_score(uploaded_images: i32) -> i32 {
    (60 + uploaded_images * 2).clamp(60, 95)
}
