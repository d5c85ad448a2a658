use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clones::{create_clone, list_clones, NewClone};
use crate::errors::AppError;
use crate::models::clone::CloneRow;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Serialize)]
pub struct CloneListResponse {
    pub clones: Vec<CloneRow>,
}

#[derive(Deserialize)]
pub struct CreateCloneRequest {
    pub user_id: Uuid,
    pub name: String,
    pub personality_description: Option<String>,
    pub uploaded_image_count: Option<i32>,
}

#[derive(Serialize)]
pub struct CreateCloneResponse {
    pub clone: CloneRow,
    /// Refreshed list so the caller observes the new row without a second
    /// request (create always re-lists).
    pub clones: Vec<CloneRow>,
}

/// GET /api/v1/clones
pub async fn handle_list_clones(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CloneListResponse>, AppError> {
    let clones = list_clones(&state.db, params.user_id).await?;
    Ok(Json(CloneListResponse { clones }))
}

/// POST /api/v1/clones
pub async fn handle_create_clone(
    State(state): State<AppState>,
    Json(req): Json<CreateCloneRequest>,
) -> Result<Json<CreateCloneResponse>, AppError> {
    let created = create_clone(
        &state.db,
        req.user_id,
        NewClone {
            name: &req.name,
            personality_description: req.personality_description.as_deref(),
            uploaded_image_count: req.uploaded_image_count,
        },
    )
    .await?;
    let clones = list_clones(&state.db, req.user_id).await?;
    Ok(Json(CreateCloneResponse {
        clone: created,
        clones,
    }))
}
