use axum::{Extension, extract::State};
use uuid::Uuid;

use skillmatrix_types::api::{Claims, ProfileResponse, UpdateProfileRequest};
use skillmatrix_types::models::Role;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, run_blocking};

pub async fn get_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    fetch_profile(&state, claims.sub).await.map(Json)
}

pub async fn get_profile(
    State(state): State<AppState>,
    Path(profile_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<ProfileResponse>, ApiError> {
    fetch_profile(&state, profile_id).await.map(Json)
}

pub async fn update_my_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, ApiError> {
    if let Some(role) = &req.role {
        role.parse::<Role>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let uid = claims.sub.to_string();
    run_blocking(&state, move |db| {
        db.update_profile(&uid, &req)?;
        Ok(())
    })
    .await?;

    fetch_profile(&state, claims.sub).await.map(Json)
}

async fn fetch_profile(state: &AppState, profile_id: Uuid) -> Result<ProfileResponse, ApiError> {
    let pid = profile_id.to_string();
    let row = run_blocking(state, move |db| Ok(db.get_profile(&pid)?)).await?;
    row.map(convert::profile).ok_or_else(|| ApiError::not_found("profile"))
}
