use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use skillmatrix_types::api::{Claims, CreateSkillRequest, SkillResponse};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Query};
use crate::state::{AppState, run_blocking};

#[derive(Debug, Deserialize)]
pub struct SkillQuery {
    pub category: Option<String>,
}

pub async fn list_skills(
    State(state): State<AppState>,
    Query(query): Query<SkillQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<SkillResponse>>, ApiError> {
    let category = query.category.filter(|c| !c.trim().is_empty());
    let rows = run_blocking(&state, move |db| Ok(db.list_skills(category.as_deref())?)).await?;
    Ok(Json(rows.into_iter().map(convert::skill).collect()))
}

pub async fn create_skill(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    Json(req): Json<CreateSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    let category = req.category.trim().to_string();
    if name.is_empty() || category.is_empty() {
        return Err(ApiError::bad_request("name and category are required"));
    }

    let description = req.description;
    let parent_id = req.parent_id.map(|p| p.to_string());
    let row = run_blocking(&state, move |db| {
        if let Some(parent) = &parent_id {
            if db.get_skill(parent)?.is_none() {
                return Err(ApiError::not_found("parent skill"));
            }
        }
        db.create_skill(
            &Uuid::new_v4().to_string(),
            &name,
            &category,
            description.as_deref(),
            parent_id.as_deref(),
        )
        .map_err(|e| ApiError::conflict_or_internal(e, "skill already exists"))
    })
    .await?;

    info!("Skill {} added to catalog", row.name);
    Ok((StatusCode::CREATED, Json(convert::skill(row))))
}
