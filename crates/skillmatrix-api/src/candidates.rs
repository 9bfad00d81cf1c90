use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use skillmatrix_types::api::{
    AddSkillRequest, CandidateRequest, CandidateResponse, CandidateSkillResponse, Claims,
};
use skillmatrix_types::models::{AvailabilityStatus, EmploymentType};

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, json_or_default, run_blocking};

const DEFAULT_PROFICIENCY: i64 = 3;
const DEFAULT_YEARS: i64 = 1;

pub async fn get_my_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CandidateResponse>, ApiError> {
    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| Ok(db.get_candidate(&uid)?)).await?;
    row.map(|r| Json(convert::candidate(r)))
        .ok_or_else(|| ApiError::not_found("candidate profile"))
}

pub async fn create_my_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: CandidateRequest = json_or_default(&body)?;
    validate(&req)?;

    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        if db.get_candidate(&uid)?.is_some() {
            return Err(ApiError::Conflict("candidate profile already exists".into()));
        }
        db.create_candidate(&uid, &req)
            .map_err(|e| ApiError::conflict_or_internal(e, "candidate profile already exists"))
    })
    .await?;

    info!("Candidate profile created for {}", claims.sub);
    Ok((StatusCode::CREATED, Json(convert::candidate(row))))
}

pub async fn update_my_candidate(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CandidateRequest>,
) -> Result<Json<CandidateResponse>, ApiError> {
    validate(&req)?;

    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        if db.update_candidate(&uid, &req)? == 0 {
            return Err(ApiError::not_found("candidate profile"));
        }
        Ok(db.get_candidate(&uid)?)
    })
    .await?;

    row.map(|r| Json(convert::candidate(r)))
        .ok_or_else(|| ApiError::not_found("candidate profile"))
}

pub async fn list_my_skills(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<CandidateSkillResponse>>, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| Ok(db.list_candidate_skills(&uid)?)).await?;
    Ok(Json(rows.into_iter().map(convert::candidate_skill).collect()))
}

pub async fn add_my_skill(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddSkillRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let proficiency = req.proficiency_level.unwrap_or(DEFAULT_PROFICIENCY);
    if !(1..=5).contains(&proficiency) {
        return Err(ApiError::bad_request("proficiency_level must be between 1 and 5"));
    }
    let years = req.years_experience.unwrap_or(DEFAULT_YEARS);
    if years < 0 {
        return Err(ApiError::bad_request("years_experience must not be negative"));
    }
    let name = req.skill_name.as_deref().map(str::trim).filter(|n| !n.is_empty()).map(str::to_string);
    if req.skill_id.is_none() && name.is_none() {
        return Err(ApiError::bad_request("skill_id or skill_name is required"));
    }

    let uid = claims.sub.to_string();
    let is_primary = req.is_primary.unwrap_or(false);
    let skill_id = req.skill_id;
    let skill = run_blocking(&state, move |db| {
        let skill = match (skill_id, name) {
            (Some(id), _) => db.get_skill(&id.to_string())?,
            (None, Some(name)) => db.find_skill_by_name(&name)?,
            (None, None) => None,
        }
        .ok_or_else(|| ApiError::not_found("skill"))?;

        db.add_candidate_skill(
            &Uuid::new_v4().to_string(),
            &uid,
            &skill.id,
            proficiency,
            Some(years),
            is_primary,
        )
        .map_err(|e| ApiError::conflict_or_internal(e, "skill already added"))?;
        Ok(skill)
    })
    .await?;

    info!("Candidate {} added skill {}", claims.sub, skill.name);
    Ok((
        StatusCode::CREATED,
        Json(CandidateSkillResponse {
            skill_id: convert::id(&skill.id),
            name: skill.name,
            category: skill.category,
            proficiency_level: proficiency,
            years_experience: Some(years),
            is_primary,
        }),
    ))
}

pub async fn remove_my_skill(
    State(state): State<AppState>,
    Path(skill_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    let uid = claims.sub.to_string();
    let sid = skill_id.to_string();
    let removed = run_blocking(&state, move |db| Ok(db.remove_candidate_skill(&uid, &sid)?)).await?;
    if removed == 0 {
        return Err(ApiError::not_found("skill"));
    }
    Ok(StatusCode::NO_CONTENT)
}

fn validate(req: &CandidateRequest) -> Result<(), ApiError> {
    if req.experience_years.is_some_and(|y| y < 0) {
        return Err(ApiError::bad_request("experience_years must not be negative"));
    }
    if req.salary_expectation.is_some_and(|s| s < 0) {
        return Err(ApiError::bad_request("salary_expectation must not be negative"));
    }
    if let Some(status) = &req.availability_status {
        status
            .parse::<AvailabilityStatus>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    if let Some(kind) = &req.preferred_job_type {
        kind.parse::<EmploymentType>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_rejects_unknown_enums_and_negatives() {
        assert!(validate(&CandidateRequest::default()).is_ok());

        let bad_status = CandidateRequest { availability_status: Some("busy".into()), ..Default::default() };
        assert!(matches!(validate(&bad_status), Err(ApiError::BadRequest(_))));

        let bad_years = CandidateRequest { experience_years: Some(-1), ..Default::default() };
        assert!(matches!(validate(&bad_years), Err(ApiError::BadRequest(_))));

        let ok = CandidateRequest {
            preferred_job_type: Some("contract".into()),
            availability_status: Some("passive".into()),
            ..Default::default()
        };
        assert!(validate(&ok).is_ok());
    }
}
