use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use skillmatrix_db::Database;
use skillmatrix_db::models::{ApplicationRow, JobRow, NewMessage};
use skillmatrix_types::api::{
    ApplicationResponse, ApplyRequest, CandidateSummary, Claims, JobApplicationView, JobRef,
    MyApplicationView, StartConversationRequest, UpdateStatusRequest,
};
use skillmatrix_types::models::{ApplicationStatus, MessageType, NotificationKind};

use crate::companies::require_member;
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::notifications::notify;
use crate::state::{AppState, json_or_default, run_blocking};

pub const DEFAULT_CONVERSATION_OPENER: &str =
    "Thank you for your application. We'd like to discuss this opportunity with you.";

/// Loads an application the caller takes part in, as its candidate or as a
/// member of the hiring company.
pub(crate) fn party_application(db: &Database, application_id: &str, caller: &str) -> Result<ApplicationRow, ApiError> {
    let app = db
        .get_application(application_id)?
        .ok_or_else(|| ApiError::not_found("application"))?;
    if app.candidate_id != caller && !db.is_company_member(&app.company_id, caller)? {
        return Err(ApiError::Forbidden);
    }
    Ok(app)
}

/// Why a job can't take applications right now, if it can't.
pub fn closed_reason(job: &JobRow, now: DateTime<Utc>) -> Option<&'static str> {
    if !job.is_active || job.status != "open" {
        return Some("job is not accepting applications");
    }
    let deadline = job.application_deadline.as_deref().map(convert::time);
    if deadline.is_some_and(|d| d < now) {
        return Some("application deadline has passed");
    }
    None
}

pub async fn apply(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: ApplyRequest = json_or_default(&body)?;
    let cover_letter = req.cover_letter.filter(|c| !c.trim().is_empty());

    let jid = job_id.to_string();
    let uid = claims.sub.to_string();
    let applicant = claims.full_name().unwrap_or(&claims.email).to_string();
    let row = run_blocking(&state, move |db| {
        let job = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        if let Some(reason) = closed_reason(&job, Utc::now()) {
            return Err(ApiError::bad_request(reason));
        }

        let row = db
            .create_application(&Uuid::new_v4().to_string(), &jid, &uid, cover_letter.as_deref())
            .map_err(|e| ApiError::conflict_or_internal(e, "already applied"))?;

        notify(
            db,
            &job.company_owner_id,
            "New application",
            &format!("{} applied to {}", applicant, job.title),
            NotificationKind::Application,
        )?;
        Ok(row)
    })
    .await?;

    info!("Application {} submitted to job {}", row.id, row.job_id);
    Ok((StatusCode::CREATED, Json(convert::application(row))))
}

pub async fn list_job_applications(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<JobApplicationView>>, ApiError> {
    let jid = job_id.to_string();
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| {
        let job = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        require_member(db, &job.company_id, &uid)?;
        Ok(db.list_job_applicants(&jid)?)
    })
    .await?;

    let views = rows
        .into_iter()
        .map(|r| JobApplicationView {
            id: convert::id(&r.id),
            status: convert::variant(&r.status, ApplicationStatus::Pending),
            cover_letter: r.cover_letter,
            applied_at: convert::time(&r.applied_at),
            candidate: CandidateSummary {
                id: convert::id(&r.candidate_id),
                full_name: r.candidate_name,
                email: r.candidate_email,
                skills: r.candidate_skills,
                experience_level: r.candidate_experience_level,
            },
            job: JobRef { id: convert::id(&r.job_id), title: r.job_title },
        })
        .collect();
    Ok(Json(views))
}

pub async fn list_my_applications(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<MyApplicationView>>, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| Ok(db.list_candidate_applications(&uid)?)).await?;

    let views = rows
        .into_iter()
        .map(|r| MyApplicationView {
            id: convert::id(&r.id),
            job_id: convert::id(&r.job_id),
            status: convert::variant(&r.status, ApplicationStatus::Pending),
            applied_at: convert::time(&r.applied_at),
            updated_at: convert::opt_time(r.updated_at.as_deref()),
            job_title: r.job_title,
            company_name: r.company_name,
        })
        .collect();
    Ok(Json(views))
}

pub async fn update_application_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationResponse>, ApiError> {
    let status: ApplicationStatus = req
        .status
        .parse()
        .map_err(|e: skillmatrix_types::models::UnknownVariant| ApiError::bad_request(e.to_string()))?;

    let aid = application_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        let app = db.get_application(&aid)?.ok_or_else(|| ApiError::not_found("application"))?;
        require_member(db, &app.company_id, &uid)?;

        db.update_application_status(&aid, status.as_str())?;
        notify(
            db,
            &app.candidate_id,
            "Application update",
            &format!("Application status changed to {}", status),
            NotificationKind::ApplicationStatus,
        )?;
        db.get_application(&aid)?.ok_or_else(|| ApiError::not_found("application"))
    })
    .await?;

    info!("Application {} moved to {}", row.id, status);
    Ok(Json(convert::application(row)))
}

/// Opens a thread with the applicant, linked to the application.
pub async fn start_conversation(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let req: StartConversationRequest = json_or_default(&body)?;
    let content = req
        .content
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_CONVERSATION_OPENER.to_string());

    let aid = application_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        let app = db.get_application(&aid)?.ok_or_else(|| ApiError::not_found("application"))?;
        require_member(db, &app.company_id, &uid)?;

        let message = db.insert_message(&NewMessage {
            id: &Uuid::new_v4().to_string(),
            sender_id: &uid,
            receiver_id: &app.candidate_id,
            content: &content,
            message_type: MessageType::Text.as_str(),
            application_id: Some(&aid),
            video_call_id: None,
            video_call_duration: None,
        })?;
        notify(
            db,
            &app.candidate_id,
            "New message",
            &format!("{} wants to discuss your application", app.company_name),
            NotificationKind::Message,
        )?;
        Ok(message)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn job(is_active: bool, status: &str, deadline: Option<String>) -> JobRow {
        JobRow {
            id: "j1".into(),
            company_id: "c1".into(),
            company_name: "TechCorp".into(),
            company_owner_id: "owner".into(),
            posted_by: None,
            title: "Dev".into(),
            description: "desc".into(),
            requirements: None,
            location: None,
            employment_type: None,
            experience_level: None,
            salary_min: None,
            salary_max: None,
            remote_allowed: false,
            is_active,
            status: status.into(),
            application_deadline: deadline,
            created_at: "2025-01-01T00:00:00.000Z".into(),
            updated_at: None,
            applicant_count: 0,
        }
    }

    #[test]
    fn only_active_open_jobs_before_deadline_accept() {
        let now = Utc::now();
        assert_eq!(closed_reason(&job(true, "open", None), now), None);
        assert!(closed_reason(&job(false, "open", None), now).is_some());
        assert!(closed_reason(&job(true, "closed", None), now).is_some());

        let past = (now - Duration::days(1)).to_rfc3339();
        assert_eq!(closed_reason(&job(true, "open", Some(past)), now), Some("application deadline has passed"));

        let future = (now + Duration::days(1)).to_rfc3339();
        assert_eq!(closed_reason(&job(true, "open", Some(future)), now), None);
    }
}
