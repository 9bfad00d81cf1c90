use std::collections::HashMap;

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Duration, Utc};
use tracing::info;
use uuid::Uuid;

use skillmatrix_db::Database;
use skillmatrix_db::models::CompanyRow;
use skillmatrix_types::api::{
    AddEmployeeRequest, Claims, CompanyDashboard, CompanyResponse, CompanyStats,
    CreateCompanyRequest, DashboardApplication, DashboardJob, EmployeeResponse,
    UpdateCompanyRequest,
};
use skillmatrix_types::models::ApplicationStatus;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::state::{AppState, run_blocking};

/// Loads a company the caller owns: 404 if it doesn't exist, 403 if someone
/// else owns it.
pub(crate) fn owned_company(db: &Database, company_id: &str, caller: &str) -> Result<CompanyRow, ApiError> {
    let company = db
        .get_company(company_id)?
        .ok_or_else(|| ApiError::not_found("company"))?;
    if company.profile_id != caller {
        return Err(ApiError::Forbidden);
    }
    Ok(company)
}

pub(crate) fn require_member(db: &Database, company_id: &str, caller: &str) -> Result<(), ApiError> {
    if db.is_company_member(company_id, caller)? {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

pub async fn create_company(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCompanyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.company_name.trim().is_empty() {
        return Err(ApiError::bad_request("company_name is required"));
    }

    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        if db.company_owned_by(&uid)?.is_some() {
            return Err(ApiError::Conflict("you already own a company".into()));
        }
        db.create_company(&Uuid::new_v4().to_string(), &uid, &req)
            .map_err(|e| ApiError::conflict_or_internal(e, "you already own a company"))
    })
    .await?;

    info!("Company {} created by {}", row.company_name, claims.sub);
    Ok((StatusCode::CREATED, Json(convert::company(row))))
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateCompanyRequest>,
) -> Result<Json<CompanyResponse>, ApiError> {
    if req.company_name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("company_name must not be blank"));
    }

    let cid = company_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        owned_company(db, &cid, &uid)?;
        db.update_company(&cid, &req)?;
        db.get_company(&cid)?.ok_or_else(|| ApiError::not_found("company"))
    })
    .await?;

    Ok(Json(convert::company(row)))
}

pub async fn add_employee(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<AddEmployeeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let cid = company_id.to_string();
    let uid = claims.sub.to_string();
    let row = run_blocking(&state, move |db| {
        owned_company(db, &cid, &uid)?;
        let pid = req.profile_id.to_string();
        if !db.profile_exists(&pid)? {
            return Err(ApiError::not_found("profile"));
        }
        db.add_employee(&Uuid::new_v4().to_string(), &cid, &pid, req.position.as_deref())
            .map_err(|e| ApiError::conflict_or_internal(e, "already an employee"))
    })
    .await?;

    info!("Profile {} joined company {}", row.profile_id, row.company_id);
    Ok((StatusCode::CREATED, Json::<EmployeeResponse>(convert::employee(row))))
}

/// The caller's company, as owner if they own one and otherwise as an
/// employee, with its jobs and their applications.
pub async fn company_dashboard(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<CompanyDashboard>, ApiError> {
    let uid = claims.sub.to_string();
    let (company, is_owner, jobs, applicants) = run_blocking(&state, move |db| {
        let (company, is_owner) = match db.company_owned_by(&uid)? {
            Some(c) => (c, true),
            None => match db.company_employing(&uid)? {
                Some(c) => (c, false),
                None => return Err(ApiError::not_found("company")),
            },
        };
        let jobs = db.list_company_jobs(&company.id)?;
        let applicants = db.list_company_applicants(&company.id)?;
        Ok((company, is_owner, jobs, applicants))
    })
    .await?;

    let mut by_job: HashMap<String, Vec<DashboardApplication>> = HashMap::new();
    for a in applicants {
        by_job.entry(a.job_id).or_default().push(DashboardApplication {
            id: convert::id(&a.id),
            status: convert::variant(&a.status, ApplicationStatus::Pending),
            candidate_name: a.candidate_name,
            candidate_email: a.candidate_email,
        });
    }

    let jobs: Vec<DashboardJob> = jobs
        .into_iter()
        .map(|j| {
            let applications = by_job.remove(&j.id).unwrap_or_default();
            DashboardJob {
                id: convert::id(&j.id),
                employment_type: convert::opt_variant(j.employment_type.as_deref()),
                created_at: convert::time(&j.created_at),
                application_count: applications.len(),
                title: j.title,
                location: j.location,
                is_active: j.is_active,
                applications,
            }
        })
        .collect();

    let stats = company_stats(&jobs, Utc::now());
    Ok(Json(CompanyDashboard {
        company: convert::company(company),
        is_owner,
        jobs,
        stats,
    }))
}

/// Counts for the dashboard header. "New this week" counts applications to
/// jobs posted in the last seven days.
pub fn company_stats(jobs: &[DashboardJob], now: DateTime<Utc>) -> CompanyStats {
    let week_ago = now - Duration::days(7);
    CompanyStats {
        active_jobs: jobs.iter().filter(|j| j.is_active).count(),
        total_applications: jobs.iter().map(|j| j.application_count).sum(),
        new_this_week: jobs
            .iter()
            .filter(|j| j.created_at > week_ago)
            .map(|j| j.application_count)
            .sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(active: bool, days_old: i64, applications: usize, now: DateTime<Utc>) -> DashboardJob {
        DashboardJob {
            id: Uuid::new_v4(),
            title: "Job".into(),
            location: None,
            employment_type: None,
            is_active: active,
            created_at: now - Duration::days(days_old),
            application_count: applications,
            applications: vec![],
        }
    }

    #[test]
    fn stats_split_recent_jobs() {
        let now = Utc::now();
        let jobs = vec![job(true, 1, 3, now), job(false, 10, 4, now), job(true, 6, 2, now)];
        assert_eq!(
            company_stats(&jobs, now),
            CompanyStats { active_jobs: 2, total_applications: 9, new_this_week: 5 }
        );
        assert_eq!(company_stats(&[], now), CompanyStats::default());
    }
}
