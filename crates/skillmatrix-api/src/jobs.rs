use std::collections::HashMap;

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::SecondsFormat;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use skillmatrix_db::models::NewJob;
use skillmatrix_types::api::{
    Claims, JobDetail, JobMatch, JobSummary, PostJobRequest, UpdateJobRequest,
};
use skillmatrix_types::models::{EmploymentType, JobStatus};

use crate::companies::{owned_company, require_member};
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::matrix::rank_job_matches;
use crate::state::{AppState, run_blocking};

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 200;
const DEFAULT_REQUIRED_LEVEL: i64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobSort {
    #[default]
    Posted,
    Salary,
    Applicants,
    Title,
}

#[derive(Debug, Default, Deserialize)]
pub struct JobQuery {
    pub search: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub location: Option<String>,
    pub remote: Option<bool>,
    pub skill: Option<String>,
    #[serde(default)]
    pub sort: JobSort,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Filters, sorts and pages job summaries. Input is expected newest first;
/// sorts are stable, so ties keep that order.
pub fn filter_jobs(jobs: Vec<JobSummary>, query: &JobQuery) -> Vec<JobSummary> {
    let search = non_blank(&query.search);
    let location = non_blank(&query.location);
    let skill = non_blank(&query.skill);

    let mut jobs: Vec<JobSummary> = jobs
        .into_iter()
        .filter(|j| search.is_none_or(|s| contains_ci(&j.title, s) || contains_ci(&j.company_name, s)))
        .filter(|j| query.employment_type.is_none_or(|t| j.employment_type == Some(t)))
        .filter(|j| location.is_none_or(|l| j.location.as_deref().is_some_and(|jl| contains_ci(jl, l))))
        .filter(|j| query.remote.is_none_or(|r| j.remote_allowed == r))
        .filter(|j| skill.is_none_or(|s| j.skills.iter().any(|k| k.eq_ignore_ascii_case(s))))
        .collect();

    match query.sort {
        JobSort::Posted => {}
        JobSort::Salary => jobs.sort_by(|a, b| match (a.salary_max, b.salary_max) {
            (Some(x), Some(y)) => y.cmp(&x),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }),
        JobSort::Applicants => jobs.sort_by(|a, b| b.applicant_count.cmp(&a.applicant_count)),
        JobSort::Title => jobs.sort_by_key(|j| j.title.to_lowercase()),
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    jobs.into_iter().skip(query.offset.unwrap_or(0)).take(limit).collect()
}

fn check_salary(min: Option<i64>, max: Option<i64>) -> Result<(), ApiError> {
    if min.is_some_and(|m| m < 0) || max.is_some_and(|m| m < 0) {
        return Err(ApiError::bad_request("salary must not be negative"));
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(ApiError::bad_request("salary_min must not exceed salary_max"));
        }
    }
    Ok(())
}

fn parse_employment_type(raw: Option<&str>) -> Result<(), ApiError> {
    if let Some(kind) = raw {
        kind.parse::<EmploymentType>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }
    Ok(())
}

pub async fn post_job(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PostJobRequest>,
) -> Result<impl IntoResponse, ApiError> {
    for (field, value) in [
        ("title", &req.title),
        ("description", &req.description),
        ("requirements", &req.requirements),
        ("location", &req.location),
    ] {
        if value.trim().is_empty() {
            return Err(ApiError::bad_request(format!("{} is required", field)));
        }
    }
    parse_employment_type(req.employment_type.as_deref())?;
    check_salary(req.salary_min, req.salary_max)?;
    let required_level = req.required_level.unwrap_or(DEFAULT_REQUIRED_LEVEL);
    if !(1..=5).contains(&required_level) {
        return Err(ApiError::bad_request("required_level must be between 1 and 5"));
    }

    let skills = req.skills_required.as_ref().map(|s| s.names()).unwrap_or_default();
    let cid = company_id.to_string();
    let uid = claims.sub.to_string();
    let job_id = Uuid::new_v4().to_string();

    let detail = run_blocking(&state, move |db| {
        owned_company(db, &cid, &uid)?;
        let row = db.insert_job(
            &NewJob {
                id: &job_id,
                company_id: &cid,
                posted_by: &uid,
                title: req.title.trim(),
                description: &req.description,
                requirements: &req.requirements,
                location: req.location.trim(),
                employment_type: req.employment_type.as_deref(),
                experience_level: req.experience_level.as_deref(),
                salary_min: req.salary_min,
                salary_max: req.salary_max,
                remote_allowed: req.remote_allowed.unwrap_or(false),
                application_deadline: req
                    .application_deadline
                    .map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            },
            &skills,
            required_level,
        )?;
        let skills = db.list_job_skills(&[row.id.clone()])?;
        Ok(convert::job_detail(row, skills))
    })
    .await?;

    info!("Job '{}' posted by {} ({} skills)", detail.title, claims.sub, detail.skills.len());
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobQuery>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<Vec<JobSummary>>, ApiError> {
    let (rows, skill_rows) = run_blocking(&state, |db| {
        let rows = db.list_open_jobs()?;
        let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
        let skills = db.list_job_skills(&ids)?;
        Ok((rows, skills))
    })
    .await?;

    let mut skills_by_job: HashMap<String, Vec<String>> = HashMap::new();
    for s in skill_rows.into_iter().filter(|s| s.is_required) {
        skills_by_job.entry(s.job_id).or_default().push(s.name);
    }

    let summaries = rows
        .iter()
        .map(|r| convert::job_summary(r, skills_by_job.remove(&r.id).unwrap_or_default()))
        .collect();

    Ok(Json(filter_jobs(summaries, &query)))
}

pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(_claims): Extension<Claims>,
) -> Result<Json<JobDetail>, ApiError> {
    let jid = job_id.to_string();
    let detail = run_blocking(&state, move |db| {
        let row = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        let skills = db.list_job_skills(&[jid])?;
        Ok(convert::job_detail(row, skills))
    })
    .await?;
    Ok(Json(detail))
}

pub async fn update_job(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateJobRequest>,
) -> Result<Json<JobDetail>, ApiError> {
    for (field, value) in [
        ("title", &req.title),
        ("description", &req.description),
        ("requirements", &req.requirements),
        ("location", &req.location),
    ] {
        if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
            return Err(ApiError::bad_request(format!("{} must not be blank", field)));
        }
    }
    parse_employment_type(req.employment_type.as_deref())?;
    if let Some(status) = &req.status {
        status
            .parse::<JobStatus>()
            .map_err(|e| ApiError::bad_request(e.to_string()))?;
    }

    let jid = job_id.to_string();
    let uid = claims.sub.to_string();
    let detail = run_blocking(&state, move |db| {
        let job = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        if job.company_owner_id != uid {
            return Err(ApiError::Forbidden);
        }
        check_salary(req.salary_min.or(job.salary_min), req.salary_max.or(job.salary_max))?;

        db.update_job(&jid, &req)?;
        let row = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        let skills = db.list_job_skills(&[jid])?;
        Ok(convert::job_detail(row, skills))
    })
    .await?;

    info!("Job {} updated", detail.id);
    Ok(Json(detail))
}

pub async fn job_matches(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<JobMatch>>, ApiError> {
    let jid = job_id.to_string();
    let uid = claims.sub.to_string();
    let (job_skills, candidates, candidate_skills) = run_blocking(&state, move |db| {
        let job = db.get_job(&jid)?.ok_or_else(|| ApiError::not_found("job"))?;
        require_member(db, &job.company_id, &uid)?;
        Ok((
            db.list_job_skills(&[jid])?,
            db.list_candidate_profiles()?,
            db.list_all_candidate_skills()?,
        ))
    })
    .await?;

    Ok(Json(rank_job_matches(&job_skills, &candidates, &candidate_skills)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn summary(title: &str, company: &str, salary_max: Option<i64>, applicants: usize) -> JobSummary {
        JobSummary {
            id: Uuid::new_v4(),
            title: title.into(),
            company_id: Uuid::new_v4(),
            company_name: company.into(),
            location: Some("San Francisco, CA".into()),
            employment_type: Some(EmploymentType::FullTime),
            salary_min: None,
            salary_max,
            remote_allowed: false,
            created_at: Utc::now(),
            applicant_count: applicants,
            skills: vec!["React".into()],
        }
    }

    fn titles(jobs: &[JobSummary]) -> Vec<&str> {
        jobs.iter().map(|j| j.title.as_str()).collect()
    }

    fn sample() -> Vec<JobSummary> {
        let mut remote = summary("Backend Engineer", "DataFlow", None, 5);
        remote.remote_allowed = true;
        remote.location = Some("Remote".into());
        remote.employment_type = Some(EmploymentType::Contract);
        remote.skills = vec!["Python".into(), "AWS".into()];
        vec![
            summary("Senior React Developer", "TechCorp", Some(150_000), 2),
            remote,
            summary("Frontend Lead", "Acme", Some(180_000), 0),
        ]
    }

    #[test]
    fn search_matches_title_or_company() {
        let query = JobQuery { search: Some("techcorp".into()), ..Default::default() };
        assert_eq!(titles(&filter_jobs(sample(), &query)), vec!["Senior React Developer"]);

        let query = JobQuery { search: Some("LEAD".into()), ..Default::default() };
        assert_eq!(titles(&filter_jobs(sample(), &query)), vec!["Frontend Lead"]);
    }

    #[test]
    fn attribute_filters_combine() {
        let query = JobQuery { remote: Some(true), skill: Some("aws".into()), ..Default::default() };
        assert_eq!(titles(&filter_jobs(sample(), &query)), vec!["Backend Engineer"]);

        let query = JobQuery {
            employment_type: Some(EmploymentType::FullTime),
            location: Some("francisco".into()),
            ..Default::default()
        };
        assert_eq!(filter_jobs(sample(), &query).len(), 2);
    }

    #[test]
    fn sorts_and_pages() {
        let by_salary = JobQuery { sort: JobSort::Salary, ..Default::default() };
        assert_eq!(
            titles(&filter_jobs(sample(), &by_salary)),
            vec!["Frontend Lead", "Senior React Developer", "Backend Engineer"]
        );

        let by_applicants = JobQuery { sort: JobSort::Applicants, limit: Some(1), ..Default::default() };
        assert_eq!(titles(&filter_jobs(sample(), &by_applicants)), vec!["Backend Engineer"]);

        let by_title = JobQuery { sort: JobSort::Title, offset: Some(1), ..Default::default() };
        assert_eq!(
            titles(&filter_jobs(sample(), &by_title)),
            vec!["Frontend Lead", "Senior React Developer"]
        );
    }

    #[test]
    fn salary_rules() {
        assert!(check_salary(Some(1), Some(2)).is_ok());
        assert!(check_salary(None, Some(2)).is_ok());
        assert!(check_salary(Some(3), Some(2)).is_err());
        assert!(check_salary(Some(-1), None).is_err());
    }
}
