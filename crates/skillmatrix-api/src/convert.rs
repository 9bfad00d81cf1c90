//! Row-to-response conversion. Stored ids, timestamps and enum strings are
//! written by this service, so a parse failure means a corrupt row: it is
//! logged and replaced with a neutral value rather than failing the request.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use skillmatrix_db::models::{
    ApplicationRow, CandidateRow, CandidateSkillRow, CompanyRow, EmployeeRow, JobRow, JobSkillRow,
    MessageRow, NotificationRow, ProfileRow, SkillRow, VideoCallRow,
};
use skillmatrix_types::api::{
    ApplicationResponse, CandidateResponse, CandidateSkillResponse, CompanyResponse,
    EmployeeResponse, JobDetail, JobSkillResponse, JobSummary, MessageResponse,
    NotificationResponse, ProfileResponse, SkillResponse, VideoCallResponse,
};
use skillmatrix_types::models::{
    ApplicationStatus, AvailabilityStatus, CallStatus, JobStatus, MessageType, Role,
};

pub(crate) fn id(raw: &str) -> Uuid {
    raw.parse().unwrap_or_else(|_| {
        warn!("Corrupt id in database: {:?}", raw);
        Uuid::nil()
    })
}

pub(crate) fn opt_id(raw: Option<&str>) -> Option<Uuid> {
    raw.map(id)
}

pub(crate) fn time(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| {
            warn!("Corrupt timestamp in database: {:?}", raw);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

pub(crate) fn opt_time(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.map(time)
}

pub(crate) fn variant<E: FromStr>(raw: &str, fallback: E) -> E {
    raw.parse().unwrap_or_else(|_| {
        warn!("Unknown enum value in database: {:?}", raw);
        fallback
    })
}

pub(crate) fn opt_variant<E: FromStr>(raw: Option<&str>) -> Option<E> {
    raw.and_then(|r| match r.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Unknown enum value in database: {:?}", r);
            None
        }
    })
}

pub(crate) fn profile(row: ProfileRow) -> ProfileResponse {
    ProfileResponse {
        id: id(&row.id),
        role: variant(&row.role, Role::Candidate),
        created_at: time(&row.created_at),
        updated_at: opt_time(row.updated_at.as_deref()),
        email: row.email,
        full_name: row.full_name,
        bio: row.bio,
        location: row.location,
        phone: row.phone,
        website: row.website,
        linkedin_url: row.linkedin_url,
        github_url: row.github_url,
        avatar_url: row.avatar_url,
        experience_level: row.experience_level,
        skills: row.skills,
    }
}

pub(crate) fn candidate(row: CandidateRow) -> CandidateResponse {
    CandidateResponse {
        id: id(&row.id),
        experience_years: row.experience_years,
        salary_expectation: row.salary_expectation,
        availability_status: variant(&row.availability_status, AvailabilityStatus::Open),
        preferred_job_type: opt_variant(row.preferred_job_type.as_deref()),
        preferred_location: row.preferred_location,
        remote_preference: row.remote_preference,
        resume_url: row.resume_url,
        portfolio_url: row.portfolio_url,
        created_at: time(&row.created_at),
        updated_at: opt_time(row.updated_at.as_deref()),
    }
}

pub(crate) fn candidate_skill(row: CandidateSkillRow) -> CandidateSkillResponse {
    CandidateSkillResponse {
        skill_id: id(&row.skill_id),
        name: row.name,
        category: row.category,
        proficiency_level: row.proficiency_level,
        years_experience: row.years_experience,
        is_primary: row.is_primary,
    }
}

pub(crate) fn skill(row: SkillRow) -> SkillResponse {
    SkillResponse {
        id: id(&row.id),
        parent_id: opt_id(row.parent_id.as_deref()),
        name: row.name,
        category: row.category,
        description: row.description,
    }
}

pub(crate) fn company(row: CompanyRow) -> CompanyResponse {
    CompanyResponse {
        id: id(&row.id),
        profile_id: id(&row.profile_id),
        created_at: time(&row.created_at),
        company_name: row.company_name,
        description: row.description,
        industry: row.industry,
        company_size: row.company_size,
        website: row.website,
        logo_url: row.logo_url,
        headquarters: row.headquarters,
        founded_year: row.founded_year,
    }
}

pub(crate) fn employee(row: EmployeeRow) -> EmployeeResponse {
    EmployeeResponse {
        id: id(&row.id),
        company_id: id(&row.company_id),
        profile_id: id(&row.profile_id),
        position: row.position,
        created_at: time(&row.created_at),
    }
}

pub(crate) fn job_skill(row: JobSkillRow) -> JobSkillResponse {
    JobSkillResponse {
        skill_id: id(&row.skill_id),
        name: row.name,
        category: row.category,
        is_required: row.is_required,
        required_level: row.required_level,
    }
}

pub(crate) fn job_summary(row: &JobRow, skills: Vec<String>) -> JobSummary {
    JobSummary {
        id: id(&row.id),
        title: row.title.clone(),
        company_id: id(&row.company_id),
        company_name: row.company_name.clone(),
        location: row.location.clone(),
        employment_type: opt_variant(row.employment_type.as_deref()),
        salary_min: row.salary_min,
        salary_max: row.salary_max,
        remote_allowed: row.remote_allowed,
        created_at: time(&row.created_at),
        applicant_count: row.applicant_count.max(0) as usize,
        skills,
    }
}

pub(crate) fn job_detail(row: JobRow, skills: Vec<JobSkillRow>) -> JobDetail {
    JobDetail {
        id: id(&row.id),
        company_id: id(&row.company_id),
        posted_by: opt_id(row.posted_by.as_deref()),
        employment_type: opt_variant(row.employment_type.as_deref()),
        status: variant(&row.status, JobStatus::Open),
        application_deadline: opt_time(row.application_deadline.as_deref()),
        created_at: time(&row.created_at),
        updated_at: opt_time(row.updated_at.as_deref()),
        applicant_count: row.applicant_count.max(0) as usize,
        skills: skills.into_iter().map(job_skill).collect(),
        company_name: row.company_name,
        title: row.title,
        description: row.description,
        requirements: row.requirements,
        location: row.location,
        experience_level: row.experience_level,
        salary_min: row.salary_min,
        salary_max: row.salary_max,
        remote_allowed: row.remote_allowed,
        is_active: row.is_active,
    }
}

pub(crate) fn application(row: ApplicationRow) -> ApplicationResponse {
    ApplicationResponse {
        id: id(&row.id),
        job_id: id(&row.job_id),
        candidate_id: id(&row.candidate_id),
        status: variant(&row.status, ApplicationStatus::Pending),
        applied_at: time(&row.applied_at),
        updated_at: opt_time(row.updated_at.as_deref()),
        cover_letter: row.cover_letter,
    }
}

pub(crate) fn message(row: MessageRow) -> MessageResponse {
    MessageResponse {
        id: id(&row.id),
        sender_id: id(&row.sender_id),
        receiver_id: id(&row.receiver_id),
        message_type: variant(&row.message_type, MessageType::Text),
        application_id: opt_id(row.application_id.as_deref()),
        video_call_id: opt_id(row.video_call_id.as_deref()),
        video_call_duration: row.video_call_duration,
        read_at: opt_time(row.read_at.as_deref()),
        created_at: time(&row.created_at),
        content: row.content,
    }
}

pub(crate) fn video_call(row: VideoCallRow) -> VideoCallResponse {
    let status = variant(&row.status, CallStatus::Scheduled);
    let started_at = opt_time(row.started_at.as_deref());
    let ended_at = opt_time(row.ended_at.as_deref());
    let duration_seconds = match (status, started_at, ended_at) {
        (CallStatus::Ended, Some(start), Some(end)) => Some((end - start).num_seconds().max(0)),
        _ => None,
    };

    VideoCallResponse {
        id: id(&row.id),
        host_id: id(&row.host_id),
        guest_id: id(&row.guest_id),
        application_id: opt_id(row.application_id.as_deref()),
        scheduled_at: opt_time(row.scheduled_at.as_deref()),
        created_at: time(&row.created_at),
        room_id: row.room_id,
        status,
        started_at,
        ended_at,
        duration_seconds,
    }
}

pub(crate) fn notification(row: NotificationRow) -> NotificationResponse {
    NotificationResponse {
        id: id(&row.id),
        kind: opt_variant(row.kind.as_deref()),
        read_at: opt_time(row.read_at.as_deref()),
        created_at: time(&row.created_at),
        title: row.title,
        message: row.message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corrupt_values_fall_back() {
        assert_eq!(id("not-a-uuid"), Uuid::nil());
        assert_eq!(time("yesterday"), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(variant("hired", ApplicationStatus::Pending), ApplicationStatus::Pending);
        assert_eq!(opt_variant::<JobStatus>(Some("archived")), None);
    }

    #[test]
    fn database_timestamps_parse() {
        let t = time("2025-03-04T05:06:07.089Z");
        assert_eq!(t.timestamp_subsec_millis(), 89);
        assert!(opt_time(Some("2025-03-04T05:06:07+00:00")).is_some());
    }
}
