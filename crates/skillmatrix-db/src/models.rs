//! Database row types: these map directly to SQLite rows.
//! Distinct from skillmatrix-types API models to keep the DB layer independent.

#[derive(Debug)]
pub struct ProfileRow {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub avatar_url: Option<String>,
    pub role: String,
    pub experience_level: Option<String>,
    pub skills: Vec<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug)]
pub struct CandidateRow {
    pub id: String,
    pub experience_years: i64,
    pub salary_expectation: Option<i64>,
    pub availability_status: String,
    pub preferred_job_type: Option<String>,
    pub preferred_location: Option<String>,
    pub remote_preference: bool,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Debug)]
pub struct SkillRow {
    pub id: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug)]
pub struct CandidateSkillRow {
    pub candidate_id: String,
    pub skill_id: String,
    pub name: String,
    pub category: String,
    pub proficiency_level: i64,
    pub years_experience: Option<i64>,
    pub is_primary: bool,
}

/// Candidate identity as shown in matrices and match lists.
#[derive(Debug)]
pub struct CandidateProfileRow {
    pub id: String,
    pub full_name: Option<String>,
    pub email: String,
    pub experience_level: Option<String>,
}

#[derive(Debug)]
pub struct CompanyRow {
    pub id: String,
    pub profile_id: String,
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub headquarters: Option<String>,
    pub founded_year: Option<i64>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct EmployeeRow {
    pub id: String,
    pub company_id: String,
    pub profile_id: String,
    pub position: Option<String>,
    pub created_at: String,
}

/// A job joined with its company and applicant count.
#[derive(Debug)]
pub struct JobRow {
    pub id: String,
    pub company_id: String,
    pub company_name: String,
    pub company_owner_id: String,
    pub posted_by: Option<String>,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: bool,
    pub is_active: bool,
    pub status: String,
    pub application_deadline: Option<String>,
    pub created_at: String,
    pub updated_at: Option<String>,
    pub applicant_count: i64,
}

pub struct NewJob<'a> {
    pub id: &'a str,
    pub company_id: &'a str,
    pub posted_by: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub requirements: &'a str,
    pub location: &'a str,
    pub employment_type: Option<&'a str>,
    pub experience_level: Option<&'a str>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: bool,
    pub application_deadline: Option<String>,
}

#[derive(Debug)]
pub struct JobSkillRow {
    pub job_id: String,
    pub skill_id: String,
    pub name: String,
    pub category: String,
    pub is_required: bool,
    pub required_level: Option<i64>,
}

/// An application joined with the job it targets.
#[derive(Debug)]
pub struct ApplicationRow {
    pub id: String,
    pub job_id: String,
    pub candidate_id: String,
    pub cover_letter: Option<String>,
    pub status: String,
    pub applied_at: String,
    pub updated_at: Option<String>,
    pub job_title: String,
    pub company_id: String,
    pub company_name: String,
}

/// An application joined with the applicant's profile.
#[derive(Debug)]
pub struct ApplicantRow {
    pub id: String,
    pub job_id: String,
    pub job_title: String,
    pub status: String,
    pub cover_letter: Option<String>,
    pub applied_at: String,
    pub candidate_id: String,
    pub candidate_name: Option<String>,
    pub candidate_email: String,
    pub candidate_skills: Vec<String>,
    pub candidate_experience_level: Option<String>,
}

#[derive(Debug)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub content: String,
    pub message_type: String,
    pub application_id: Option<String>,
    pub video_call_id: Option<String>,
    pub video_call_duration: Option<i64>,
    pub read_at: Option<String>,
    pub created_at: String,
}

pub struct NewMessage<'a> {
    pub id: &'a str,
    pub sender_id: &'a str,
    pub receiver_id: &'a str,
    pub content: &'a str,
    pub message_type: &'a str,
    pub application_id: Option<&'a str>,
    pub video_call_id: Option<&'a str>,
    pub video_call_duration: Option<i64>,
}

/// A message with both parties' names and, if linked, the job it concerns.
#[derive(Debug)]
pub struct ThreadMessageRow {
    pub message: MessageRow,
    pub sender_name: Option<String>,
    pub sender_email: String,
    pub receiver_name: Option<String>,
    pub receiver_email: String,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
}

#[derive(Debug)]
pub struct VideoCallRow {
    pub id: String,
    pub room_id: String,
    pub host_id: String,
    pub guest_id: String,
    pub application_id: Option<String>,
    pub status: String,
    pub scheduled_at: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlatformCounts {
    pub active_candidates: i64,
    pub open_positions: i64,
    pub interviewed: i64,
    pub pending_calls: i64,
    pub accepted: i64,
    pub rejected: i64,
}
