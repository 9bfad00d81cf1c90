use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    ApplicationStatus, AvailabilityStatus, CallStatus, EmploymentType, JobStatus, MessageType,
    NotificationKind, Role,
};

// -- JWT Claims --

/// Claims carried by access tokens from the identity provider. Only the
/// fields the service reads are modelled; anything else in the token is
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<UserMetadata>,
    pub exp: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default)]
    pub full_name: Option<String>,
}

impl Claims {
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .as_ref()
            .and_then(|m| m.full_name.as_deref())
            .filter(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// -- Profiles --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub experience_level: Option<String>,
    pub skills: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Option<String>,
    pub experience_level: Option<String>,
    pub skills: Option<Vec<String>>,
}

// -- Candidates --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: Uuid,
    pub experience_years: i64,
    pub salary_expectation: Option<i64>,
    pub availability_status: AvailabilityStatus,
    pub preferred_job_type: Option<EmploymentType>,
    pub preferred_location: Option<String>,
    pub remote_preference: bool,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Body for both creating and updating the caller's candidate profile.
/// On create, absent fields take the defaults; on update they are left alone.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CandidateRequest {
    pub experience_years: Option<i64>,
    pub salary_expectation: Option<i64>,
    pub availability_status: Option<String>,
    pub preferred_job_type: Option<String>,
    pub preferred_location: Option<String>,
    pub remote_preference: Option<bool>,
    pub resume_url: Option<String>,
    pub portfolio_url: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddSkillRequest {
    pub skill_id: Option<Uuid>,
    pub skill_name: Option<String>,
    pub proficiency_level: Option<i64>,
    pub years_experience: Option<i64>,
    pub is_primary: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSkillResponse {
    pub skill_id: Uuid,
    pub name: String,
    pub category: String,
    pub proficiency_level: i64,
    pub years_experience: Option<i64>,
    pub is_primary: bool,
}

// -- Skills --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResponse {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateSkillRequest {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
}

// -- Companies --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCompanyRequest {
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub headquarters: Option<String>,
    pub founded_year: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCompanyRequest {
    pub company_name: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub headquarters: Option<String>,
    pub founded_year: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyResponse {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub company_size: Option<String>,
    pub website: Option<String>,
    pub logo_url: Option<String>,
    pub headquarters: Option<String>,
    pub founded_year: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddEmployeeRequest {
    pub profile_id: Uuid,
    pub position: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeResponse {
    pub id: Uuid,
    pub company_id: Uuid,
    pub profile_id: Uuid,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyDashboard {
    pub company: CompanyResponse,
    pub is_owner: bool,
    pub jobs: Vec<DashboardJob>,
    pub stats: CompanyStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardJob {
    pub id: Uuid,
    pub title: String,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub application_count: usize,
    pub applications: Vec<DashboardApplication>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardApplication {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub candidate_name: Option<String>,
    pub candidate_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyStats {
    pub active_jobs: usize,
    pub total_applications: usize,
    pub new_this_week: usize,
}

// -- Jobs --

/// Required skills as submitted by a job form: either a JSON list or the
/// comma-separated text field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SkillList {
    List(Vec<String>),
    Csv(String),
}

impl SkillList {
    /// Trimmed, non-empty skill names, deduplicated case-insensitively in
    /// first-seen order.
    pub fn names(&self) -> Vec<String> {
        let raw: Vec<&str> = match self {
            SkillList::List(items) => items.iter().map(String::as_str).collect(),
            SkillList::Csv(text) => text.split(',').collect(),
        };

        let mut seen = std::collections::HashSet::new();
        raw.into_iter()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .filter(|name| seen.insert(name.to_lowercase()))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PostJobRequest {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub location: String,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: Option<bool>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub skills_required: Option<SkillList>,
    pub required_level: Option<i64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<String>,
    pub experience_level: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: Option<bool>,
    pub application_deadline: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    pub id: Uuid,
    pub title: String,
    pub company_id: Uuid,
    pub company_name: String,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: bool,
    pub created_at: DateTime<Utc>,
    pub applicant_count: usize,
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSkillResponse {
    pub skill_id: Uuid,
    pub name: String,
    pub category: String,
    pub is_required: bool,
    pub required_level: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDetail {
    pub id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub posted_by: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub requirements: Option<String>,
    pub location: Option<String>,
    pub employment_type: Option<EmploymentType>,
    pub experience_level: Option<String>,
    pub salary_min: Option<i64>,
    pub salary_max: Option<i64>,
    pub remote_allowed: bool,
    pub is_active: bool,
    pub status: JobStatus,
    pub application_deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub applicant_count: usize,
    pub skills: Vec<JobSkillResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    pub candidate_id: Uuid,
    pub name: String,
    pub email: String,
    pub match_score: u8,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
}

// -- Applications --

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApplyRequest {
    pub cover_letter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub candidate_id: Uuid,
    pub cover_letter: Option<String>,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub id: Uuid,
    pub full_name: Option<String>,
    pub email: String,
    pub skills: Vec<String>,
    pub experience_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRef {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobApplicationView {
    pub id: Uuid,
    pub status: ApplicationStatus,
    pub cover_letter: Option<String>,
    pub applied_at: DateTime<Utc>,
    pub candidate: CandidateSummary,
    pub job: JobRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MyApplicationView {
    pub id: Uuid,
    pub job_id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub status: ApplicationStatus,
    pub applied_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartConversationRequest {
    pub content: Option<String>,
}

// -- Messages --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub receiver_id: Uuid,
    pub content: String,
    pub application_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub message_type: MessageType,
    pub application_id: Option<Uuid>,
    pub video_call_id: Option<Uuid>,
    pub video_call_duration: Option<i64>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartyRef {
    pub full_name: Option<String>,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationContext {
    pub job_title: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    #[serde(flatten)]
    pub message: MessageResponse,
    pub sender: PartyRef,
    pub receiver: PartyRef,
    pub application: Option<ApplicationContext>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub other_user_email: String,
    pub last_message: String,
    pub last_message_time: DateTime<Utc>,
    pub unread_count: usize,
    pub application_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub updated: usize,
}

// -- Video calls --

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartCallRequest {
    pub guest_id: Uuid,
    pub application_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndCallRequest {
    pub duration_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoCallResponse {
    pub id: Uuid,
    pub room_id: String,
    pub host_id: Uuid,
    pub guest_id: Uuid,
    pub application_id: Option<Uuid>,
    pub status: CallStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub duration_seconds: Option<i64>,
}

// -- Notifications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<NotificationKind>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

// -- Skill matrix --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixRow {
    pub candidate_id: Uuid,
    pub name: String,
    pub title: Option<String>,
    /// One level per matrix column, 0 when the candidate lacks the skill.
    pub levels: Vec<u8>,
    pub match_score: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatrix {
    pub skills: Vec<SkillResponse>,
    pub candidates: Vec<MatrixRow>,
}

// -- Stats --

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub active_candidates: usize,
    pub open_positions: usize,
    pub interviews_scheduled: usize,
    pub placement_rate: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_skills_are_trimmed_and_deduplicated() {
        let list = SkillList::Csv(" React, typescript ,, react,Node.js ,".to_string());
        assert_eq!(list.names(), vec!["React", "typescript", "Node.js"]);
    }

    #[test]
    fn skill_list_accepts_array_or_string() {
        let from_array: SkillList = serde_json::from_str(r#"["AWS", " Docker "]"#).unwrap();
        assert_eq!(from_array.names(), vec!["AWS", "Docker"]);

        let from_text: SkillList = serde_json::from_str(r#""AWS, Docker""#).unwrap();
        assert_eq!(from_text.names(), vec!["AWS", "Docker"]);
    }

    #[test]
    fn claims_full_name_ignores_blank_metadata() {
        let claims = Claims {
            sub: Uuid::new_v4(),
            email: "a@example.com".into(),
            user_metadata: Some(UserMetadata { full_name: Some("  ".into()) }),
            exp: 0,
        };
        assert_eq!(claims.full_name(), None);

        let claims: Claims = serde_json::from_value(serde_json::json!({
            "sub": Uuid::nil(),
            "exp": 1,
            "role": "authenticated",
            "user_metadata": { "full_name": "Sarah Chen" }
        }))
        .unwrap();
        assert_eq!(claims.full_name(), Some("Sarah Chen"));
        assert_eq!(claims.email, "");
    }
}
