use axum::{
    Json, Router, middleware,
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{
    applications, candidates, companies, jobs, matrix, messages, notifications, profiles, skills,
    stats, video_calls,
};

/// Every route the service exposes. CORS and request tracing are layered on
/// by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new().route("/health", get(health));

    let protected_routes = Router::new()
        .route("/profile", get(profiles::get_my_profile).patch(profiles::update_my_profile))
        .route("/profiles/{profile_id}", get(profiles::get_profile))
        .route(
            "/candidate",
            get(candidates::get_my_candidate)
                .post(candidates::create_my_candidate)
                .patch(candidates::update_my_candidate),
        )
        .route("/candidate/skills", get(candidates::list_my_skills).post(candidates::add_my_skill))
        .route("/candidate/skills/{skill_id}", delete(candidates::remove_my_skill))
        .route("/skills", get(skills::list_skills).post(skills::create_skill))
        .route("/companies", post(companies::create_company))
        .route("/companies/mine", get(companies::company_dashboard))
        .route("/companies/{company_id}", patch(companies::update_company))
        .route("/companies/{company_id}/employees", post(companies::add_employee))
        .route("/companies/{company_id}/jobs", post(jobs::post_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{job_id}", get(jobs::get_job).patch(jobs::update_job))
        .route("/jobs/{job_id}/matches", get(jobs::job_matches))
        .route(
            "/jobs/{job_id}/applications",
            get(applications::list_job_applications).post(applications::apply),
        )
        .route("/applications", get(applications::list_my_applications))
        .route("/applications/{application_id}/status", patch(applications::update_application_status))
        .route("/applications/{application_id}/conversation", post(applications::start_conversation))
        .route("/messages", post(messages::send_message))
        .route("/conversations", get(messages::list_conversations))
        .route("/conversations/{other_id}/messages", get(messages::conversation_messages))
        .route("/conversations/{other_id}/read", post(messages::mark_conversation_read))
        .route("/video-calls", get(video_calls::list_my_video_calls).post(video_calls::start_video_call))
        .route("/video-calls/{call_id}", get(video_calls::get_video_call))
        .route("/video-calls/{call_id}/start", post(video_calls::activate_video_call))
        .route("/video-calls/{call_id}/end", post(video_calls::end_video_call))
        .route("/video-calls/{call_id}/cancel", post(video_calls::cancel_video_call))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{notification_id}/read", post(notifications::mark_notification_read))
        .route("/skill-matrix", get(matrix::skill_matrix))
        .route("/stats", get(stats::get_platform_stats))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
