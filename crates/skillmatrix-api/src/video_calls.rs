use axum::{
    Extension,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use skillmatrix_db::Database;
use skillmatrix_db::models::{NewMessage, VideoCallRow};
use skillmatrix_db::now_timestamp;
use skillmatrix_types::api::{Claims, EndCallRequest, StartCallRequest, VideoCallResponse};
use skillmatrix_types::models::{CallStatus, MessageType, NotificationKind};

use crate::applications::party_application;
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path};
use crate::notifications::notify;
use crate::state::{AppState, json_or_default, run_blocking};

const ROOM_SUFFIX_LEN: usize = 9;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// `room_<unix millis>_<9 base-36 chars>`
pub fn generate_room_id<R: Rng + ?Sized>(now: DateTime<Utc>, rng: &mut R) -> String {
    let suffix: String = (0..ROOM_SUFFIX_LEN)
        .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
        .collect();
    format!("room_{}_{}", now.timestamp_millis(), suffix)
}

/// `M:SS`; minutes are not wrapped into hours.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Whole seconds between start and end. A call with no recorded start falls
/// back to the client-reported duration.
pub fn call_duration(started_at: Option<DateTime<Utc>>, ended_at: DateTime<Utc>, reported: Option<i64>) -> i64 {
    match started_at {
        Some(start) => (ended_at - start).num_seconds().max(0),
        None => reported.unwrap_or(0).max(0),
    }
}

/// Loads a call the caller takes part in. Calls of other users are reported
/// as missing.
fn participant_call(db: &Database, call_id: &str, caller: &str) -> Result<VideoCallRow, ApiError> {
    db.get_video_call(call_id)?
        .filter(|c| c.host_id == caller || c.guest_id == caller)
        .ok_or_else(|| ApiError::not_found("video call"))
}

fn status_of(call: &VideoCallRow) -> CallStatus {
    convert::variant(&call.status, CallStatus::Scheduled)
}

pub async fn start_video_call(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<StartCallRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.guest_id == claims.sub {
        return Err(ApiError::bad_request("cannot call yourself"));
    }

    let call_id = Uuid::new_v4().to_string();
    let room_id = generate_room_id(Utc::now(), &mut rand::rng());
    let host = claims.sub.to_string();
    let guest = req.guest_id.to_string();
    let app_id = req.application_id.map(|a| a.to_string());
    let scheduled_at = req.scheduled_at.map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true));
    let host_name = claims.full_name().unwrap_or(&claims.email).to_string();

    let call = run_blocking(&state, move |db| {
        if !db.profile_exists(&guest)? {
            return Err(ApiError::not_found("guest"));
        }
        if let Some(aid) = &app_id {
            party_application(db, aid, &host)?;
        }

        let invite = NewMessage {
            id: &Uuid::new_v4().to_string(),
            sender_id: &host,
            receiver_id: &guest,
            content: "Video call invitation",
            message_type: MessageType::VideoCallInvite.as_str(),
            application_id: app_id.as_deref(),
            video_call_id: Some(&call_id),
            video_call_duration: None,
        };
        let (call, _) = db
            .create_video_call(
                &call_id,
                &room_id,
                &host,
                &guest,
                app_id.as_deref(),
                scheduled_at.as_deref(),
                &invite,
            )
            .map_err(|e| ApiError::conflict_or_internal(e, "room id collision, retry"))?;

        notify(
            db,
            &guest,
            "Video call invitation",
            &format!("{} invited you to a video call", host_name),
            NotificationKind::VideoCall,
        )?;
        Ok(call)
    })
    .await?;

    info!("Video call {} scheduled in {}", call.id, call.room_id);
    Ok((StatusCode::CREATED, Json(convert::video_call(call))))
}

pub async fn get_video_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VideoCallResponse>, ApiError> {
    let cid = call_id.to_string();
    let uid = claims.sub.to_string();
    let call = run_blocking(&state, move |db| participant_call(db, &cid, &uid)).await?;
    Ok(Json(convert::video_call(call)))
}

pub async fn list_my_video_calls(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<VideoCallResponse>>, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| Ok(db.list_user_video_calls(&uid)?)).await?;
    Ok(Json(rows.into_iter().map(convert::video_call).collect()))
}

/// `scheduled -> active`. Repeating it on an active call is a no-op.
pub async fn activate_video_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VideoCallResponse>, ApiError> {
    let cid = call_id.to_string();
    let uid = claims.sub.to_string();
    let call = run_blocking(&state, move |db| {
        let call = participant_call(db, &cid, &uid)?;
        match status_of(&call) {
            CallStatus::Active => return Ok(call),
            CallStatus::Scheduled => {
                db.activate_video_call(&cid)?;
            }
            CallStatus::Ended | CallStatus::Cancelled => {}
        }

        let call = participant_call(db, &cid, &uid)?;
        if status_of(&call) == CallStatus::Active {
            Ok(call)
        } else {
            Err(ApiError::Conflict(format!("call is {}", call.status)))
        }
    })
    .await?;

    info!("Video call {} active", call.id);
    Ok(Json(convert::video_call(call)))
}

/// Ends an active call and posts the duration to the other participant.
/// A call that never started is cancelled instead.
pub async fn end_video_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<VideoCallResponse>, ApiError> {
    let req: EndCallRequest = json_or_default(&body)?;
    let cid = call_id.to_string();
    let uid = claims.sub.to_string();

    let call = run_blocking(&state, move |db| {
        let call = participant_call(db, &cid, &uid)?;
        match status_of(&call) {
            CallStatus::Scheduled => {
                if !db.cancel_video_call(&cid)? {
                    return Err(ApiError::Conflict("call changed state, retry".into()));
                }
            }
            CallStatus::Active => {
                let ended_at = now_timestamp();
                let duration = call_duration(
                    convert::opt_time(call.started_at.as_deref()),
                    convert::time(&ended_at),
                    req.duration_seconds,
                );
                let other = if call.host_id == uid { &call.guest_id } else { &call.host_id };
                let summary = NewMessage {
                    id: &Uuid::new_v4().to_string(),
                    sender_id: &uid,
                    receiver_id: other,
                    content: &format!("Video call ended (Duration: {})", format_duration(duration)),
                    message_type: MessageType::VideoCallEnded.as_str(),
                    application_id: call.application_id.as_deref(),
                    video_call_id: Some(&cid),
                    video_call_duration: Some(duration),
                };
                if db.end_video_call(&cid, &ended_at, &summary)?.is_none() {
                    return Err(ApiError::Conflict("call changed state, retry".into()));
                }
            }
            CallStatus::Ended | CallStatus::Cancelled => {
                return Err(ApiError::Conflict(format!("call is already {}", call.status)));
            }
        }
        participant_call(db, &cid, &uid)
    })
    .await?;

    info!("Video call {} {}", call.id, call.status);
    Ok(Json(convert::video_call(call)))
}

pub async fn cancel_video_call(
    State(state): State<AppState>,
    Path(call_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<VideoCallResponse>, ApiError> {
    let cid = call_id.to_string();
    let uid = claims.sub.to_string();
    let call = run_blocking(&state, move |db| {
        let call = participant_call(db, &cid, &uid)?;
        if status_of(&call) != CallStatus::Scheduled || !db.cancel_video_call(&cid)? {
            return Err(ApiError::Conflict(format!("cannot cancel a call that is {}", call.status)));
        }
        participant_call(db, &cid, &uid)
    })
    .await?;

    info!("Video call {} cancelled", call.id);
    Ok(Json(convert::video_call(call)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn room_ids_have_timestamp_and_base36_suffix() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let id = generate_room_id(now, &mut rng);

        let rest = id.strip_prefix("room_1700000000123_").unwrap();
        assert_eq!(rest.len(), ROOM_SUFFIX_LEN);
        assert!(rest.bytes().all(|b| b.is_ascii_digit() || b.is_ascii_lowercase()));

        assert_ne!(id, generate_room_id(now, &mut rng));
    }

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(65), "1:05");
        assert_eq!(format_duration(3600), "60:00");
        assert_eq!(format_duration(-5), "0:00");
    }

    #[test]
    fn duration_prefers_recorded_start() {
        let end = Utc::now();
        assert_eq!(call_duration(Some(end - Duration::seconds(90)), end, Some(5)), 90);
        assert_eq!(call_duration(None, end, Some(42)), 42);
        assert_eq!(call_duration(None, end, None), 0);
    }
}
