use axum::{Extension, extract::State};
use serde::Deserialize;
use uuid::Uuid;

use skillmatrix_db::Database;
use skillmatrix_types::api::{Claims, NotificationResponse, ReadReceipt};
use skillmatrix_types::models::NotificationKind;

use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::state::{AppState, run_blocking};

/// Queue a notification for `user_id`. Called from inside blocking work.
pub(crate) fn notify(
    db: &Database,
    user_id: &str,
    title: &str,
    message: &str,
    kind: NotificationKind,
) -> anyhow::Result<()> {
    db.insert_notification(&Uuid::new_v4().to_string(), user_id, title, message, kind.as_str())
}

#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread: bool,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let uid = claims.sub.to_string();
    let rows = run_blocking(&state, move |db| Ok(db.list_notifications(&uid, query.unread)?)).await?;
    Ok(Json(rows.into_iter().map(convert::notification).collect()))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    Path(notification_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReadReceipt>, ApiError> {
    let nid = notification_id.to_string();
    let uid = claims.sub.to_string();
    let found = run_blocking(&state, move |db| Ok(db.mark_notification_read(&nid, &uid)?)).await?;
    if !found {
        return Err(ApiError::not_found("notification"));
    }
    Ok(Json(ReadReceipt { updated: 1 }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReadReceipt>, ApiError> {
    let uid = claims.sub.to_string();
    let updated = run_blocking(&state, move |db| Ok(db.mark_all_notifications_read(&uid)?)).await?;
    Ok(Json(ReadReceipt { updated }))
}
