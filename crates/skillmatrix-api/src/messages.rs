use std::collections::HashMap;

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use uuid::Uuid;

use skillmatrix_db::models::{NewMessage, ThreadMessageRow};
use skillmatrix_types::api::{
    ApplicationContext, Claims, Conversation, ConversationMessage, PartyRef, ReadReceipt,
    SendMessageRequest,
};
use skillmatrix_types::models::{MessageType, NotificationKind};

use crate::applications::party_application;
use crate::convert;
use crate::error::ApiError;
use crate::extract::{Json, Path, Query};
use crate::notifications::notify;
use crate::state::{AppState, run_blocking};

pub const MAX_MESSAGE_CHARS: usize = 4000;

#[derive(Debug, Deserialize)]
pub struct ThreadQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    /// Cursor: the `created_at` of the oldest message already loaded.
    pub before: Option<DateTime<Utc>>,
}

fn default_limit() -> u32 {
    50
}

fn display_name(full_name: Option<&str>, email: &str) -> String {
    full_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(email)
        .to_string()
}

/// Folds a user's messages (newest first) into one entry per counterpart.
/// The first message seen for a counterpart is its latest.
pub fn group_conversations(user_id: &str, messages: &[ThreadMessageRow]) -> Vec<Conversation> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_other: HashMap<&str, Conversation> = HashMap::new();

    for m in messages {
        let outgoing = m.message.sender_id == user_id;
        let (other_id, other_name, other_email) = if outgoing {
            (m.message.receiver_id.as_str(), m.receiver_name.as_deref(), m.receiver_email.as_str())
        } else {
            (m.message.sender_id.as_str(), m.sender_name.as_deref(), m.sender_email.as_str())
        };

        let conversation = by_other.entry(other_id).or_insert_with(|| {
            order.push(other_id);
            Conversation {
                other_user_id: convert::id(other_id),
                other_user_name: display_name(other_name, other_email),
                other_user_email: other_email.to_string(),
                last_message: m.message.content.clone(),
                last_message_time: convert::time(&m.message.created_at),
                unread_count: 0,
                application_id: convert::opt_id(m.message.application_id.as_deref()),
            }
        });

        if !outgoing && m.message.read_at.is_none() {
            conversation.unread_count += 1;
        }
    }

    order.into_iter().filter_map(|id| by_other.remove(id)).collect()
}

fn thread_message(row: ThreadMessageRow) -> ConversationMessage {
    let application = match (row.job_title, row.company_name) {
        (Some(job_title), Some(company_name)) => Some(ApplicationContext { job_title, company_name }),
        _ => None,
    };
    ConversationMessage {
        message: convert::message(row.message),
        sender: PartyRef { full_name: row.sender_name, email: row.sender_email },
        receiver: PartyRef { full_name: row.receiver_name, email: row.receiver_email },
        application,
    }
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SendMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("message content is required"));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::bad_request(format!(
            "message must be at most {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    if req.receiver_id == claims.sub {
        return Err(ApiError::bad_request("cannot message yourself"));
    }

    let uid = claims.sub.to_string();
    let rid = req.receiver_id.to_string();
    let app_id = req.application_id.map(|a| a.to_string());
    let sender = claims.full_name().unwrap_or(&claims.email).to_string();
    let row = run_blocking(&state, move |db| {
        if !db.profile_exists(&rid)? {
            return Err(ApiError::not_found("receiver"));
        }
        if let Some(aid) = &app_id {
            party_application(db, aid, &uid)?;
        }

        let message = db.insert_message(&NewMessage {
            id: &Uuid::new_v4().to_string(),
            sender_id: &uid,
            receiver_id: &rid,
            content: &content,
            message_type: MessageType::Text.as_str(),
            application_id: app_id.as_deref(),
            video_call_id: None,
            video_call_duration: None,
        })?;
        notify(
            db,
            &rid,
            "New message",
            &format!("New message from {}", sender),
            NotificationKind::Message,
        )?;
        Ok(message)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(convert::message(row))))
}

pub async fn list_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    let uid = claims.sub.to_string();
    let rows = {
        let uid = uid.clone();
        run_blocking(&state, move |db| Ok(db.list_user_messages(&uid)?)).await?
    };
    Ok(Json(group_conversations(&uid, &rows)))
}

pub async fn conversation_messages(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Query(query): Query<ThreadQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<ConversationMessage>>, ApiError> {
    let uid = claims.sub.to_string();
    let oid = other_id.to_string();
    let limit = query.limit.clamp(1, 200);
    // Same shape as the stored column so text comparison orders correctly.
    let before = query.before.map(|b| b.to_rfc3339_opts(SecondsFormat::Millis, true));

    let rows = run_blocking(&state, move |db| {
        Ok(db.conversation_between(&uid, &oid, before.as_deref(), limit)?)
    })
    .await?;

    Ok(Json(rows.into_iter().map(thread_message).collect()))
}

pub async fn mark_conversation_read(
    State(state): State<AppState>,
    Path(other_id): Path<Uuid>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<ReadReceipt>, ApiError> {
    let uid = claims.sub.to_string();
    let oid = other_id.to_string();
    let updated = run_blocking(&state, move |db| Ok(db.mark_conversation_read(&uid, &oid)?)).await?;
    Ok(Json(ReadReceipt { updated }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_db::models::MessageRow;

    const ME: &str = "00000000-0000-0000-0000-0000000000aa";
    const BOB: &str = "00000000-0000-0000-0000-0000000000bb";
    const CAROL: &str = "00000000-0000-0000-0000-0000000000cc";

    fn name_of(id: &str) -> (Option<String>, String) {
        match id {
            BOB => (Some("Bob Smith".into()), "bob@example.com".into()),
            CAROL => (None, "carol@example.com".into()),
            _ => (Some("Me".into()), "me@example.com".into()),
        }
    }

    fn msg(from: &str, to: &str, content: &str, at: &str, read: bool) -> ThreadMessageRow {
        let (sender_name, sender_email) = name_of(from);
        let (receiver_name, receiver_email) = name_of(to);
        ThreadMessageRow {
            message: MessageRow {
                id: Uuid::new_v4().to_string(),
                sender_id: from.into(),
                receiver_id: to.into(),
                content: content.into(),
                message_type: "text".into(),
                application_id: None,
                video_call_id: None,
                video_call_duration: None,
                read_at: read.then(|| at.to_string()),
                created_at: at.into(),
            },
            sender_name,
            sender_email,
            receiver_name,
            receiver_email,
            job_title: None,
            company_name: None,
        }
    }

    #[test]
    fn newest_message_per_counterpart_wins() {
        let rows = vec![
            msg(CAROL, ME, "latest from carol", "2025-01-03T00:00:00.000Z", false),
            msg(ME, BOB, "my reply", "2025-01-02T00:00:00.000Z", false),
            msg(BOB, ME, "hello", "2025-01-01T00:00:00.000Z", false),
            msg(BOB, ME, "earlier", "2024-12-31T00:00:00.000Z", true),
        ];

        let conversations = group_conversations(ME, &rows);
        assert_eq!(conversations.len(), 2);

        assert_eq!(conversations[0].other_user_name, "carol@example.com");
        assert_eq!(conversations[0].last_message, "latest from carol");
        assert_eq!(conversations[0].unread_count, 1);

        assert_eq!(conversations[1].other_user_id.to_string(), BOB);
        assert_eq!(conversations[1].other_user_name, "Bob Smith");
        assert_eq!(conversations[1].last_message, "my reply");
        assert_eq!(conversations[1].unread_count, 1);
    }

    #[test]
    fn no_messages_no_conversations() {
        assert!(group_conversations(ME, &[]).is_empty());
    }

    #[test]
    fn thread_messages_carry_application_context_only_when_linked() {
        let mut row = msg(BOB, ME, "about the job", "2025-01-01T00:00:00.000Z", false);
        row.job_title = Some("Senior React Developer".into());
        row.company_name = Some("TechCorp".into());
        let view = thread_message(row);
        assert_eq!(view.application.unwrap().company_name, "TechCorp");
        assert_eq!(view.sender.full_name.as_deref(), Some("Bob Smith"));

        let plain = thread_message(msg(ME, BOB, "hi", "2025-01-01T00:00:00.000Z", false));
        assert!(plain.application.is_none());
    }
}
