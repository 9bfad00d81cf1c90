use anyhow::Result;
use rusqlite::{Connection, Row};

use crate::models::{MessageRow, NewMessage, ThreadMessageRow};
use crate::{Database, now_timestamp};

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.receiver_id, m.content, m.message_type, \
     m.application_id, m.video_call_id, m.video_call_duration, m.read_at, m.created_at";

impl Database {
    pub fn insert_message(&self, msg: &NewMessage<'_>) -> Result<MessageRow> {
        self.with_conn_mut(|conn| insert_message_on(conn, msg))
    }

    /// Every message the user sent or received, newest first, with both
    /// parties' names.
    pub fn list_user_messages(&self, user_id: &str) -> Result<Vec<ThreadMessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, s.full_name, s.email, r.full_name, r.email, NULL, NULL
                 FROM messages m
                 JOIN profiles s ON s.id = m.sender_id
                 JOIN profiles r ON r.id = m.receiver_id
                 WHERE m.sender_id = ?1 OR m.receiver_id = ?1
                 ORDER BY m.created_at DESC, m.rowid DESC",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], thread_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Messages exchanged between two users in either direction, oldest
    /// first. With `before`, only messages older than that timestamp; at most
    /// `limit` of the newest matching messages are returned.
    pub fn conversation_between(
        &self,
        user_id: &str,
        other_id: &str,
        before: Option<&str>,
        limit: u32,
    ) -> Result<Vec<ThreadMessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {}, s.full_name, s.email, r.full_name, r.email, j.title, c.company_name
                 FROM messages m
                 JOIN profiles s ON s.id = m.sender_id
                 JOIN profiles r ON r.id = m.receiver_id
                 LEFT JOIN applications a ON a.id = m.application_id
                 LEFT JOIN jobs j ON j.id = a.job_id
                 LEFT JOIN companies c ON c.id = j.company_id
                 WHERE ((m.sender_id = ?1 AND m.receiver_id = ?2)
                     OR (m.sender_id = ?2 AND m.receiver_id = ?1))
                   AND (?3 IS NULL OR m.created_at < ?3)
                 ORDER BY m.created_at DESC, m.rowid DESC
                 LIMIT ?4",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(rusqlite::params![user_id, other_id, before, limit], thread_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
    }

    /// Stamps `read_at` on unread messages sent by `other_id` to `user_id`.
    pub fn mark_conversation_read(&self, user_id: &str, other_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE messages SET read_at = ?3
                 WHERE receiver_id = ?1 AND sender_id = ?2 AND read_at IS NULL",
                (user_id, other_id, now_timestamp()),
            )?;
            Ok(updated)
        })
    }
}

pub(crate) fn insert_message_on(conn: &Connection, msg: &NewMessage<'_>) -> Result<MessageRow> {
    conn.execute(
        "INSERT INTO messages (id, sender_id, receiver_id, content, message_type, application_id,
             video_call_id, video_call_duration)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            msg.id,
            msg.sender_id,
            msg.receiver_id,
            msg.content,
            msg.message_type,
            msg.application_id,
            msg.video_call_id,
            msg.video_call_duration,
        ],
    )?;

    let sql = format!("SELECT {} FROM messages m WHERE m.id = ?1", MESSAGE_COLUMNS);
    let row = conn.query_row(&sql, [msg.id], message_from_row)?;
    Ok(row)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        receiver_id: row.get(2)?,
        content: row.get(3)?,
        message_type: row.get(4)?,
        application_id: row.get(5)?,
        video_call_id: row.get(6)?,
        video_call_duration: row.get(7)?,
        read_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn thread_message_from_row(row: &Row<'_>) -> rusqlite::Result<ThreadMessageRow> {
    Ok(ThreadMessageRow {
        message: message_from_row(row)?,
        sender_name: row.get(10)?,
        sender_email: row.get(11)?,
        receiver_name: row.get(12)?,
        receiver_email: row.get(13)?,
        job_title: row.get(14)?,
        company_name: row.get(15)?,
    })
}
