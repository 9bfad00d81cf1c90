use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use super::messages::insert_message_on;
use crate::models::{MessageRow, NewMessage, VideoCallRow};
use crate::{Database, now_timestamp};

const CALL_COLUMNS: &str = "id, room_id, host_id, guest_id, application_id, status, scheduled_at, \
     started_at, ended_at, created_at";

impl Database {
    /// Creates a scheduled call and posts the invite message to the guest in
    /// the same transaction.
    pub fn create_video_call(
        &self,
        id: &str,
        room_id: &str,
        host_id: &str,
        guest_id: &str,
        application_id: Option<&str>,
        scheduled_at: Option<&str>,
        invite: &NewMessage<'_>,
    ) -> Result<(VideoCallRow, MessageRow)> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO video_calls (id, room_id, host_id, guest_id, application_id, status, scheduled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'scheduled', ?6)",
                (id, room_id, host_id, guest_id, application_id, scheduled_at),
            )?;
            let message = insert_message_on(&tx, invite)?;
            tx.commit()?;

            let call = query_call(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("video call {} vanished after insert", id))?;
            Ok((call, message))
        })
    }

    pub fn get_video_call(&self, id: &str) -> Result<Option<VideoCallRow>> {
        self.with_conn(|conn| query_call(conn, id))
    }

    pub fn list_user_video_calls(&self, user_id: &str) -> Result<Vec<VideoCallRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM video_calls WHERE host_id = ?1 OR guest_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
                CALL_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], call_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `scheduled -> active`. Returns false if the call was not scheduled.
    pub fn activate_video_call(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let now = now_timestamp();
            let updated = conn.execute(
                "UPDATE video_calls SET status = 'active', started_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status = 'scheduled'",
                (id, &now),
            )?;
            Ok(updated > 0)
        })
    }

    /// `scheduled -> cancelled`. Returns false if the call was not scheduled.
    pub fn cancel_video_call(&self, id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let now = now_timestamp();
            let updated = conn.execute(
                "UPDATE video_calls SET status = 'cancelled', ended_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status = 'scheduled'",
                (id, &now),
            )?;
            Ok(updated > 0)
        })
    }

    /// `active -> ended`, stamping `ended_at` with `ended_at` and posting the
    /// summary message in the same transaction. Returns `None` if the call
    /// was not active.
    pub fn end_video_call(
        &self,
        id: &str,
        ended_at: &str,
        summary: &NewMessage<'_>,
    ) -> Result<Option<MessageRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            let updated = tx.execute(
                "UPDATE video_calls SET status = 'ended', ended_at = ?2, updated_at = ?2
                 WHERE id = ?1 AND status = 'active'",
                (id, ended_at),
            )?;
            if updated == 0 {
                return Ok(None);
            }
            let message = insert_message_on(&tx, summary)?;
            tx.commit()?;
            Ok(Some(message))
        })
    }
}

fn query_call(conn: &Connection, id: &str) -> Result<Option<VideoCallRow>> {
    let sql = format!("SELECT {} FROM video_calls WHERE id = ?1", CALL_COLUMNS);
    let row = conn.query_row(&sql, [id], call_from_row).optional()?;
    Ok(row)
}

fn call_from_row(row: &Row<'_>) -> rusqlite::Result<VideoCallRow> {
    Ok(VideoCallRow {
        id: row.get(0)?,
        room_id: row.get(1)?,
        host_id: row.get(2)?,
        guest_id: row.get(3)?,
        application_id: row.get(4)?,
        status: row.get(5)?,
        scheduled_at: row.get(6)?,
        started_at: row.get(7)?,
        ended_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("host", "host@example.com", None).unwrap();
        db.ensure_profile("guest", "guest@example.com", None).unwrap();
        db
    }

    fn message<'a>(id: &'a str, call_id: &'a str, kind: &'a str) -> NewMessage<'a> {
        NewMessage {
            id,
            sender_id: "host",
            receiver_id: "guest",
            content: "Video call invitation",
            message_type: kind,
            application_id: None,
            video_call_id: Some(call_id),
            video_call_duration: None,
        }
    }

    #[test]
    fn invite_is_written_with_the_call() {
        let db = setup();
        let (call, invite) = db
            .create_video_call("v1", "room_1", "host", "guest", None, None, &message("m1", "v1", "video_call_invite"))
            .unwrap();
        assert_eq!(call.status, "scheduled");
        assert_eq!(invite.video_call_id.as_deref(), Some("v1"));
        assert_eq!(db.list_user_video_calls("guest").unwrap().len(), 1);
    }

    #[test]
    fn lifecycle_transitions_are_guarded() {
        let db = setup();
        db.create_video_call("v1", "room_1", "host", "guest", None, None, &message("m1", "v1", "video_call_invite"))
            .unwrap();

        let summary = message("m2", "v1", "video_call_ended");
        assert!(db.end_video_call("v1", &now_timestamp(), &summary).unwrap().is_none());

        assert!(db.activate_video_call("v1").unwrap());
        assert!(!db.activate_video_call("v1").unwrap());
        assert!(!db.cancel_video_call("v1").unwrap());

        let ended = db.end_video_call("v1", &now_timestamp(), &summary).unwrap();
        assert!(ended.is_some());

        let call = db.get_video_call("v1").unwrap().unwrap();
        assert_eq!(call.status, "ended");
        assert!(call.started_at.is_some());
        assert!(call.ended_at.is_some());
    }

    #[test]
    fn cancel_only_from_scheduled() {
        let db = setup();
        db.create_video_call("v1", "room_1", "host", "guest", None, None, &message("m1", "v1", "video_call_invite"))
            .unwrap();
        assert!(db.cancel_video_call("v1").unwrap());
        assert!(!db.activate_video_call("v1").unwrap());
        assert_eq!(db.get_video_call("v1").unwrap().unwrap().status, "cancelled");
    }
}
