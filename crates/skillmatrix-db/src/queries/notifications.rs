use anyhow::Result;

use crate::models::NotificationRow;
use crate::{Database, now_timestamp};

impl Database {
    pub fn insert_notification(
        &self,
        id: &str,
        user_id: &str,
        title: &str,
        message: &str,
        kind: &str,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO notifications (id, user_id, title, message, type) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, user_id, title, message, kind),
            )?;
            Ok(())
        })
    }

    pub fn list_notifications(&self, user_id: &str, unread_only: bool) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, title, message, type, read_at, created_at
                 FROM notifications
                 WHERE user_id = ?1 AND (?2 = 0 OR read_at IS NULL)
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, unread_only], |row| {
                    Ok(NotificationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        message: row.get(3)?,
                        kind: row.get(4)?,
                        read_at: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no notification with that id belongs to the user.
    pub fn mark_notification_read(&self, id: &str, user_id: &str) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET read_at = COALESCE(read_at, ?3) WHERE id = ?1 AND user_id = ?2",
                (id, user_id, now_timestamp()),
            )?;
            Ok(updated > 0)
        })
    }

    pub fn mark_all_notifications_read(&self, user_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE notifications SET read_at = ?2 WHERE user_id = ?1 AND read_at IS NULL",
                (user_id, now_timestamp()),
            )?;
            Ok(updated)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unread_filter_and_ownership() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("u1", "u1@example.com", None).unwrap();
        db.ensure_profile("u2", "u2@example.com", None).unwrap();
        db.insert_notification("n1", "u1", "Hello", "First", "message").unwrap();
        db.insert_notification("n2", "u1", "Hello", "Second", "message").unwrap();

        assert!(!db.mark_notification_read("n1", "u2").unwrap());
        assert!(db.mark_notification_read("n1", "u1").unwrap());

        let unread = db.list_notifications("u1", true).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].id, "n2");
        assert_eq!(db.list_notifications("u1", false).unwrap().len(), 2);

        assert_eq!(db.mark_all_notifications_read("u1").unwrap(), 1);
        assert!(db.list_notifications("u1", true).unwrap().is_empty());
    }
}
