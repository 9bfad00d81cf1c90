use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use skillmatrix_types::api::UpdateProfileRequest;

use super::{Changes, decode_skill_list};
use crate::Database;
use crate::models::ProfileRow;

const PROFILE_COLUMNS: &str = "id, email, full_name, bio, location, phone, website, linkedin_url, \
     github_url, avatar_url, role, experience_level, skills, created_at, updated_at";

impl Database {
    /// Creates the profile for an authenticated user the first time they are
    /// seen. Existing profiles are left untouched.
    pub fn ensure_profile(&self, id: &str, email: &str, full_name: Option<&str>) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO profiles (id, email, full_name) VALUES (?1, ?2, ?3)",
                (id, email, full_name),
            )?;
            Ok(inserted > 0)
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    pub fn profile_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM profiles WHERE id = ?1", [id], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Applies the supplied fields. The role must already be validated.
    pub fn update_profile(&self, id: &str, req: &UpdateProfileRequest) -> Result<usize> {
        let skills = req
            .skills
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let mut changes = Changes::new();
        changes
            .set("full_name", req.full_name.clone())
            .set("bio", req.bio.clone())
            .set("location", req.location.clone())
            .set("phone", req.phone.clone())
            .set("website", req.website.clone())
            .set("linkedin_url", req.linkedin_url.clone())
            .set("github_url", req.github_url.clone())
            .set("avatar_url", req.avatar_url.clone())
            .set("role", req.role.clone())
            .set("experience_level", req.experience_level.clone())
            .set("skills", skills);

        if changes.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| changes.apply(conn, "profiles", id))
    }
}

pub(crate) fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    let sql = format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS);
    let row = conn.query_row(&sql, [id], profile_from_row).optional()?;
    Ok(row)
}

fn profile_from_row(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        email: row.get(1)?,
        full_name: row.get(2)?,
        bio: row.get(3)?,
        location: row.get(4)?,
        phone: row.get(5)?,
        website: row.get(6)?,
        linkedin_url: row.get(7)?,
        github_url: row.get(8)?,
        avatar_url: row.get(9)?,
        role: row.get(10)?,
        experience_level: row.get(11)?,
        skills: decode_skill_list(row.get(12)?),
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_profile_does_not_overwrite() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_profile("u1", "first@example.com", Some("First")).unwrap());
        assert!(!db.ensure_profile("u1", "second@example.com", None).unwrap());

        let profile = db.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.email, "first@example.com");
        assert_eq!(profile.full_name.as_deref(), Some("First"));
        assert_eq!(profile.role, "candidate");
        assert!(profile.skills.is_empty());
        assert!(profile.updated_at.is_none());
    }

    #[test]
    fn partial_update_leaves_other_fields() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("u1", "u1@example.com", Some("Name")).unwrap();

        let req = UpdateProfileRequest {
            bio: Some("Rustacean".into()),
            skills: Some(vec!["Rust".into(), "SQL".into()]),
            ..Default::default()
        };
        assert_eq!(db.update_profile("u1", &req).unwrap(), 1);

        let profile = db.get_profile("u1").unwrap().unwrap();
        assert_eq!(profile.bio.as_deref(), Some("Rustacean"));
        assert_eq!(profile.full_name.as_deref(), Some("Name"));
        assert_eq!(profile.skills, vec!["Rust", "SQL"]);
        assert!(profile.updated_at.is_some());
    }

    #[test]
    fn empty_update_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("u1", "u1@example.com", None).unwrap();
        assert_eq!(db.update_profile("u1", &UpdateProfileRequest::default()).unwrap(), 0);
        assert!(db.get_profile("u1").unwrap().unwrap().updated_at.is_none());
    }
}
