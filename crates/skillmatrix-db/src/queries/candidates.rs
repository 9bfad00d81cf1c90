use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use skillmatrix_types::api::CandidateRequest;

use super::Changes;
use crate::Database;
use crate::models::{CandidateProfileRow, CandidateRow, CandidateSkillRow};

const CANDIDATE_COLUMNS: &str = "id, experience_years, salary_expectation, availability_status, \
     preferred_job_type, preferred_location, remote_preference, resume_url, portfolio_url, \
     created_at, updated_at";

impl Database {
    pub fn get_candidate(&self, id: &str) -> Result<Option<CandidateRow>> {
        self.with_conn(|conn| query_candidate(conn, id))
    }

    /// Inserts a candidate row, filling unspecified fields with the defaults
    /// a fresh job seeker gets. Fails with a unique violation if one exists.
    pub fn create_candidate(&self, id: &str, req: &CandidateRequest) -> Result<CandidateRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO candidates (id, experience_years, salary_expectation, availability_status,
                     preferred_job_type, preferred_location, remote_preference, resume_url, portfolio_url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                rusqlite::params![
                    id,
                    req.experience_years.unwrap_or(0),
                    req.salary_expectation,
                    req.availability_status.as_deref().unwrap_or("open"),
                    req.preferred_job_type.as_deref().unwrap_or("full_time"),
                    req.preferred_location,
                    req.remote_preference.unwrap_or(false),
                    req.resume_url,
                    req.portfolio_url,
                ],
            )?;
            query_candidate(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("candidate {} vanished after insert", id))
        })
    }

    pub fn update_candidate(&self, id: &str, req: &CandidateRequest) -> Result<usize> {
        let mut changes = Changes::new();
        changes
            .set("experience_years", req.experience_years)
            .set("salary_expectation", req.salary_expectation)
            .set("availability_status", req.availability_status.clone())
            .set("preferred_job_type", req.preferred_job_type.clone())
            .set("preferred_location", req.preferred_location.clone())
            .set("remote_preference", req.remote_preference)
            .set("resume_url", req.resume_url.clone())
            .set("portfolio_url", req.portfolio_url.clone());

        if changes.is_empty() {
            // Still report whether the row exists so callers can 404.
            return self.with_conn(|conn| Ok(query_candidate(conn, id)?.map_or(0, |_| 1)));
        }

        self.with_conn_mut(|conn| changes.apply(conn, "candidates", id))
    }

    pub fn list_candidate_skills(&self, candidate_id: &str) -> Result<Vec<CandidateSkillRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cs.candidate_id, cs.skill_id, s.name, s.category, cs.proficiency_level,
                        cs.years_experience, cs.is_primary
                 FROM candidate_skills cs
                 JOIN skills s ON s.id = cs.skill_id
                 WHERE cs.candidate_id = ?1
                 ORDER BY cs.is_primary DESC, s.name COLLATE NOCASE",
            )?;
            let rows = stmt
                .query_map([candidate_id], candidate_skill_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every candidate skill in the system, for building the skill matrix.
    pub fn list_all_candidate_skills(&self) -> Result<Vec<CandidateSkillRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT cs.candidate_id, cs.skill_id, s.name, s.category, cs.proficiency_level,
                        cs.years_experience, cs.is_primary
                 FROM candidate_skills cs
                 JOIN skills s ON s.id = cs.skill_id",
            )?;
            let rows = stmt
                .query_map([], candidate_skill_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_candidate_profiles(&self) -> Result<Vec<CandidateProfileRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, p.full_name, p.email, p.experience_level
                 FROM candidates c
                 JOIN profiles p ON p.id = c.id
                 ORDER BY COALESCE(p.full_name, p.email) COLLATE NOCASE",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(CandidateProfileRow {
                        id: row.get(0)?,
                        full_name: row.get(1)?,
                        email: row.get(2)?,
                        experience_level: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Links a catalog skill to the candidate, creating the candidate row
    /// with defaults when the user has none yet.
    pub fn add_candidate_skill(
        &self,
        id: &str,
        candidate_id: &str,
        skill_id: &str,
        proficiency_level: i64,
        years_experience: Option<i64>,
        is_primary: bool,
    ) -> Result<()> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            ensure_candidate(&tx, candidate_id)?;
            tx.execute(
                "INSERT INTO candidate_skills
                     (id, candidate_id, skill_id, proficiency_level, years_experience, is_primary)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![id, candidate_id, skill_id, proficiency_level, years_experience, is_primary],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    pub fn remove_candidate_skill(&self, candidate_id: &str, skill_id: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let removed = conn.execute(
                "DELETE FROM candidate_skills WHERE candidate_id = ?1 AND skill_id = ?2",
                (candidate_id, skill_id),
            )?;
            Ok(removed)
        })
    }
}

/// Inserts a default candidate row if the profile has none.
pub(crate) fn ensure_candidate(conn: &Connection, id: &str) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO candidates (id, experience_years, availability_status)
         VALUES (?1, 0, 'open')",
        [id],
    )?;
    Ok(())
}

fn query_candidate(conn: &Connection, id: &str) -> Result<Option<CandidateRow>> {
    let sql = format!("SELECT {} FROM candidates WHERE id = ?1", CANDIDATE_COLUMNS);
    let row = conn
        .query_row(&sql, [id], |row| {
            Ok(CandidateRow {
                id: row.get(0)?,
                experience_years: row.get(1)?,
                salary_expectation: row.get(2)?,
                availability_status: row.get(3)?,
                preferred_job_type: row.get(4)?,
                preferred_location: row.get(5)?,
                remote_preference: row.get(6)?,
                resume_url: row.get(7)?,
                portfolio_url: row.get(8)?,
                created_at: row.get(9)?,
                updated_at: row.get(10)?,
            })
        })
        .optional()?;
    Ok(row)
}

fn candidate_skill_from_row(row: &Row<'_>) -> rusqlite::Result<CandidateSkillRow> {
    Ok(CandidateSkillRow {
        candidate_id: row.get(0)?,
        skill_id: row.get(1)?,
        name: row.get(2)?,
        category: row.get(3)?,
        proficiency_level: row.get(4)?,
        years_experience: row.get(5)?,
        is_primary: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    const REACT: &str = "00000000-0000-0000-0000-000000000101";
    const AWS: &str = "00000000-0000-0000-0000-000000000105";

    fn db_with_user(id: &str) -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile(id, &format!("{id}@example.com"), None).unwrap();
        db
    }

    #[test]
    fn create_applies_defaults() {
        let db = db_with_user("c1");
        let row = db.create_candidate("c1", &CandidateRequest::default()).unwrap();
        assert_eq!(row.experience_years, 0);
        assert_eq!(row.availability_status, "open");
        assert_eq!(row.preferred_job_type.as_deref(), Some("full_time"));
        assert!(!row.remote_preference);
    }

    #[test]
    fn second_create_is_a_unique_violation() {
        let db = db_with_user("c1");
        db.create_candidate("c1", &CandidateRequest::default()).unwrap();
        let err = db.create_candidate("c1", &CandidateRequest::default()).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn update_reports_missing_row() {
        let db = db_with_user("c1");
        assert_eq!(db.update_candidate("c1", &CandidateRequest::default()).unwrap(), 0);

        let req = CandidateRequest { experience_years: Some(4), ..Default::default() };
        assert_eq!(db.update_candidate("c1", &req).unwrap(), 0);

        db.create_candidate("c1", &CandidateRequest::default()).unwrap();
        assert_eq!(db.update_candidate("c1", &req).unwrap(), 1);
        assert_eq!(db.get_candidate("c1").unwrap().unwrap().experience_years, 4);
    }

    #[test]
    fn adding_a_skill_creates_the_candidate() {
        let db = db_with_user("c1");
        db.add_candidate_skill("cs1", "c1", AWS, 4, Some(2), false).unwrap();
        db.add_candidate_skill("cs2", "c1", REACT, 5, None, true).unwrap();

        assert!(db.get_candidate("c1").unwrap().is_some());
        let skills = db.list_candidate_skills("c1").unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["React", "AWS"]);

        let err = db.add_candidate_skill("cs3", "c1", AWS, 3, None, false).unwrap_err();
        assert!(is_unique_violation(&err));

        assert_eq!(db.remove_candidate_skill("c1", AWS).unwrap(), 1);
        assert_eq!(db.remove_candidate_skill("c1", AWS).unwrap(), 0);
    }
}
