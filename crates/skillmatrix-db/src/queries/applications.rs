use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use super::candidates::ensure_candidate;
use super::decode_skill_list;
use crate::models::{ApplicantRow, ApplicationRow};
use crate::{Database, now_timestamp};

const APPLICATION_SELECT: &str = "
    SELECT a.id, a.job_id, a.candidate_id, a.cover_letter, a.status, a.applied_at, a.updated_at,
           j.title, j.company_id, c.company_name
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN companies c ON c.id = j.company_id";

const APPLICANT_SELECT: &str = "
    SELECT a.id, a.job_id, j.title, a.status, a.cover_letter, a.applied_at,
           p.id, p.full_name, p.email, p.skills, p.experience_level
    FROM applications a
    JOIN jobs j ON j.id = a.job_id
    JOIN profiles p ON p.id = a.candidate_id";

impl Database {
    /// Submits a pending application, creating the applicant's candidate row
    /// with defaults first. A second application to the same job fails with a
    /// unique violation.
    pub fn create_application(
        &self,
        id: &str,
        job_id: &str,
        candidate_id: &str,
        cover_letter: Option<&str>,
    ) -> Result<ApplicationRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            ensure_candidate(&tx, candidate_id)?;
            tx.execute(
                "INSERT INTO applications (id, job_id, candidate_id, cover_letter, status)
                 VALUES (?1, ?2, ?3, ?4, 'pending')",
                (id, job_id, candidate_id, cover_letter),
            )?;
            tx.commit()?;

            query_application(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("application {} vanished after insert", id))
        })
    }

    pub fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| query_application(conn, id))
    }

    /// Applications to one job, newest first, with applicant profiles.
    pub fn list_job_applicants(&self, job_id: &str) -> Result<Vec<ApplicantRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE a.job_id = ?1 ORDER BY a.applied_at DESC, a.rowid DESC",
                APPLICANT_SELECT
            );
            query_applicants(conn, &sql, job_id)
        })
    }

    /// Applications across every job of a company, for the dashboard.
    pub fn list_company_applicants(&self, company_id: &str) -> Result<Vec<ApplicantRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE j.company_id = ?1 ORDER BY a.applied_at DESC, a.rowid DESC",
                APPLICANT_SELECT
            );
            query_applicants(conn, &sql, company_id)
        })
    }

    pub fn list_candidate_applications(&self, candidate_id: &str) -> Result<Vec<ApplicationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE a.candidate_id = ?1 ORDER BY a.applied_at DESC, a.rowid DESC",
                APPLICATION_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([candidate_id], application_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The status must already be validated.
    pub fn update_application_status(&self, id: &str, status: &str) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let updated = conn.execute(
                "UPDATE applications SET status = ?2, updated_at = ?3 WHERE id = ?1",
                (id, status, now_timestamp()),
            )?;
            Ok(updated)
        })
    }
}

fn query_application(conn: &Connection, id: &str) -> Result<Option<ApplicationRow>> {
    let sql = format!("{} WHERE a.id = ?1", APPLICATION_SELECT);
    let row = conn.query_row(&sql, [id], application_from_row).optional()?;
    Ok(row)
}

fn query_applicants(conn: &Connection, sql: &str, key: &str) -> Result<Vec<ApplicantRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([key], |row| {
            Ok(ApplicantRow {
                id: row.get(0)?,
                job_id: row.get(1)?,
                job_title: row.get(2)?,
                status: row.get(3)?,
                cover_letter: row.get(4)?,
                applied_at: row.get(5)?,
                candidate_id: row.get(6)?,
                candidate_name: row.get(7)?,
                candidate_email: row.get(8)?,
                candidate_skills: decode_skill_list(row.get(9)?),
                candidate_experience_level: row.get(10)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn application_from_row(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        job_id: row.get(1)?,
        candidate_id: row.get(2)?,
        cover_letter: row.get(3)?,
        status: row.get(4)?,
        applied_at: row.get(5)?,
        updated_at: row.get(6)?,
        job_title: row.get(7)?,
        company_id: row.get(8)?,
        company_name: row.get(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use crate::models::NewJob;
    use skillmatrix_types::api::CreateCompanyRequest;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("owner", "owner@example.com", None).unwrap();
        db.ensure_profile("cand", "cand@example.com", Some("Sarah Chen")).unwrap();
        db.create_company(
            "co1",
            "owner",
            &CreateCompanyRequest {
                company_name: "TechCorp".into(),
                description: None,
                industry: None,
                company_size: None,
                website: None,
                logo_url: None,
                headquarters: None,
                founded_year: None,
            },
        )
        .unwrap();
        db.insert_job(
            &NewJob {
                id: "j1",
                company_id: "co1",
                posted_by: "owner",
                title: "Senior React Developer",
                description: "desc",
                requirements: "req",
                location: "San Francisco, CA",
                employment_type: None,
                experience_level: None,
                salary_min: None,
                salary_max: None,
                remote_allowed: false,
                application_deadline: None,
            },
            &[],
            3,
        )
        .unwrap();
        db
    }

    #[test]
    fn applying_creates_candidate_and_pending_application() {
        let db = setup();
        let app = db.create_application("a1", "j1", "cand", Some("Hire me")).unwrap();
        assert_eq!(app.status, "pending");
        assert_eq!(app.job_title, "Senior React Developer");
        assert_eq!(app.company_name, "TechCorp");

        let candidate = db.get_candidate("cand").unwrap().unwrap();
        assert_eq!(candidate.availability_status, "open");
        assert_eq!(db.get_job("j1").unwrap().unwrap().applicant_count, 1);
    }

    #[test]
    fn duplicate_application_is_rejected() {
        let db = setup();
        db.create_application("a1", "j1", "cand", None).unwrap();
        let err = db.create_application("a2", "j1", "cand", None).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn applicants_carry_profile_details() {
        let db = setup();
        db.create_application("a1", "j1", "cand", None).unwrap();
        assert_eq!(db.update_application_status("a1", "reviewed").unwrap(), 1);

        let applicants = db.list_job_applicants("j1").unwrap();
        assert_eq!(applicants.len(), 1);
        assert_eq!(applicants[0].candidate_name.as_deref(), Some("Sarah Chen"));
        assert_eq!(applicants[0].status, "reviewed");
        assert_eq!(db.list_company_applicants("co1").unwrap().len(), 1);

        let mine = db.list_candidate_applications("cand").unwrap();
        assert_eq!(mine[0].id, "a1");
        assert!(mine[0].updated_at.is_some());
    }
}
