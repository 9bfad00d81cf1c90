use anyhow::Result;
use chrono::SecondsFormat;
use rusqlite::{Connection, OptionalExtension, Row};

use skillmatrix_types::api::UpdateJobRequest;

use super::skills::resolve_or_create_skill;
use super::{Changes, placeholders};
use crate::Database;
use crate::models::{JobRow, JobSkillRow, NewJob};

const JOB_SELECT: &str = "
    SELECT j.id, j.company_id, c.company_name, c.profile_id, j.posted_by, j.title, j.description,
           j.requirements, j.location, j.employment_type, j.experience_level, j.salary_min,
           j.salary_max, j.remote_allowed, j.is_active, j.status, j.application_deadline,
           j.created_at, j.updated_at,
           (SELECT COUNT(*) FROM applications a WHERE a.job_id = j.id)
    FROM jobs j
    JOIN companies c ON c.id = j.company_id";

impl Database {
    /// Inserts a job and links each named skill through `job_skills`, adding
    /// unknown names to the catalog. Runs as one transaction.
    pub fn insert_job(&self, job: &NewJob<'_>, skills: &[String], required_level: i64) -> Result<JobRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO jobs (id, company_id, posted_by, title, description, requirements, location,
                     employment_type, experience_level, salary_min, salary_max, remote_allowed,
                     application_deadline)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                rusqlite::params![
                    job.id,
                    job.company_id,
                    job.posted_by,
                    job.title,
                    job.description,
                    job.requirements,
                    job.location,
                    job.employment_type,
                    job.experience_level,
                    job.salary_min,
                    job.salary_max,
                    job.remote_allowed,
                    job.application_deadline,
                ],
            )?;

            for name in skills {
                let skill_id = resolve_or_create_skill(&tx, name)?;
                tx.execute(
                    "INSERT OR IGNORE INTO job_skills (id, job_id, skill_id, is_required, required_level)
                     VALUES (?1, ?2, ?3, 1, ?4)",
                    (uuid::Uuid::new_v4().to_string(), job.id, &skill_id, required_level),
                )?;
            }
            tx.commit()?;

            query_job(conn, job.id)?.ok_or_else(|| anyhow::anyhow!("job {} vanished after insert", job.id))
        })
    }

    pub fn get_job(&self, id: &str) -> Result<Option<JobRow>> {
        self.with_conn(|conn| query_job(conn, id))
    }

    /// Jobs that are active and open, newest first.
    pub fn list_open_jobs(&self) -> Result<Vec<JobRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE j.is_active = 1 AND j.status = 'open' ORDER BY j.created_at DESC, j.rowid DESC",
                JOB_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], job_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_company_jobs(&self, company_id: &str) -> Result<Vec<JobRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE j.company_id = ?1 ORDER BY j.created_at DESC, j.rowid DESC",
                JOB_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([company_id], job_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch the skills attached to a set of jobs.
    pub fn list_job_skills(&self, job_ids: &[String]) -> Result<Vec<JobSkillRow>> {
        if job_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT js.job_id, js.skill_id, s.name, s.category, js.is_required, js.required_level
                 FROM job_skills js
                 JOIN skills s ON s.id = js.skill_id
                 WHERE js.job_id IN ({})
                 ORDER BY js.is_required DESC, s.name COLLATE NOCASE",
                placeholders(job_ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(job_ids), |row| {
                    Ok(JobSkillRow {
                        job_id: row.get(0)?,
                        skill_id: row.get(1)?,
                        name: row.get(2)?,
                        category: row.get(3)?,
                        is_required: row.get(4)?,
                        required_level: row.get(5)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Applies the supplied fields. Enum-valued fields must already be
    /// validated; the deadline is stored as RFC 3339.
    pub fn update_job(&self, id: &str, req: &UpdateJobRequest) -> Result<usize> {
        let mut changes = Changes::new();
        changes
            .set("title", req.title.as_deref().map(|v| v.trim().to_string()))
            .set("description", req.description.clone())
            .set("requirements", req.requirements.clone())
            .set("location", req.location.clone())
            .set("employment_type", req.employment_type.clone())
            .set("experience_level", req.experience_level.clone())
            .set("salary_min", req.salary_min)
            .set("salary_max", req.salary_max)
            .set("remote_allowed", req.remote_allowed)
            .set(
                "application_deadline",
                req.application_deadline.map(|d| d.to_rfc3339_opts(SecondsFormat::Millis, true)),
            )
            .set("is_active", req.is_active)
            .set("status", req.status.clone());

        if changes.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| changes.apply(conn, "jobs", id))
    }
}

fn query_job(conn: &Connection, id: &str) -> Result<Option<JobRow>> {
    let sql = format!("{} WHERE j.id = ?1", JOB_SELECT);
    let row = conn.query_row(&sql, [id], job_from_row).optional()?;
    Ok(row)
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        id: row.get(0)?,
        company_id: row.get(1)?,
        company_name: row.get(2)?,
        company_owner_id: row.get(3)?,
        posted_by: row.get(4)?,
        title: row.get(5)?,
        description: row.get(6)?,
        requirements: row.get(7)?,
        location: row.get(8)?,
        employment_type: row.get(9)?,
        experience_level: row.get(10)?,
        salary_min: row.get(11)?,
        salary_max: row.get(12)?,
        remote_allowed: row.get(13)?,
        is_active: row.get(14)?,
        status: row.get(15)?,
        application_deadline: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
        applicant_count: row.get(19)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_types::api::CreateCompanyRequest;

    fn setup() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("owner", "owner@example.com", None).unwrap();
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
        db
    }

    fn new_job<'a>(id: &'a str, title: &'a str) -> NewJob<'a> {
        NewJob {
            id,
            company_id: "co1",
            posted_by: "owner",
            title,
            description: "Build things",
            requirements: "Experience",
            location: "Remote",
            employment_type: Some("full_time"),
            experience_level: None,
            salary_min: Some(90_000),
            salary_max: Some(120_000),
            remote_allowed: true,
            application_deadline: None,
        }
    }

    #[test]
    fn insert_links_skills_and_extends_catalog() {
        let db = setup();
        let skills = vec!["React".to_string(), "Elixir".to_string()];
        let job = db.insert_job(&new_job("j1", "Engineer"), &skills, 3).unwrap();
        assert_eq!(job.company_name, "TechCorp");
        assert!(job.is_active);
        assert_eq!(job.status, "open");
        assert_eq!(job.applicant_count, 0);

        let linked = db.list_job_skills(&["j1".to_string()]).unwrap();
        let names: Vec<&str> = linked.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Elixir", "React"]);
        assert!(linked.iter().all(|s| s.is_required && s.required_level == Some(3)));

        assert_eq!(db.find_skill_by_name("elixir").unwrap().unwrap().category, "Other");
    }

    #[test]
    fn deactivated_jobs_leave_the_open_list() {
        let db = setup();
        db.insert_job(&new_job("j1", "First"), &[], 3).unwrap();
        db.insert_job(&new_job("j2", "Second"), &[], 3).unwrap();

        let open: Vec<String> = db.list_open_jobs().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(open, vec!["j2", "j1"]);

        let req = UpdateJobRequest { is_active: Some(false), ..Default::default() };
        assert_eq!(db.update_job("j1", &req).unwrap(), 1);

        let open: Vec<String> = db.list_open_jobs().unwrap().into_iter().map(|j| j.id).collect();
        assert_eq!(open, vec!["j2"]);
        assert_eq!(db.list_company_jobs("co1").unwrap().len(), 2);
    }

    #[test]
    fn closed_jobs_leave_the_open_list() {
        let db = setup();
        db.insert_job(&new_job("j1", "First"), &[], 3).unwrap();

        let req = UpdateJobRequest { status: Some("closed".into()), ..Default::default() };
        db.update_job("j1", &req).unwrap();

        assert!(db.list_open_jobs().unwrap().is_empty());
        assert!(db.get_job("j1").unwrap().unwrap().is_active);
    }

    #[test]
    fn updated_deadline_uses_the_millisecond_utc_format() {
        let db = setup();
        db.insert_job(&new_job("j1", "First"), &[], 3).unwrap();

        let deadline = chrono::DateTime::parse_from_rfc3339("2030-01-02T03:04:05+02:00")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let req = UpdateJobRequest { application_deadline: Some(deadline), ..Default::default() };
        db.update_job("j1", &req).unwrap();

        let stored = db.get_job("j1").unwrap().unwrap().application_deadline;
        assert_eq!(stored.as_deref(), Some("2030-01-02T01:04:05.000Z"));
    }
}
