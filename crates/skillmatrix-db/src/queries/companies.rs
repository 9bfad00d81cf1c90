use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use skillmatrix_types::api::{CreateCompanyRequest, UpdateCompanyRequest};

use super::Changes;
use crate::models::{CompanyRow, EmployeeRow};
use crate::{Database, now_timestamp};

const COMPANY_COLUMNS: &str = "c.id, c.profile_id, c.company_name, c.description, c.industry, \
     c.company_size, c.website, c.logo_url, c.headquarters, c.founded_year, c.created_at";

impl Database {
    /// Creates a company owned by `profile_id` and marks the owner as an
    /// employer. A profile owns at most one company.
    pub fn create_company(
        &self,
        id: &str,
        profile_id: &str,
        req: &CreateCompanyRequest,
    ) -> Result<CompanyRow> {
        self.with_conn_mut(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "INSERT INTO companies (id, profile_id, company_name, description, industry,
                     company_size, website, logo_url, headquarters, founded_year)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                rusqlite::params![
                    id,
                    profile_id,
                    req.company_name.trim(),
                    req.description,
                    req.industry,
                    req.company_size,
                    req.website,
                    req.logo_url,
                    req.headquarters,
                    req.founded_year,
                ],
            )?;
            tx.execute(
                "UPDATE profiles SET role = 'employer', updated_at = ?2 WHERE id = ?1 AND role = 'candidate'",
                (profile_id, now_timestamp()),
            )?;
            tx.commit()?;

            query_company(conn, "c.id = ?1", id)?
                .ok_or_else(|| anyhow::anyhow!("company {} vanished after insert", id))
        })
    }

    pub fn get_company(&self, id: &str) -> Result<Option<CompanyRow>> {
        self.with_conn(|conn| query_company(conn, "c.id = ?1", id))
    }

    pub fn company_owned_by(&self, profile_id: &str) -> Result<Option<CompanyRow>> {
        self.with_conn(|conn| query_company(conn, "c.profile_id = ?1", profile_id))
    }

    pub fn company_employing(&self, profile_id: &str) -> Result<Option<CompanyRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM companies c
                 JOIN company_employees e ON e.company_id = c.id
                 WHERE e.profile_id = ?1
                 ORDER BY e.created_at
                 LIMIT 1",
                COMPANY_COLUMNS
            );
            let row = conn.query_row(&sql, [profile_id], company_from_row).optional()?;
            Ok(row)
        })
    }

    /// Owners and employees both count as members.
    pub fn is_company_member(&self, company_id: &str, profile_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM companies WHERE id = ?1 AND profile_id = ?2
                     UNION ALL
                     SELECT 1 FROM company_employees WHERE company_id = ?1 AND profile_id = ?2
                     LIMIT 1",
                    (company_id, profile_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn update_company(&self, id: &str, req: &UpdateCompanyRequest) -> Result<usize> {
        let mut changes = Changes::new();
        changes
            .set("company_name", req.company_name.as_deref().map(|n| n.trim().to_string()))
            .set("description", req.description.clone())
            .set("industry", req.industry.clone())
            .set("company_size", req.company_size.clone())
            .set("website", req.website.clone())
            .set("logo_url", req.logo_url.clone())
            .set("headquarters", req.headquarters.clone())
            .set("founded_year", req.founded_year);

        if changes.is_empty() {
            return Ok(0);
        }

        self.with_conn_mut(|conn| changes.apply(conn, "companies", id))
    }

    pub fn add_employee(
        &self,
        id: &str,
        company_id: &str,
        profile_id: &str,
        position: Option<&str>,
    ) -> Result<EmployeeRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO company_employees (id, company_id, profile_id, position) VALUES (?1, ?2, ?3, ?4)",
                (id, company_id, profile_id, position),
            )?;
            let row = conn.query_row(
                "SELECT id, company_id, profile_id, position, created_at FROM company_employees WHERE id = ?1",
                [id],
                |row| {
                    Ok(EmployeeRow {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        profile_id: row.get(2)?,
                        position: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )?;
            Ok(row)
        })
    }
}

fn query_company(conn: &Connection, predicate: &str, value: &str) -> Result<Option<CompanyRow>> {
    let sql = format!("SELECT {} FROM companies c WHERE {}", COMPANY_COLUMNS, predicate);
    let row = conn.query_row(&sql, [value], company_from_row).optional()?;
    Ok(row)
}

fn company_from_row(row: &Row<'_>) -> rusqlite::Result<CompanyRow> {
    Ok(CompanyRow {
        id: row.get(0)?,
        profile_id: row.get(1)?,
        company_name: row.get(2)?,
        description: row.get(3)?,
        industry: row.get(4)?,
        company_size: row.get(5)?,
        website: row.get(6)?,
        logo_url: row.get(7)?,
        headquarters: row.get(8)?,
        founded_year: row.get(9)?,
        created_at: row.get(10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;

    fn company_request(name: &str) -> CreateCompanyRequest {
        CreateCompanyRequest {
            company_name: name.to_string(),
            description: None,
            industry: Some("Software".into()),
            company_size: None,
            website: None,
            logo_url: None,
            headquarters: None,
            founded_year: Some(2015),
        }
    }

    #[test]
    fn owner_becomes_employer() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("owner", "owner@example.com", None).unwrap();

        let company = db.create_company("co1", "owner", &company_request("  TechCorp ")).unwrap();
        assert_eq!(company.company_name, "TechCorp");
        assert_eq!(db.get_profile("owner").unwrap().unwrap().role, "employer");
        assert!(db.company_owned_by("owner").unwrap().is_some());

        let err = db.create_company("co2", "owner", &company_request("Other")).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn employees_are_members() {
        let db = Database::open_in_memory().unwrap();
        for id in ["owner", "staff", "outsider"] {
            db.ensure_profile(id, &format!("{id}@example.com"), None).unwrap();
        }
        db.create_company("co1", "owner", &company_request("TechCorp")).unwrap();
        let employee = db.add_employee("e1", "co1", "staff", Some("Recruiter")).unwrap();
        assert_eq!(employee.position.as_deref(), Some("Recruiter"));

        assert!(db.is_company_member("co1", "owner").unwrap());
        assert!(db.is_company_member("co1", "staff").unwrap());
        assert!(!db.is_company_member("co1", "outsider").unwrap());

        assert!(db.company_owned_by("staff").unwrap().is_none());
        assert_eq!(db.company_employing("staff").unwrap().unwrap().id, "co1");
    }
}
