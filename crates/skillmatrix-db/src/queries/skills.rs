use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::Database;
use crate::models::SkillRow;

/// Catalog category for skills first seen in a job posting.
pub(crate) const FALLBACK_CATEGORY: &str = "Other";

impl Database {
    pub fn list_skills(&self, category: Option<&str>) -> Result<Vec<SkillRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, category, description, parent_id FROM skills
                 WHERE ?1 IS NULL OR category = ?1 COLLATE NOCASE
                 ORDER BY name COLLATE NOCASE",
            )?;
            let rows = stmt
                .query_map([category], skill_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_skill(&self, id: &str) -> Result<Option<SkillRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, name, category, description, parent_id FROM skills WHERE id = ?1",
                    [id],
                    skill_from_row,
                )
                .optional()?;
            Ok(row)
        })
    }

    /// Case-insensitive lookup by name.
    pub fn find_skill_by_name(&self, name: &str) -> Result<Option<SkillRow>> {
        self.with_conn(|conn| query_skill_by_name(conn, name))
    }

    pub fn create_skill(
        &self,
        id: &str,
        name: &str,
        category: &str,
        description: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<SkillRow> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO skills (id, name, category, description, parent_id) VALUES (?1, ?2, ?3, ?4, ?5)",
                (id, name, category, description, parent_id),
            )?;
            Ok(SkillRow {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                description: description.map(str::to_string),
                parent_id: parent_id.map(str::to_string),
            })
        })
    }
}

pub(crate) fn query_skill_by_name(conn: &Connection, name: &str) -> Result<Option<SkillRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, category, description, parent_id FROM skills WHERE name = ?1 COLLATE NOCASE",
            [name],
            skill_from_row,
        )
        .optional()?;
    Ok(row)
}

/// Returns the id of the catalog skill called `name`, adding it under the
/// fallback category when it is unknown.
pub(crate) fn resolve_or_create_skill(conn: &Connection, name: &str) -> Result<String> {
    if let Some(skill) = query_skill_by_name(conn, name)? {
        return Ok(skill.id);
    }

    let id = uuid::Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO skills (id, name, category) VALUES (?1, ?2, ?3)",
        (&id, name, FALLBACK_CATEGORY),
    )?;
    Ok(id)
}

fn skill_from_row(row: &Row<'_>) -> rusqlite::Result<SkillRow> {
    Ok(SkillRow {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        description: row.get(3)?,
        parent_id: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_sorted_and_filterable() {
        let db = Database::open_in_memory().unwrap();
        let all = db.list_skills(None).unwrap();
        assert_eq!(all.first().map(|s| s.name.as_str()), Some("AWS"));
        assert_eq!(all.len(), 7);

        let devops = db.list_skills(Some("devops")).unwrap();
        let names: Vec<&str> = devops.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Docker", "Kubernetes"]);
    }

    #[test]
    fn lookup_by_name_ignores_case() {
        let db = Database::open_in_memory().unwrap();
        let skill = db.find_skill_by_name("typescript").unwrap().unwrap();
        assert_eq!(skill.name, "TypeScript");
        assert!(db.find_skill_by_name("COBOL").unwrap().is_none());
    }

    #[test]
    fn unknown_names_are_added_once() {
        let db = Database::open_in_memory().unwrap();
        let (first, second) = db
            .with_conn_mut(|conn| {
                Ok((
                    resolve_or_create_skill(conn, "Rust")?,
                    resolve_or_create_skill(conn, "rust")?,
                ))
            })
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(db.get_skill(&first).unwrap().unwrap().category, FALLBACK_CATEGORY);
    }
}
