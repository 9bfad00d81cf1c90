mod applications;
mod candidates;
mod companies;
mod jobs;
mod messages;
mod notifications;
mod profiles;
mod skills;
mod stats;
mod video_calls;

use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::now_timestamp;

/// Column assignments for a partial `UPDATE`. Only fields that were supplied
/// end up in the statement.
pub(crate) struct Changes {
    sets: Vec<(&'static str, Value)>,
}

impl Changes {
    pub(crate) fn new() -> Self {
        Self { sets: Vec::new() }
    }

    pub(crate) fn set<T: Into<Value>>(&mut self, column: &'static str, value: Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.sets.push((column, v.into()));
        }
        self
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Runs the update against `table` for the row with primary key `id`,
    /// stamping `updated_at`. Returns the number of rows touched.
    pub(crate) fn apply(mut self, conn: &Connection, table: &str, id: &str) -> Result<usize> {
        self.sets.push(("updated_at", Value::Text(now_timestamp())));

        let assignments: Vec<String> = self
            .sets
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ?{}", column, i + 1))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            table,
            assignments.join(", "),
            self.sets.len() + 1
        );

        let mut params: Vec<Value> = self.sets.into_iter().map(|(_, v)| v).collect();
        params.push(Value::Text(id.to_string()));

        let updated = conn.execute(&sql, rusqlite::params_from_iter(params))?;
        Ok(updated)
    }
}

/// `?1, ?2, ...` for an `IN (...)` list.
pub(crate) fn placeholders(count: usize) -> String {
    (1..=count).map(|i| format!("?{}", i)).collect::<Vec<_>>().join(", ")
}

/// Decodes the JSON text array stored in `profiles.skills`.
pub(crate) fn decode_skill_list(raw: Option<String>) -> Vec<String> {
    raw.and_then(|text| serde_json::from_str(&text).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_numbered_from_one() {
        assert_eq!(placeholders(3), "?1, ?2, ?3");
        assert_eq!(placeholders(0), "");
    }

    #[test]
    fn corrupt_skill_list_decodes_to_empty() {
        assert!(decode_skill_list(Some("not json".into())).is_empty());
        assert!(decode_skill_list(None).is_empty());
        assert_eq!(decode_skill_list(Some(r#"["Rust"]"#.into())), vec!["Rust"]);
    }

    #[test]
    fn empty_changes_only_skip_when_nothing_set() {
        let mut changes = Changes::new();
        changes.set::<String>("bio", None);
        assert!(changes.is_empty());
        changes.set("bio", Some("hello".to_string()));
        assert!(!changes.is_empty());
    }
}
