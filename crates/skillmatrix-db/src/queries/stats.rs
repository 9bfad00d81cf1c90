use anyhow::Result;

use crate::Database;
use crate::models::PlatformCounts;

impl Database {
    pub fn platform_counts(&self) -> Result<PlatformCounts> {
        self.with_conn(|conn| {
            let counts = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM candidates WHERE availability_status = 'open'),
                    (SELECT COUNT(*) FROM jobs WHERE is_active = 1 AND status = 'open'),
                    (SELECT COUNT(*) FROM applications WHERE status = 'interviewed'),
                    (SELECT COUNT(*) FROM video_calls WHERE status IN ('scheduled', 'active')),
                    (SELECT COUNT(*) FROM applications WHERE status = 'accepted'),
                    (SELECT COUNT(*) FROM applications WHERE status = 'rejected')",
                [],
                |row| {
                    Ok(PlatformCounts {
                        active_candidates: row.get(0)?,
                        open_positions: row.get(1)?,
                        interviewed: row.get(2)?,
                        pending_calls: row.get(3)?,
                        accepted: row.get(4)?,
                        rejected: row.get(5)?,
                    })
                },
            )?;
            Ok(counts)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skillmatrix_types::api::CandidateRequest;

    #[test]
    fn empty_database_counts_zero() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(db.platform_counts().unwrap(), PlatformCounts::default());
    }

    #[test]
    fn only_open_candidates_count_as_active() {
        let db = Database::open_in_memory().unwrap();
        db.ensure_profile("a", "a@example.com", None).unwrap();
        db.ensure_profile("b", "b@example.com", None).unwrap();
        db.create_candidate("a", &CandidateRequest::default()).unwrap();
        db.create_candidate(
            "b",
            &CandidateRequest { availability_status: Some("unavailable".into()), ..Default::default() },
        )
        .unwrap();
        assert_eq!(db.platform_counts().unwrap().active_candidates, 1);
    }
}
