use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

/// Highest schema version this build knows how to create.
pub const LATEST_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(V1_SCHEMA)?;
    }

    if version < 2 {
        info!("Running migration v2 (skill catalog seed)");
        conn.execute_batch(V2_SKILL_SEED)?;
    }

    info!("Database migrations complete");
    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<i64> {
    let version =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;
    Ok(version)
}

const V1_SCHEMA: &str = "
    CREATE TABLE profiles (
        id                TEXT PRIMARY KEY,
        email             TEXT NOT NULL,
        full_name         TEXT,
        bio               TEXT,
        location          TEXT,
        phone             TEXT,
        website           TEXT,
        linkedin_url      TEXT,
        github_url        TEXT,
        avatar_url        TEXT,
        role              TEXT NOT NULL DEFAULT 'candidate',
        experience_level  TEXT,
        skills            TEXT NOT NULL DEFAULT '[]',
        created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at        TEXT
    );

    CREATE TABLE candidates (
        id                   TEXT PRIMARY KEY REFERENCES profiles(id) ON DELETE CASCADE,
        experience_years     INTEGER NOT NULL DEFAULT 0,
        salary_expectation   INTEGER,
        availability_status  TEXT NOT NULL DEFAULT 'open',
        preferred_job_type   TEXT,
        preferred_location   TEXT,
        remote_preference    INTEGER NOT NULL DEFAULT 0,
        resume_url           TEXT,
        portfolio_url        TEXT,
        created_at           TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at           TEXT
    );

    CREATE TABLE skills (
        id           TEXT PRIMARY KEY,
        name         TEXT NOT NULL UNIQUE COLLATE NOCASE,
        category     TEXT NOT NULL,
        description  TEXT,
        parent_id    TEXT REFERENCES skills(id),
        created_at   TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE TABLE candidate_skills (
        id                 TEXT PRIMARY KEY,
        candidate_id       TEXT NOT NULL REFERENCES candidates(id) ON DELETE CASCADE,
        skill_id           TEXT NOT NULL REFERENCES skills(id),
        proficiency_level  INTEGER NOT NULL DEFAULT 3,
        years_experience   INTEGER,
        is_primary         INTEGER NOT NULL DEFAULT 0,
        created_at         TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE(candidate_id, skill_id)
    );

    CREATE TABLE companies (
        id            TEXT PRIMARY KEY,
        profile_id    TEXT NOT NULL UNIQUE REFERENCES profiles(id),
        company_name  TEXT NOT NULL,
        description   TEXT,
        industry      TEXT,
        company_size  TEXT,
        website       TEXT,
        logo_url      TEXT,
        headquarters  TEXT,
        founded_year  INTEGER,
        created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at    TEXT
    );

    CREATE TABLE company_employees (
        id          TEXT PRIMARY KEY,
        company_id  TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
        profile_id  TEXT NOT NULL REFERENCES profiles(id),
        position    TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at  TEXT,
        UNIQUE(company_id, profile_id)
    );

    CREATE INDEX idx_company_employees_profile ON company_employees(profile_id);

    CREATE TABLE jobs (
        id                    TEXT PRIMARY KEY,
        company_id            TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
        posted_by             TEXT REFERENCES profiles(id),
        title                 TEXT NOT NULL,
        description           TEXT NOT NULL,
        requirements          TEXT,
        location              TEXT,
        employment_type       TEXT,
        experience_level      TEXT,
        salary_min            INTEGER,
        salary_max            INTEGER,
        remote_allowed        INTEGER NOT NULL DEFAULT 0,
        is_active             INTEGER NOT NULL DEFAULT 1,
        status                TEXT NOT NULL DEFAULT 'open',
        application_deadline  TEXT,
        created_at            TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at            TEXT
    );

    CREATE INDEX idx_jobs_company ON jobs(company_id, created_at);

    CREATE TABLE job_skills (
        id              TEXT PRIMARY KEY,
        job_id          TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        skill_id        TEXT NOT NULL REFERENCES skills(id),
        is_required     INTEGER NOT NULL DEFAULT 1,
        required_level  INTEGER,
        created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        UNIQUE(job_id, skill_id)
    );

    CREATE TABLE applications (
        id            TEXT PRIMARY KEY,
        job_id        TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
        candidate_id  TEXT NOT NULL REFERENCES profiles(id),
        cover_letter  TEXT,
        status        TEXT NOT NULL DEFAULT 'pending',
        applied_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at    TEXT,
        UNIQUE(job_id, candidate_id)
    );

    CREATE INDEX idx_applications_candidate ON applications(candidate_id);

    CREATE TABLE video_calls (
        id              TEXT PRIMARY KEY,
        room_id         TEXT NOT NULL UNIQUE,
        host_id         TEXT NOT NULL REFERENCES profiles(id),
        guest_id        TEXT NOT NULL REFERENCES profiles(id),
        application_id  TEXT REFERENCES applications(id),
        status          TEXT NOT NULL DEFAULT 'scheduled',
        scheduled_at    TEXT,
        started_at      TEXT,
        ended_at        TEXT,
        created_at      TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
        updated_at      TEXT
    );

    CREATE TABLE messages (
        id                   TEXT PRIMARY KEY,
        sender_id            TEXT NOT NULL REFERENCES profiles(id),
        receiver_id          TEXT NOT NULL REFERENCES profiles(id),
        content              TEXT NOT NULL,
        message_type         TEXT NOT NULL DEFAULT 'text',
        application_id       TEXT REFERENCES applications(id),
        video_call_id        TEXT REFERENCES video_calls(id),
        video_call_duration  INTEGER,
        read_at              TEXT,
        created_at           TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE INDEX idx_messages_sender ON messages(sender_id, created_at);
    CREATE INDEX idx_messages_receiver ON messages(receiver_id, created_at);

    CREATE TABLE notifications (
        id          TEXT PRIMARY KEY,
        user_id     TEXT NOT NULL REFERENCES profiles(id),
        title       TEXT NOT NULL,
        message     TEXT NOT NULL,
        type        TEXT,
        read_at     TEXT,
        created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    );

    CREATE INDEX idx_notifications_user ON notifications(user_id, created_at);

    INSERT INTO schema_version (version) VALUES (1);
";

const V2_SKILL_SEED: &str = "
    INSERT OR IGNORE INTO skills (id, name, category) VALUES
        ('00000000-0000-0000-0000-000000000101', 'React', 'Frontend'),
        ('00000000-0000-0000-0000-000000000102', 'TypeScript', 'Frontend'),
        ('00000000-0000-0000-0000-000000000103', 'Node.js', 'Backend'),
        ('00000000-0000-0000-0000-000000000104', 'Python', 'Backend'),
        ('00000000-0000-0000-0000-000000000105', 'AWS', 'Cloud'),
        ('00000000-0000-0000-0000-000000000106', 'Docker', 'DevOps'),
        ('00000000-0000-0000-0000-000000000107', 'Kubernetes', 'DevOps');

    INSERT INTO schema_version (version) VALUES (2);
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(current_version(&conn).unwrap(), LATEST_VERSION);

        let skills: i64 = conn
            .query_row("SELECT COUNT(*) FROM skills", [], |r| r.get(0))
            .unwrap();
        assert_eq!(skills, 7);
    }
}
