//! Schema migrations for the relational store.
//!
//! Modeled as an ordered list of `(version, description, action)` rather
//! than a single bootstrap script, so the schema can evolve without losing
//! already-committed data. The recorded `schema_version` row is never
//! trusted on its own; [`current_version`] also probes `sqlite_master` for
//! the tables/columns each migration is responsible for, since a version
//! row can disagree with reality after a manually repaired database.

use sqlx::SqlitePool;

/// A single schema migration. `up` must be idempotent; `CREATE TABLE IF NOT
/// EXISTS`, `CREATE INDEX IF NOT EXISTS`, etc; so re-running it is harmless.
pub struct Migration {
    pub version: i64,
    pub description: &'static str,
    pub up: &'static str,
    /// Defensive check: does the schema this migration introduces actually
    /// exist? Used to re-apply a migration whose version row is present but
    /// whose effect was lost (e.g. a restored partial backup).
    pub satisfied: fn(&[String]) -> bool,
}

pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "sessions, prompts, observations, summaries + FTS5 mirrors",
        up: MIGRATION_V1_UP,
        satisfied: |tables| tables.iter().any(|t| t == "observations_fts"),
    },
    Migration {
        version: 2,
        description: "vector sync watermark table",
        up: MIGRATION_V2_UP,
        satisfied: |tables| tables.iter().any(|t| t == "vector_sync_state"),
    },
];

const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_session_id TEXT NOT NULL UNIQUE,
    platform TEXT NOT NULL,
    project TEXT NOT NULL DEFAULT '',
    started_at TEXT NOT NULL,
    completed_at TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    prompt_counter INTEGER NOT NULL DEFAULT 0,
    user_prompt TEXT,
    worker_port INTEGER
);

CREATE INDEX IF NOT EXISTS idx_sessions_project ON sessions(project);
CREATE INDEX IF NOT EXISTS idx_sessions_status ON sessions(status);

CREATE TABLE IF NOT EXISTS user_prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    agent_session_id TEXT NOT NULL,
    prompt_number INTEGER NOT NULL,
    prompt_text TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_prompts_session ON user_prompts(agent_session_id);

CREATE TABLE IF NOT EXISTS observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sdk_session_id TEXT NOT NULL,
    project TEXT NOT NULL DEFAULT '',
    type TEXT NOT NULL DEFAULT 'change',
    title TEXT,
    subtitle TEXT,
    narrative TEXT,
    facts TEXT NOT NULL DEFAULT '[]',
    concepts TEXT NOT NULL DEFAULT '[]',
    files_read TEXT NOT NULL DEFAULT '[]',
    files_modified TEXT NOT NULL DEFAULT '[]',
    prompt_number INTEGER,
    discovery_tokens INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_observations_project ON observations(project);
CREATE INDEX IF NOT EXISTS idx_observations_session ON observations(sdk_session_id);
CREATE INDEX IF NOT EXISTS idx_observations_created ON observations(created_at);
CREATE INDEX IF NOT EXISTS idx_observations_type ON observations(type);

CREATE TABLE IF NOT EXISTS summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    sdk_session_id TEXT NOT NULL,
    project TEXT NOT NULL DEFAULT '',
    request TEXT,
    investigated TEXT,
    learned TEXT,
    completed TEXT,
    next_steps TEXT,
    notes TEXT,
    prompt_number INTEGER,
    discovery_tokens INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_summaries_project ON summaries(project);
CREATE INDEX IF NOT EXISTS idx_summaries_session ON summaries(sdk_session_id);
CREATE INDEX IF NOT EXISTS idx_summaries_created ON summaries(created_at);

-- FTS5 mirrors, kept in sync via triggers. `content=`/`content_rowid=` make
-- these external-content tables so the base row stays the single source of
-- truth and the FTS index costs only the inverted lists.
CREATE VIRTUAL TABLE IF NOT EXISTS observations_fts USING fts5(
    title, subtitle, narrative, facts, concepts,
    content='observations', content_rowid='id', tokenize='porter'
);

CREATE TRIGGER IF NOT EXISTS observations_ai AFTER INSERT ON observations BEGIN
    INSERT INTO observations_fts(rowid, title, subtitle, narrative, facts, concepts)
    VALUES (NEW.id, NEW.title, NEW.subtitle, NEW.narrative, NEW.facts, NEW.concepts);
END;

CREATE TRIGGER IF NOT EXISTS observations_ad AFTER DELETE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, title, subtitle, narrative, facts, concepts)
    VALUES ('delete', OLD.id, OLD.title, OLD.subtitle, OLD.narrative, OLD.facts, OLD.concepts);
END;

CREATE TRIGGER IF NOT EXISTS observations_au AFTER UPDATE ON observations BEGIN
    INSERT INTO observations_fts(observations_fts, rowid, title, subtitle, narrative, facts, concepts)
    VALUES ('delete', OLD.id, OLD.title, OLD.subtitle, OLD.narrative, OLD.facts, OLD.concepts);
    INSERT INTO observations_fts(rowid, title, subtitle, narrative, facts, concepts)
    VALUES (NEW.id, NEW.title, NEW.subtitle, NEW.narrative, NEW.facts, NEW.concepts);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS summaries_fts USING fts5(
    request, investigated, learned, completed, next_steps, notes,
    content='summaries', content_rowid='id', tokenize='porter'
);

CREATE TRIGGER IF NOT EXISTS summaries_ai AFTER INSERT ON summaries BEGIN
    INSERT INTO summaries_fts(rowid, request, investigated, learned, completed, next_steps, notes)
    VALUES (NEW.id, NEW.request, NEW.investigated, NEW.learned, NEW.completed, NEW.next_steps, NEW.notes);
END;

CREATE TRIGGER IF NOT EXISTS summaries_ad AFTER DELETE ON summaries BEGIN
    INSERT INTO summaries_fts(summaries_fts, rowid, request, investigated, learned, completed, next_steps, notes)
    VALUES ('delete', OLD.id, OLD.request, OLD.investigated, OLD.learned, OLD.completed, OLD.next_steps, OLD.notes);
END;

CREATE TRIGGER IF NOT EXISTS summaries_au AFTER UPDATE ON summaries BEGIN
    INSERT INTO summaries_fts(summaries_fts, rowid, request, investigated, learned, completed, next_steps, notes)
    VALUES ('delete', OLD.id, OLD.request, OLD.investigated, OLD.learned, OLD.completed, OLD.next_steps, OLD.notes);
    INSERT INTO summaries_fts(rowid, request, investigated, learned, completed, next_steps, notes)
    VALUES (NEW.id, NEW.request, NEW.investigated, NEW.learned, NEW.completed, NEW.next_steps, NEW.notes);
END;

CREATE VIRTUAL TABLE IF NOT EXISTS prompts_fts USING fts5(
    prompt_text,
    content='user_prompts', content_rowid='id', tokenize='porter'
);

CREATE TRIGGER IF NOT EXISTS prompts_ai AFTER INSERT ON user_prompts BEGIN
    INSERT INTO prompts_fts(rowid, prompt_text) VALUES (NEW.id, NEW.prompt_text);
END;

CREATE TRIGGER IF NOT EXISTS prompts_ad AFTER DELETE ON user_prompts BEGIN
    INSERT INTO prompts_fts(prompts_fts, rowid, prompt_text) VALUES ('delete', OLD.id, OLD.prompt_text);
END;

CREATE TRIGGER IF NOT EXISTS prompts_au AFTER UPDATE ON user_prompts BEGIN
    INSERT INTO prompts_fts(prompts_fts, rowid, prompt_text) VALUES ('delete', OLD.id, OLD.prompt_text);
    INSERT INTO prompts_fts(rowid, prompt_text) VALUES (NEW.id, NEW.prompt_text);
END;

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (1, datetime('now'));
"#;

const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS vector_sync_state (
    kind TEXT PRIMARY KEY,
    last_synced_id INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO vector_sync_state (kind, last_synced_id) VALUES ('observation', 0);
INSERT OR IGNORE INTO vector_sync_state (kind, last_synced_id) VALUES ('summary', 0);
INSERT OR IGNORE INTO vector_sync_state (kind, last_synced_id) VALUES ('prompt', 0);

INSERT OR IGNORE INTO schema_version (version, applied_at) VALUES (2, datetime('now'));
"#;

/// Highest version recorded in `schema_version`, or 0 if the table does not
/// exist yet (fresh database).
async fn recorded_version(pool: &SqlitePool) -> sqlx::Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_version")
        .fetch_optional(pool)
        .await
        .or_else(|err| match err {
            sqlx::Error::Database(ref db_err) if db_err.message().contains("no such table") => {
                Ok(None)
            }
            other => Err(other),
        })?;
    Ok(row.map(|(v,)| v).unwrap_or(0))
}

/// Every table name currently present in the database, used for the
/// defensive `satisfied` check.
async fn existing_tables(pool: &SqlitePool) -> sqlx::Result<Vec<String>> {
    let rows: Vec<(String,)> =
        sqlx::query_as("SELECT name FROM sqlite_master WHERE type IN ('table', 'view')")
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().map(|(n,)| n).collect())
}

/// Applies every migration whose version exceeds the recorded version, or
/// whose defensive `satisfied` check fails despite a recorded version.
/// Fatal on error; a broken migration means the process must not serve
/// traffic.
pub async fn apply_migrations(pool: &SqlitePool) -> sqlx::Result<u32> {
    let current = recorded_version(pool).await.unwrap_or(0);
    let tables = existing_tables(pool).await.unwrap_or_default();
    let mut applied = 0;

    for migration in MIGRATIONS {
        let needs_apply = migration.version > current || !(migration.satisfied)(&tables);
        if needs_apply {
            tracing::info!(
                version = migration.version,
                description = migration.description,
                "applying migration"
            );
            sqlx::raw_sql(migration.up).execute(pool).await?;
            applied += 1;
        }
    }

    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_database_applies_every_migration() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        let applied = apply_migrations(&pool).await.unwrap();
        assert_eq!(applied, MIGRATIONS.len() as u32);

        let version = recorded_version(&pool).await.unwrap();
        assert_eq!(version, MIGRATIONS.last().unwrap().version);
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let pool = SqlitePool::connect(":memory:").await.unwrap();
        apply_migrations(&pool).await.unwrap();
        // Running again must not error even though every migration's
        // version is now <= current.
        apply_migrations(&pool).await.unwrap();
    }
}
