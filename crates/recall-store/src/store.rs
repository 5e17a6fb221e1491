use chrono::{DateTime, Duration, Utc};
use recall_types::{Filters, Observation, ObservationFields, SessionSummary, SummaryFields, UserPrompt};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::migrations::apply_migrations;
use crate::rows::{encode_string_list, ObservationRow, SessionRow, SummaryRow, UserPromptRow};

/// Text-based retrieval never reaches further back than this (P7).
pub const RECENCY_WINDOW: Duration = Duration::days(90);

#[derive(Debug, Clone)]
pub struct EnsureSessionResult {
    pub id: i64,
    pub prompt_number: i64,
    pub created: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum TimelineAnchor {
    Id(i64),
    Timestamp(DateTime<Utc>),
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Timeline {
    pub observations: Vec<Observation>,
    pub summaries: Vec<SessionSummary>,
    pub prompts: Vec<UserPrompt>,
}

/// Durable relational storage with write-ahead logging and full-text
/// indices over prompts, observations, and summaries. Owns every persisted
/// row; no other component writes to the database file.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens (creating if absent) the SQLite database at `database_url`
    /// (e.g. `sqlite://./data/recall.db`), enables WAL, and applies every
    /// pending migration. Migration failure is fatal; the caller should
    /// let this error abort startup.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::Sqlx)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(options)
            .await?;

        apply_migrations(&pool).await.map_err(StoreError::Migration)?;

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub async fn in_memory() -> StoreResult<Self> {
        let pool = SqlitePool::connect(":memory:").await?;
        apply_migrations(&pool).await.map_err(StoreError::Migration)?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Upserts the session row for `agent_session_id`. On first sight,
    /// inserts with `prompt_counter = 1`; on a repeat, increments the
    /// counter, always records `user_prompt` when given, and updates
    /// `project` only when `project` is non-empty (P3, P6).
    pub async fn ensure_session(
        &self,
        agent_session_id: &str,
        platform: &str,
        project: &str,
        user_prompt: Option<&str>,
    ) -> StoreResult<EnsureSessionResult> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64, i64)> = sqlx::query_as(
            "SELECT id, prompt_counter FROM sessions WHERE agent_session_id = ?",
        )
        .bind(agent_session_id)
        .fetch_optional(&mut *tx)
        .await?;

        let now = Utc::now().to_rfc3339();

        let (id, prompt_number, created) = match existing {
            None => {
                let rec = sqlx::query(
                    "INSERT INTO sessions (agent_session_id, platform, project, started_at, \
                     status, prompt_counter, user_prompt) VALUES (?, ?, ?, ?, 'active', 1, ?)",
                )
                .bind(agent_session_id)
                .bind(platform)
                .bind(project)
                .bind(&now)
                .bind(user_prompt)
                .execute(&mut *tx)
                .await?;
                (rec.last_insert_rowid(), 1, true)
            }
            Some((id, counter)) => {
                let next_counter = counter + 1;
                if project.trim().is_empty() {
                    sqlx::query(
                        "UPDATE sessions SET prompt_counter = ?, user_prompt = COALESCE(?, user_prompt) WHERE id = ?",
                    )
                    .bind(next_counter)
                    .bind(user_prompt)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                } else {
                    sqlx::query(
                        "UPDATE sessions SET prompt_counter = ?, project = ?, user_prompt = COALESCE(?, user_prompt) WHERE id = ?",
                    )
                    .bind(next_counter)
                    .bind(project)
                    .bind(user_prompt)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                (id, next_counter, false)
            }
        };

        if let Some(text) = user_prompt.filter(|t| !t.trim().is_empty()) {
            sqlx::query(
                "INSERT INTO user_prompts (agent_session_id, prompt_number, prompt_text, created_at) \
                 VALUES (?, ?, ?, ?)",
            )
            .bind(agent_session_id)
            .bind(prompt_number)
            .bind(text)
            .bind(&now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(EnsureSessionResult {
            id,
            prompt_number,
            created,
        })
    }

    pub async fn get_session_by_agent_id(&self, agent_session_id: &str) -> StoreResult<Option<recall_types::Session>> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, agent_session_id, platform, project, started_at, completed_at, status, \
             prompt_counter, user_prompt, worker_port FROM sessions WHERE agent_session_id = ?",
        )
        .bind(agent_session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SessionRow::into_domain))
    }

    pub async fn get_session_by_id(&self, id: i64) -> StoreResult<recall_types::Session> {
        let row: Option<SessionRow> = sqlx::query_as(
            "SELECT id, agent_session_id, platform, project, started_at, completed_at, status, \
             prompt_counter, user_prompt, worker_port FROM sessions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SessionRow::into_domain)
            .ok_or_else(|| StoreError::NotFound(format!("session {id}")))
    }

    pub async fn store_observation(
        &self,
        sdk_session_id: &str,
        project: &str,
        fields: &ObservationFields,
        prompt_number: Option<i64>,
        discovery_tokens: i64,
    ) -> StoreResult<(i64, DateTime<Utc>)> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let kind = fields.resolved_kind();
        let concepts = fields.purified_concepts();

        let rec = sqlx::query(
            "INSERT INTO observations (sdk_session_id, project, type, title, subtitle, narrative, \
             facts, concepts, files_read, files_modified, prompt_number, discovery_tokens, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sdk_session_id)
        .bind(project)
        .bind(kind.as_str())
        .bind(&fields.title)
        .bind(&fields.subtitle)
        .bind(&fields.narrative)
        .bind(encode_string_list(&fields.facts))
        .bind(encode_string_list(&concepts))
        .bind(encode_string_list(&fields.files_read))
        .bind(encode_string_list(&fields.files_modified))
        .bind(prompt_number)
        .bind(discovery_tokens)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok((rec.last_insert_rowid(), now))
    }

    pub async fn store_summary(
        &self,
        sdk_session_id: &str,
        project: &str,
        fields: &SummaryFields,
        prompt_number: Option<i64>,
        discovery_tokens: i64,
    ) -> StoreResult<(i64, DateTime<Utc>)> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        let rec = sqlx::query(
            "INSERT INTO summaries (sdk_session_id, project, request, investigated, learned, \
             completed, next_steps, notes, prompt_number, discovery_tokens, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(sdk_session_id)
        .bind(project)
        .bind(&fields.request)
        .bind(&fields.investigated)
        .bind(&fields.learned)
        .bind(&fields.completed)
        .bind(&fields.next_steps)
        .bind(&fields.notes)
        .bind(prompt_number)
        .bind(discovery_tokens)
        .bind(&now_str)
        .execute(&self.pool)
        .await?;

        Ok((rec.last_insert_rowid(), now))
    }

    pub async fn get_recent_observations(&self, project: Option<&str>, limit: i64) -> StoreResult<Vec<Observation>> {
        let rows: Vec<ObservationRow> = match project {
            Some(p) => {
                sqlx::query_as(
                    "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, \
                     concepts, files_read, files_modified, prompt_number, discovery_tokens, created_at \
                     FROM observations WHERE project = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, \
                     concepts, files_read, files_modified, prompt_number, discovery_tokens, created_at \
                     FROM observations ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(ObservationRow::into_domain).collect())
    }

    pub async fn get_recent_summaries(&self, project: Option<&str>, limit: i64) -> StoreResult<Vec<SessionSummary>> {
        let rows: Vec<SummaryRow> = match project {
            Some(p) => {
                sqlx::query_as(
                    "SELECT id, sdk_session_id, project, request, investigated, learned, completed, \
                     next_steps, notes, prompt_number, discovery_tokens, created_at \
                     FROM summaries WHERE project = ? ORDER BY created_at DESC LIMIT ?",
                )
                .bind(p)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT id, sdk_session_id, project, request, investigated, learned, completed, \
                     next_steps, notes, prompt_number, discovery_tokens, created_at \
                     FROM summaries ORDER BY created_at DESC LIMIT ?",
                )
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.into_iter().map(SummaryRow::into_domain).collect())
    }

    /// Direct metadata filtering, used by `QueryEngine` when no `text` is
    /// given and as the FTS fallback's post-filter.
    pub async fn filter_observations(&self, filters: &Filters, limit: i64) -> StoreResult<Vec<Observation>> {
        let mut sql = String::from(
            "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, concepts, \
             files_read, files_modified, prompt_number, discovery_tokens, created_at FROM observations WHERE 1=1",
        );
        let mut binds: Vec<String> = Vec::new();

        if let Some(project) = &filters.project {
            sql.push_str(" AND project = ?");
            binds.push(project.clone());
        }
        if let Some(kind) = &filters.kind {
            sql.push_str(" AND type = ?");
            binds.push(kind.as_str().to_string());
        }
        if let Some((start, end)) = &filters.date_range {
            sql.push_str(" AND created_at >= ? AND created_at <= ?");
            binds.push(start.to_rfc3339());
            binds.push(end.to_rfc3339());
        }
        sql.push_str(" ORDER BY created_at DESC LIMIT ?");

        let mut query = sqlx::query_as::<_, ObservationRow>(&sql);
        for bind in &binds {
            query = query.bind(bind);
        }
        query = query.bind(limit);

        let rows = query.fetch_all(&self.pool).await?;
        let mut observations: Vec<Observation> = rows.into_iter().map(ObservationRow::into_domain).collect();

        // concepts/files filters are JSON-array membership checks that do
        // not translate cleanly to SQL over a text column; applied in
        // memory after the SQL-filterable predicates narrow the set.
        if !filters.concepts.is_empty() {
            observations.retain(|o| filters.concepts.iter().all(|c| o.concepts.contains(c)));
        }
        if !filters.files.is_empty() {
            observations.retain(|o| {
                filters
                    .files
                    .iter()
                    .all(|f| o.files_read.contains(f) || o.files_modified.contains(f))
            });
        }

        Ok(observations)
    }

    /// Full-text search over observation title/subtitle/narrative/facts/
    /// concepts, restricted to the recency window unless `since` overrides
    /// it (an explicit `dateRange` per P7).
    pub async fn search_observations_fts(
        &self,
        query_text: &str,
        project: Option<&str>,
        since: Option<DateTime<Utc>>,
        limit: i64,
    ) -> StoreResult<Vec<Observation>> {
        let cutoff = since.unwrap_or_else(|| Utc::now() - RECENCY_WINDOW).to_rfc3339();
        let rows: Vec<ObservationRow> = sqlx::query_as(
            "SELECT o.id, o.sdk_session_id, o.project, o.type, o.title, o.subtitle, o.narrative, \
             o.facts, o.concepts, o.files_read, o.files_modified, o.prompt_number, o.discovery_tokens, \
             o.created_at FROM observations o \
             JOIN observations_fts f ON f.rowid = o.id \
             WHERE observations_fts MATCH ? AND o.created_at >= ? \
             ORDER BY o.created_at DESC LIMIT ?",
        )
        .bind(query_text)
        .bind(&cutoff)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut observations: Vec<Observation> = rows.into_iter().map(ObservationRow::into_domain).collect();
        if let Some(p) = project {
            observations.retain(|o| o.project == p);
        }
        Ok(observations)
    }

    pub async fn search_summaries_fts(
        &self,
        query_text: &str,
        project: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<SessionSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT s.id, s.sdk_session_id, s.project, s.request, s.investigated, s.learned, \
             s.completed, s.next_steps, s.notes, s.prompt_number, s.discovery_tokens, s.created_at \
             FROM summaries s JOIN summaries_fts f ON f.rowid = s.id \
             WHERE summaries_fts MATCH ? ORDER BY s.created_at DESC LIMIT ?",
        )
        .bind(query_text)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries: Vec<SessionSummary> = rows.into_iter().map(SummaryRow::into_domain).collect();
        if let Some(p) = project {
            summaries.retain(|s| s.project == p);
        }
        Ok(summaries)
    }

    pub async fn search_prompts_fts(&self, query_text: &str, limit: i64) -> StoreResult<Vec<UserPrompt>> {
        let rows: Vec<UserPromptRow> = sqlx::query_as(
            "SELECT p.id, p.agent_session_id, p.prompt_number, p.prompt_text, p.created_at \
             FROM user_prompts p JOIN prompts_fts f ON f.rowid = p.id \
             WHERE prompts_fts MATCH ? ORDER BY p.created_at DESC LIMIT ?",
        )
        .bind(query_text)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(UserPromptRow::into_domain).collect())
    }

    pub async fn fetch_observations_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<Observation>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, concepts, \
             files_read, files_modified, prompt_number, discovery_tokens, created_at \
             FROM observations WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, ObservationRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(ObservationRow::into_domain).collect())
    }

    pub async fn fetch_summaries_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<SessionSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, sdk_session_id, project, request, investigated, learned, completed, \
             next_steps, notes, prompt_number, discovery_tokens, created_at \
             FROM summaries WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, SummaryRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(SummaryRow::into_domain).collect())
    }

    pub async fn fetch_prompts_by_ids(&self, ids: &[i64]) -> StoreResult<Vec<UserPrompt>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, agent_session_id, prompt_number, prompt_text, created_at \
             FROM user_prompts WHERE id IN ({placeholders})"
        );
        let mut query = sqlx::query_as::<_, UserPromptRow>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(UserPromptRow::into_domain).collect())
    }

    pub async fn get_observation_by_id(&self, id: i64) -> StoreResult<Observation> {
        let rows = self.fetch_observations_by_ids(&[id]).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("observation {id}")))
    }

    pub async fn get_prompt_by_id(&self, id: i64) -> StoreResult<UserPrompt> {
        let rows = self.fetch_prompts_by_ids(&[id]).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("prompt {id}")))
    }

    /// Interleaves observations, summaries, and prompts into one
    /// chronological window around `anchor`. With an id anchor, ordering is
    /// id-based; with a timestamp anchor, ordering is time-based.
    pub async fn get_timeline_around(
        &self,
        anchor: TimelineAnchor,
        depth_before: i64,
        depth_after: i64,
        project: Option<&str>,
    ) -> StoreResult<Timeline> {
        let anchor_observation = match anchor {
            TimelineAnchor::Id(id) => self.get_observation_by_id(id).await.ok(),
            TimelineAnchor::Timestamp(_) => None,
        };
        let anchor_ts = match anchor {
            TimelineAnchor::Timestamp(ts) => ts,
            TimelineAnchor::Id(_) => anchor_observation
                .as_ref()
                .map(|o| o.created_at)
                .unwrap_or_else(Utc::now),
        };
        let anchor_str = anchor_ts.to_rfc3339();

        let before = self
            .timeline_side(&anchor_str, project, depth_before, true)
            .await?;
        let after = self
            .timeline_side(&anchor_str, project, depth_after, false)
            .await?;

        let mut observations = before.0;
        // The anchor record itself is always included, independent of
        // depth_before/depth_after (depth=0,0 still returns the anchor).
        if let Some(anchor_obs) = anchor_observation {
            observations.push(anchor_obs);
        }
        observations.extend(after.0);
        let mut summaries = before.1;
        summaries.extend(after.1);
        let mut prompts = before.2;
        prompts.extend(after.2);

        observations.sort_by_key(|o| o.created_at);
        summaries.sort_by_key(|s| s.created_at);
        prompts.sort_by_key(|p| p.created_at);

        Ok(Timeline {
            observations,
            summaries,
            prompts,
        })
    }

    async fn timeline_side(
        &self,
        anchor_str: &str,
        project: Option<&str>,
        depth: i64,
        before: bool,
    ) -> StoreResult<(Vec<Observation>, Vec<SessionSummary>, Vec<UserPrompt>)> {
        if depth <= 0 {
            return Ok((Vec::new(), Vec::new(), Vec::new()));
        }
        let (cmp, order) = if before { ("<", "DESC") } else { (">", "ASC") };
        // depth acts as a soft over-fetch bound; the project filter (when
        // present) is applied in memory so a single query shape works for
        // both the filtered and unfiltered case.
        let fetch_limit = depth * 4 + 10;

        let obs_sql = format!(
            "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, concepts, \
             files_read, files_modified, prompt_number, discovery_tokens, created_at FROM observations \
             WHERE created_at {cmp} ? ORDER BY created_at {order} LIMIT ?"
        );
        let observations: Vec<ObservationRow> = sqlx::query_as(&obs_sql)
            .bind(anchor_str)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?;

        let sum_sql = format!(
            "SELECT id, sdk_session_id, project, request, investigated, learned, completed, \
             next_steps, notes, prompt_number, discovery_tokens, created_at FROM summaries \
             WHERE created_at {cmp} ? ORDER BY created_at {order} LIMIT ?"
        );
        let summaries: Vec<SummaryRow> = sqlx::query_as(&sum_sql)
            .bind(anchor_str)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?;

        let prompt_sql = format!(
            "SELECT id, agent_session_id, prompt_number, prompt_text, created_at FROM user_prompts \
             WHERE created_at {cmp} ? ORDER BY created_at {order} LIMIT ?"
        );
        let prompts: Vec<UserPromptRow> = sqlx::query_as(&prompt_sql)
            .bind(anchor_str)
            .bind(fetch_limit)
            .fetch_all(&self.pool)
            .await?;

        let mut observations: Vec<Observation> =
            observations.into_iter().map(ObservationRow::into_domain).collect();
        let mut summaries: Vec<SessionSummary> = summaries.into_iter().map(SummaryRow::into_domain).collect();
        let mut prompts: Vec<UserPrompt> = prompts.into_iter().map(UserPromptRow::into_domain).collect();

        if let Some(p) = project {
            observations.retain(|o| o.project == p);
            summaries.retain(|s| s.project == p);
        }
        observations.truncate(depth as usize);
        summaries.truncate(depth as usize);
        prompts.truncate(depth as usize);

        Ok((observations, summaries, prompts))
    }

    pub async fn get_unique_projects(&self) -> StoreResult<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT project FROM sessions WHERE TRIM(project) != '' ORDER BY project",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(p,)| p).collect())
    }

    pub async fn mark_complete(&self, session_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET status = 'completed', completed_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_failed(&self, session_id: i64) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET status = 'failed', completed_at = ? WHERE id = ?")
            .bind(Utc::now().to_rfc3339())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Per-entity-kind, per-project row counts for `/api/stats`.
    pub async fn stats(&self) -> StoreResult<Vec<(String, String, i64)>> {
        let mut out = Vec::new();
        let obs: Vec<(String, i64)> =
            sqlx::query_as("SELECT project, COUNT(*) FROM observations GROUP BY project")
                .fetch_all(&self.pool)
                .await?;
        out.extend(obs.into_iter().map(|(p, c)| ("observations".to_string(), p, c)));

        let sums: Vec<(String, i64)> =
            sqlx::query_as("SELECT project, COUNT(*) FROM summaries GROUP BY project")
                .fetch_all(&self.pool)
                .await?;
        out.extend(sums.into_iter().map(|(p, c)| ("summaries".to_string(), p, c)));

        let sessions: Vec<(String, i64)> =
            sqlx::query_as("SELECT project, COUNT(*) FROM sessions GROUP BY project")
                .fetch_all(&self.pool)
                .await?;
        out.extend(sessions.into_iter().map(|(p, c)| ("sessions".to_string(), p, c)));

        Ok(out)
    }

    /// Vector sync watermark accessors: the id of the highest row of `kind`
    /// already mirrored into the vector index, used by the startup
    /// self-heal scan.
    pub async fn vector_watermark(&self, kind: &str) -> StoreResult<i64> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT last_synced_id FROM vector_sync_state WHERE kind = ?")
                .bind(kind)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(v,)| v).unwrap_or(0))
    }

    pub async fn set_vector_watermark(&self, kind: &str, id: i64) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO vector_sync_state (kind, last_synced_id) VALUES (?, ?) \
             ON CONFLICT(kind) DO UPDATE SET last_synced_id = excluded.last_synced_id",
        )
        .bind(kind)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn observations_after(&self, since_id: i64, batch: i64) -> StoreResult<Vec<Observation>> {
        let rows: Vec<ObservationRow> = sqlx::query_as(
            "SELECT id, sdk_session_id, project, type, title, subtitle, narrative, facts, concepts, \
             files_read, files_modified, prompt_number, discovery_tokens, created_at \
             FROM observations WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(since_id)
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(ObservationRow::into_domain).collect())
    }

    pub async fn summaries_after(&self, since_id: i64, batch: i64) -> StoreResult<Vec<SessionSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(
            "SELECT id, sdk_session_id, project, request, investigated, learned, completed, \
             next_steps, notes, prompt_number, discovery_tokens, created_at \
             FROM summaries WHERE id > ? ORDER BY id ASC LIMIT ?",
        )
        .bind(since_id)
        .bind(batch)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(SummaryRow::into_domain).collect())
    }
}
