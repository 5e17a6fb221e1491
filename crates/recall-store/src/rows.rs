//! Raw row shapes as `sqlx::FromRow` sees them, plus `into_domain`
//! conversions into the `recall_types` structs callers actually want. JSON
//! array columns and timestamps are stored as TEXT and parsed explicitly
//! rather than leaned on sqlx's implicit chrono/json decoding, so a
//! malformed row degrades to an empty value instead of failing the query.

use chrono::{DateTime, Utc};
use recall_types::{
    Observation, ObservationType, Session, SessionStatus, SessionSummary, UserPrompt,
};
use sqlx::FromRow;

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_string_list(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_default()
}

pub(crate) fn encode_string_list(values: &[String]) -> String {
    serde_json::to_string(values).unwrap_or_else(|_| "[]".to_string())
}

#[derive(Debug, FromRow)]
pub struct SessionRow {
    pub id: i64,
    pub agent_session_id: String,
    pub platform: String,
    pub project: String,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub status: String,
    pub prompt_counter: i64,
    pub user_prompt: Option<String>,
    pub worker_port: Option<i64>,
}

impl SessionRow {
    pub fn into_domain(self) -> Session {
        Session {
            id: self.id,
            agent_session_id: self.agent_session_id,
            platform: self.platform,
            project: self.project,
            started_at: parse_timestamp(&self.started_at),
            completed_at: self.completed_at.as_deref().map(parse_timestamp),
            status: SessionStatus::from_str_lenient(&self.status),
            prompt_counter: self.prompt_counter,
            user_prompt: self.user_prompt,
            worker_port: self.worker_port.map(|p| p as i32),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct UserPromptRow {
    pub id: i64,
    pub agent_session_id: String,
    pub prompt_number: i64,
    pub prompt_text: String,
    pub created_at: String,
}

impl UserPromptRow {
    pub fn into_domain(self) -> UserPrompt {
        UserPrompt {
            id: self.id,
            agent_session_id: self.agent_session_id,
            prompt_number: self.prompt_number,
            prompt_text: self.prompt_text,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct ObservationRow {
    pub id: i64,
    pub sdk_session_id: String,
    pub project: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub narrative: Option<String>,
    pub facts: String,
    pub concepts: String,
    pub files_read: String,
    pub files_modified: String,
    pub prompt_number: Option<i64>,
    pub discovery_tokens: i64,
    pub created_at: String,
}

impl ObservationRow {
    pub fn into_domain(self) -> Observation {
        Observation {
            id: self.id,
            sdk_session_id: self.sdk_session_id,
            project: self.project,
            kind: ObservationType::coerce(&self.kind),
            title: self.title,
            subtitle: self.subtitle,
            narrative: self.narrative,
            facts: parse_string_list(&self.facts),
            concepts: parse_string_list(&self.concepts),
            files_read: parse_string_list(&self.files_read),
            files_modified: parse_string_list(&self.files_modified),
            prompt_number: self.prompt_number,
            discovery_tokens: self.discovery_tokens,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SummaryRow {
    pub id: i64,
    pub sdk_session_id: String,
    pub project: String,
    pub request: Option<String>,
    pub investigated: Option<String>,
    pub learned: Option<String>,
    pub completed: Option<String>,
    pub next_steps: Option<String>,
    pub notes: Option<String>,
    pub prompt_number: Option<i64>,
    pub discovery_tokens: i64,
    pub created_at: String,
}

impl SummaryRow {
    pub fn into_domain(self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            sdk_session_id: self.sdk_session_id,
            project: self.project,
            request: self.request,
            investigated: self.investigated,
            learned: self.learned,
            completed: self.completed,
            next_steps: self.next_steps,
            notes: self.notes,
            prompt_number: self.prompt_number,
            discovery_tokens: self.discovery_tokens,
            created_at: parse_timestamp(&self.created_at),
        }
    }
}
