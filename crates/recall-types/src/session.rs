use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A session's lifecycle is monotone: `Active` moves to exactly one of
/// `Completed` or `Failed` and never moves back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn from_str_lenient(raw: &str) -> Self {
        match raw {
            "completed" => SessionStatus::Completed,
            "failed" => SessionStatus::Failed,
            _ => SessionStatus::Active,
        }
    }
}

/// One conversation on one host platform for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub agent_session_id: String,
    pub platform: String,
    pub project: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: SessionStatus,
    pub prompt_counter: i64,
    pub user_prompt: Option<String>,
    pub worker_port: Option<i32>,
}
