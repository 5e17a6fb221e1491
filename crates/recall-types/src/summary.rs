use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A progress checkpoint for a session. Multiple summaries per session are
/// expected; one per summarize request; and none are ever rejected for
/// missing fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
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
    pub created_at: DateTime<Utc>,
}

/// Fields the summary parser in `recall-runtime` extracts from generator
/// XML, before a row id / timestamp exist. All fields are optional; a
/// summary with every field empty is still a valid record, since a
/// summarize request with zero observations must still produce a row.
#[derive(Debug, Clone, Default)]
pub struct SummaryFields {
    pub request: Option<String>,
    pub investigated: Option<String>,
    pub learned: Option<String>,
    pub completed: Option<String>,
    pub next_steps: Option<String>,
    pub notes: Option<String>,
}
