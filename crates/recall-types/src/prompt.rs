use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded prompt turn. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserPrompt {
    pub id: i64,
    pub agent_session_id: String,
    pub prompt_number: i64,
    pub prompt_text: String,
    pub created_at: DateTime<Utc>,
}
