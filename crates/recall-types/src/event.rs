use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// State-change events fanned out to viewers over `/stream`. Closed set;
/// the protocol layer never invents new variants on the fly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BusEvent {
    SessionStarted {
        session_db_id: i64,
        project: String,
    },
    ObservationQueued {
        session_db_id: i64,
    },
    ObservationStored {
        session_db_id: i64,
        id: i64,
    },
    SummaryStored {
        session_db_id: i64,
        id: i64,
    },
    ProcessingStatus {
        is_processing: bool,
        queue_depth: usize,
    },
    SessionCompleted {
        session_db_id: i64,
        timestamp: DateTime<Utc>,
    },
}

impl BusEvent {
    /// The SSE `event:` field name, also used as the JSON `event` tag.
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::SessionStarted { .. } => "session_started",
            BusEvent::ObservationQueued { .. } => "observation_queued",
            BusEvent::ObservationStored { .. } => "observation_stored",
            BusEvent::SummaryStored { .. } => "summary_stored",
            BusEvent::ProcessingStatus { .. } => "processing_status",
            BusEvent::SessionCompleted { .. } => "session_completed",
        }
    }
}
