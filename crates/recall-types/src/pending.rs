use serde_json::Value;

/// One queued tool execution or summarize request awaiting processing by
/// the generator. In-memory only; never persisted across a restart; a
/// restart's acceptable data-loss window is exactly the current in-flight
/// queue (per the design notes this crate implements).
#[derive(Debug, Clone)]
pub enum PendingEvent {
    Observation(ObservationEvent),
    Summarize(SummarizeEvent),
}

#[derive(Debug, Clone)]
pub struct ObservationEvent {
    pub tool_name: String,
    pub tool_input: Value,
    pub tool_response: Value,
    pub cwd: Option<String>,
    pub prompt_number: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct SummarizeEvent {
    pub last_user_message: Option<String>,
    pub last_assistant_message: Option<String>,
    pub prompt_number: Option<i64>,
}
