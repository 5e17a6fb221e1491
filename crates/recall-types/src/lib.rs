//! Domain types shared across the recall workspace: sessions, observations,
//! summaries, prompts, the in-memory pending-event queue entry, and the
//! event-bus payloads. Every type here is plain data; no I/O, no locking.

pub mod event;
pub mod observation;
pub mod pending;
pub mod prompt;
pub mod query;
pub mod session;
pub mod summary;

pub use event::BusEvent;
pub use observation::{Observation, ObservationFields, ObservationType};
pub use pending::PendingEvent;
pub use prompt::UserPrompt;
pub use query::{Filters, ResultFormat};
pub use session::{Session, SessionStatus};
pub use summary::{SessionSummary, SummaryFields};

/// Entity kind used by the vector index and the unified search surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Observation,
    Summary,
    Prompt,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Observation => "observation",
            EntityKind::Summary => "summary",
            EntityKind::Prompt => "prompt",
        }
    }
}
