//! In-memory state for live sessions: the per-session FIFO event queue, the
//! generator task handle, the prompt counter snapshot, and last-activity.
//! Built around a `DashMap`-backed session table and a guarded-handle
//! lifecycle for a per-session queue plus generator task.

mod state;

pub use state::SessionState;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use recall_types::PendingEvent;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Implemented by `recall-runtime`'s `MemoryAgentRunner` and injected at
/// construction time; `recall-registry` has no dependency on
/// `recall-runtime`, avoiding a crate cycle while still letting
/// `ensure_generator_running` start the real task.
#[async_trait]
pub trait RunnerSpawn: Send + Sync {
    fn spawn(&self, session_db_id: i64, state: Arc<SessionState>) -> JoinHandle<()>;
}

/// Registry of every session with live in-memory state. A session with no
/// entry here is either never-seen or long since drained back to disk;
/// the Store, not this registry, is the durable record.
pub struct SessionRegistry {
    sessions: DashMap<i64, Arc<SessionState>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Creates or refreshes in-memory state for `session_db_id`. Never
    /// starts a generator.
    pub fn initialize(&self, session_db_id: i64, agent_session_id: &str, project: &str, prompt_number: i64) -> Arc<SessionState> {
        let entry = self
            .sessions
            .entry(session_db_id)
            .or_insert_with(|| Arc::new(SessionState::new(agent_session_id, project)));
        entry.prompt_counter.store(prompt_number, Ordering::SeqCst);
        entry.touch();
        entry.set_project(project);
        entry.clone()
    }

    pub fn get(&self, session_db_id: i64) -> Option<Arc<SessionState>> {
        self.sessions.get(&session_db_id).map(|e| e.clone())
    }

    pub async fn queue_observation(&self, session_db_id: i64, event: PendingEvent) {
        if let Some(state) = self.get(session_db_id) {
            state.push(event).await;
        }
    }

    pub async fn queue_summarize(&self, session_db_id: i64, event: PendingEvent) {
        if let Some(state) = self.get(session_db_id) {
            state.push(event).await;
        }
    }

    /// Guarded compare-and-swap start: only the caller that wins gets a
    /// freshly spawned task; everyone else is a no-op, guaranteeing at
    /// most one live generator task per session.
    pub async fn ensure_generator_running(&self, session_db_id: i64, spawner: &dyn RunnerSpawn) {
        let Some(state) = self.get(session_db_id) else {
            return;
        };
        let mut handle_slot = state.handle.lock().await;
        let running = match handle_slot.as_ref() {
            Some(h) => !h.is_finished(),
            None => false,
        };
        if running {
            return;
        }
        *handle_slot = Some(spawner.spawn(session_db_id, state.clone()));
    }

    /// Marks the session complete: sets the flag the runner loop checks to
    /// decide whether a drained queue means "exit".
    pub fn mark_completed(&self, session_db_id: i64) {
        if let Some(state) = self.get(session_db_id) {
            state.mark_completed();
        }
    }

    /// Clears a finished/cancelled generator handle; called by the
    /// runner's completion path on both normal exit and error.
    pub async fn clear_handle(&self, session_db_id: i64) {
        if let Some(state) = self.get(session_db_id) {
            *state.handle.lock().await = None;
        }
    }

    /// Looks up in-memory state by the host's `agent_session_id`. This
    /// crate has no dependency on the Store (by design, to avoid a crate
    /// cycle with `recall-runtime`), so it cannot itself re-hydrate state
    /// for a session this process has never `initialize`d; that fallback
    /// lives in `recall-server`'s ingestion handlers, which always call
    /// `initialize` (idempotent) after a Store lookup before touching the
    /// registry further.
    pub async fn resolve_session(&self, agent_session_id: &str) -> Option<Arc<SessionState>> {
        for entry in self.sessions.iter() {
            if entry.value().agent_session_id == agent_session_id {
                return Some(entry.value().clone());
            }
        }
        None
    }

    pub async fn total_active_work(&self) -> usize {
        let mut total = 0;
        for entry in self.sessions.iter() {
            total += entry.value().queue_depth().await;
            if entry.value().is_running().await {
                total += 1;
            }
        }
        total
    }

    /// Cancels every live task, drains queues, and returns the ids of
    /// sessions that were still active so the caller can mark them failed
    /// in the Store.
    pub async fn shutdown_all(&self) -> Vec<i64> {
        let mut interrupted = Vec::new();
        for entry in self.sessions.iter() {
            let id = *entry.key();
            let state = entry.value();
            let mut handle_slot = state.handle.lock().await;
            if let Some(handle) = handle_slot.take() {
                handle.abort();
                interrupted.push(id);
            }
            state.clear().await;
        }
        interrupted
    }

    pub fn last_activity_snapshot(&self) -> Vec<(i64, chrono::DateTime<Utc>)> {
        self.sessions
            .iter()
            .map(|e| (*e.key(), e.value().last_activity_blocking()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_types::pending::{ObservationEvent, SummarizeEvent};
    use tokio::sync::Mutex as AsyncMutex;

    struct NoopSpawn {
        spawned: AsyncMutex<u32>,
    }

    #[async_trait]
    impl RunnerSpawn for NoopSpawn {
        fn spawn(&self, _session_db_id: i64, _state: Arc<SessionState>) -> JoinHandle<()> {
            tokio::spawn(async move {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            })
        }
    }

    #[tokio::test]
    async fn ensure_generator_running_is_guarded_cas() {
        let registry = SessionRegistry::new();
        registry.initialize(1, "agent-a", "demo", 1);
        let spawner = NoopSpawn {
            spawned: AsyncMutex::new(0),
        };

        registry.ensure_generator_running(1, &spawner).await;
        registry.ensure_generator_running(1, &spawner).await;

        let state = registry.get(1).unwrap();
        assert!(state.handle.lock().await.is_some());
    }

    #[tokio::test]
    async fn queue_preserves_fifo_order() {
        let registry = SessionRegistry::new();
        registry.initialize(2, "agent-b", "demo", 1);

        for i in 0..5 {
            registry
                .queue_observation(
                    2,
                    PendingEvent::Observation(ObservationEvent {
                        tool_name: format!("tool-{i}"),
                        tool_input: serde_json::json!({}),
                        tool_response: serde_json::json!({}),
                        cwd: None,
                        prompt_number: Some(i),
                    }),
                )
                .await;
        }

        let state = registry.get(2).unwrap();
        for i in 0..5 {
            match state.next_event().await.unwrap() {
                PendingEvent::Observation(obs) => assert_eq!(obs.tool_name, format!("tool-{i}")),
                _ => panic!("expected observation event"),
            }
        }
    }

    #[tokio::test]
    async fn drained_and_completed_queue_ends_consumption() {
        let registry = SessionRegistry::new();
        registry.initialize(3, "agent-c", "demo", 1);
        registry
            .queue_summarize(
                3,
                PendingEvent::Summarize(SummarizeEvent {
                    last_user_message: None,
                    last_assistant_message: None,
                    prompt_number: None,
                }),
            )
            .await;
        registry.mark_completed(3);

        let state = registry.get(3).unwrap();
        assert!(state.next_event().await.is_some());
        assert!(state.next_event().await.is_none());
    }
}
