use chrono::{DateTime, Utc};
use recall_types::PendingEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::RwLock as SyncRwLock;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

/// Live in-memory state for one session: its FIFO queue, the generator
/// task handle (if any), the prompt counter snapshot, and last-activity.
pub struct SessionState {
    pub agent_session_id: String,
    project: SyncRwLock<String>,
    queue: Mutex<VecDeque<PendingEvent>>,
    notify: Notify,
    pub(crate) handle: Mutex<Option<JoinHandle<()>>>,
    pub prompt_counter: AtomicI64,
    completed: AtomicBool,
    last_activity: SyncRwLock<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(agent_session_id: &str, project: &str) -> Self {
        Self {
            agent_session_id: agent_session_id.to_string(),
            project: SyncRwLock::new(project.to_string()),
            queue: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            handle: Mutex::new(None),
            prompt_counter: AtomicI64::new(0),
            completed: AtomicBool::new(false),
            last_activity: SyncRwLock::new(Utc::now()),
        }
    }

    pub fn project(&self) -> String {
        self.project.read().unwrap().clone()
    }

    pub fn set_project(&self, project: &str) {
        if !project.trim().is_empty() {
            *self.project.write().unwrap() = project.to_string();
        }
    }

    pub fn touch(&self) {
        *self.last_activity.write().unwrap() = Utc::now();
    }

    pub fn last_activity_blocking(&self) -> DateTime<Utc> {
        *self.last_activity.read().unwrap()
    }

    /// Pushes an event onto the FIFO queue and wakes a waiting consumer.
    /// Events for a given session are always dequeued in push order.
    pub async fn push(&self, event: PendingEvent) {
        self.queue.lock().await.push_back(event);
        self.touch();
        self.notify.notify_one();
    }

    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    pub async fn is_running(&self) -> bool {
        match self.handle.lock().await.as_ref() {
            Some(h) => !h.is_finished(),
            None => false,
        }
    }

    /// Marks the session complete: once the queue drains, `next_event`
    /// returns `None` instead of waiting forever.
    pub fn mark_completed(&self) {
        self.completed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Awaits the next queued event, or returns `None` once the queue is
    /// empty and the session has been marked complete; the signal the
    /// generator task's main loop uses to exit cleanly.
    pub async fn next_event(&self) -> Option<PendingEvent> {
        loop {
            // Create the `Notified` future before checking queue/completed:
            // it captures the current notify state, so a `notify_waiters`
            // (which stores no permit) fired after this point but before
            // the `.await` below still wakes it, instead of being missed.
            let notified = self.notify.notified();
            if let Some(event) = self.queue.lock().await.pop_front() {
                return Some(event);
            }
            if self.completed.load(Ordering::SeqCst) {
                return None;
            }
            notified.await;
        }
    }

    pub async fn clear(&self) {
        self.queue.lock().await.clear();
        self.completed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }
}
