//! Shared application state, injected via axum's `State` extractor; no
//! global singletons.

use std::sync::Arc;

use recall_bus::EventBus;
use recall_query::QueryEngine;
use recall_registry::{RunnerSpawn, SessionRegistry};
use recall_runtime::SkipList;
use recall_store::Store;
use recall_vector::VectorIndex;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub vector: Arc<dyn VectorIndex>,
    pub bus: EventBus,
    pub registry: Arc<SessionRegistry>,
    pub query: QueryEngine,
    pub skip_list: SkipList,
    pub runner: Arc<dyn RunnerSpawn>,
    pub default_context_limit: i64,
}
