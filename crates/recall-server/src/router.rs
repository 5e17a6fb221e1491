//! Route table: flat `.route(path, method(handler))` calls,
//! one `with_state`, CORS permissive for any host-adapter origin.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health_check, ingest, query, stream};
use crate::state::AppState;

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/sessions/ensure", post(ingest::ensure_session))
        .route("/api/observations", post(ingest::observe))
        .route("/api/sessions/summarize", post(ingest::summarize))
        .route("/api/sessions/complete", post(ingest::complete))
        .route("/api/context/:project", get(query::context))
        .route("/api/search", get(query::search))
        .route("/api/timeline", get(query::timeline))
        .route("/api/observation/:id", get(query::get_observation))
        .route("/api/session/:id", get(query::get_session))
        .route("/api/prompt/:id", get(query::get_prompt))
        .route("/api/stats", get(query::stats))
        .route("/api/processing-status", get(query::processing_status))
        .route("/stream", get(stream::stream))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
