//! Ingestion surface: session lifecycle and tool-event
//! intake. Every handler writes to the `Store` synchronously (the
//! user-visible success criterion) and only *enqueues* generator work;
//! generation itself is best-effort and never turns into a 5xx.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use recall_types::pending::{ObservationEvent, SummarizeEvent};
use recall_types::{BusEvent, PendingEvent};

use crate::error::ApiError;
use crate::state::AppState;

fn require(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        Err(ApiError::Validation(format!("{field} is required")))
    } else {
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct EnsureSessionRequest {
    pub agent_session_id: String,
    pub platform: String,
    pub project: String,
    #[serde(default)]
    pub user_prompt: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct EnsureSessionResponse {
    pub id: i64,
    pub prompt_number: i64,
    pub created: bool,
}

pub async fn ensure_session(
    State(state): State<AppState>,
    Json(req): Json<EnsureSessionRequest>,
) -> Result<Json<EnsureSessionResponse>, ApiError> {
    require("agent_session_id", &req.agent_session_id)?;
    require("platform", &req.platform)?;
    require("project", &req.project)?;

    let result = state
        .store
        .ensure_session(&req.agent_session_id, &req.platform, &req.project, req.user_prompt.as_deref())
        .await?;

    state
        .registry
        .initialize(result.id, &req.agent_session_id, &req.project, result.prompt_number);

    if result.created {
        state
            .bus
            .publish(BusEvent::SessionStarted {
                session_db_id: result.id,
                project: req.project.clone(),
            })
            .await;
    }

    Ok(Json(EnsureSessionResponse {
        id: result.id,
        prompt_number: result.prompt_number,
        created: result.created,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ObservationRequest {
    pub agent_session_id: String,
    pub platform: String,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: Value,
    #[serde(default)]
    pub tool_response: Value,
    #[serde(default)]
    pub cwd: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ObservationResponse {
    pub status: &'static str,
    pub id: i64,
    pub prompt_number: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

/// `POST /api/observations`: enqueues the tool event unless the tool name
/// falls in the configured skip-set, in which case it is an ingestion-soft
/// success, not an error.
pub async fn observe(
    State(state): State<AppState>,
    Json(req): Json<ObservationRequest>,
) -> Result<Json<ObservationResponse>, ApiError> {
    require("agent_session_id", &req.agent_session_id)?;
    require("platform", &req.platform)?;
    require("tool_name", &req.tool_name)?;

    let session = resolve_session(&state, &req.agent_session_id).await?;

    if state.skip_list.should_skip(&req.tool_name) {
        return Ok(Json(ObservationResponse {
            status: "skipped",
            id: session.id,
            prompt_number: session.prompt_counter,
            reason: Some("tool name is in the observation skip-set"),
        }));
    }

    state
        .registry
        .queue_observation(
            session.id,
            PendingEvent::Observation(ObservationEvent {
                tool_name: req.tool_name,
                tool_input: req.tool_input,
                tool_response: req.tool_response,
                cwd: req.cwd,
                prompt_number: Some(session.prompt_counter),
            }),
        )
        .await;

    publish_and_start(&state, session.id).await;

    Ok(Json(ObservationResponse {
        status: "queued",
        id: session.id,
        prompt_number: session.prompt_counter,
        reason: None,
    }))
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub agent_session_id: String,
    pub platform: String,
    #[serde(default)]
    pub last_user_message: Option<String>,
    #[serde(default)]
    pub last_assistant_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub status: &'static str,
}

pub async fn summarize(
    State(state): State<AppState>,
    Json(req): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    require("agent_session_id", &req.agent_session_id)?;
    require("platform", &req.platform)?;

    let session = resolve_session(&state, &req.agent_session_id).await?;

    state
        .registry
        .queue_summarize(
            session.id,
            PendingEvent::Summarize(SummarizeEvent {
                last_user_message: req.last_user_message,
                last_assistant_message: req.last_assistant_message,
                prompt_number: Some(session.prompt_counter),
            }),
        )
        .await;

    publish_and_start(&state, session.id).await;

    Ok(Json(SummarizeResponse { status: "queued" }))
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub agent_session_id: String,
    pub platform: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompleteResponse {
    pub status: &'static str,
}

pub async fn complete(
    State(state): State<AppState>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<CompleteResponse>, ApiError> {
    require("agent_session_id", &req.agent_session_id)?;
    require("platform", &req.platform)?;

    let session = resolve_session(&state, &req.agent_session_id).await?;

    state.registry.mark_completed(session.id);
    state.store.mark_complete(session.id).await?;
    state
        .bus
        .publish(BusEvent::SessionCompleted {
            session_db_id: session.id,
            timestamp: chrono::Utc::now(),
        })
        .await;

    Ok(Json(CompleteResponse { status: "completed" }))
}

/// Resolves the DB row for `agent_session_id` and guarantees the registry
/// has live state for it, re-hydrating a fresh `SessionState` if this
/// process never saw an `ensure` call for it (e.g. a restart landed
/// between a prior `ensure` and a follow-up tool event). `initialize` is
/// idempotent, so this is a no-op when state is already present.
async fn resolve_session(state: &AppState, agent_session_id: &str) -> Result<recall_types::Session, ApiError> {
    let session = state
        .store
        .get_session_by_agent_id(agent_session_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("unknown agent_session_id {agent_session_id}")))?;

    state
        .registry
        .initialize(session.id, &session.agent_session_id, &session.project, session.prompt_counter);

    Ok(session)
}

async fn publish_and_start(state: &AppState, session_db_id: i64) {
    state
        .bus
        .publish(BusEvent::ObservationQueued { session_db_id })
        .await;
    state.registry.ensure_generator_running(session_db_id, state.runner.as_ref()).await;
}
