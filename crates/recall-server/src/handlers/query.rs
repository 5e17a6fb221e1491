//! Query surface: context assembly, unified search,
//! timelines, single-entity fetch, and stats.

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use recall_query::{TimelineByQueryResult, TimelineMode};
use recall_store::TimelineAnchor;
use recall_types::{Filters, ObservationType, ResultFormat};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ContextParams {
    limit: Option<i64>,
    summary_limit: Option<i64>,
}

pub async fn context(
    State(state): State<AppState>,
    Path(project): Path<String>,
    Query(params): Query<ContextParams>,
) -> Result<Json<recall_query::ContextResult>, ApiError> {
    let limit = params.limit.or(Some(state.default_context_limit));
    let result = state.query.get_context(&project, limit, params.summary_limit).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    tool: Option<String>,
    query: Option<String>,
    format: Option<String>,
    limit: Option<i64>,
    project: Option<String>,
    date_start: Option<String>,
    date_end: Option<String>,
    obs_type: Option<String>,
    concepts: Option<String>,
    files: Option<String>,
}

fn split_csv(raw: &Option<String>) -> Vec<String> {
    raw.as_deref()
        .map(|s| s.split(',').map(str::trim).filter(|p| !p.is_empty()).map(str::to_string).collect())
        .unwrap_or_default()
}

fn parse_date_range(start: &Option<String>, end: &Option<String>) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, ApiError> {
    match (start, end) {
        (Some(s), Some(e)) => {
            let start = DateTime::parse_from_rfc3339(s)
                .map_err(|_| ApiError::Validation(format!("invalid date_start: {s}")))?
                .with_timezone(&Utc);
            let end = DateTime::parse_from_rfc3339(e)
                .map_err(|_| ApiError::Validation(format!("invalid date_end: {e}")))?
                .with_timezone(&Utc);
            Ok(Some((start, end)))
        }
        (None, None) => Ok(None),
        _ => Err(ApiError::Validation("date_start and date_end must be supplied together".to_string())),
    }
}

pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let format = params.format.as_deref().map(ResultFormat::from_str_lenient).unwrap_or_default();
    let text = params.query.as_deref().filter(|s| !s.trim().is_empty());

    match params.tool.as_deref() {
        Some("summary") | Some("summaries") => {
            let summaries = state.query.search_summaries(text, params.project.as_deref(), params.limit).await?;
            Ok(Json(serde_json::to_value(summaries).expect("serializing summaries")))
        }
        Some("prompt") | Some("prompts") => {
            let text = text.ok_or_else(|| ApiError::Validation("query is required for prompt search".to_string()))?;
            let prompts = state.query.search_prompts(text, params.limit).await?;
            Ok(Json(serde_json::to_value(prompts).expect("serializing prompts")))
        }
        _ => {
            let kind = match params.obs_type.as_deref() {
                Some(raw) => Some(
                    ObservationType::parse_strict(raw)
                        .ok_or_else(|| ApiError::Validation(format!("invalid obs_type: {raw}")))?,
                ),
                None => None,
            };
            let filters = Filters {
                project: params.project.clone(),
                kind,
                concepts: split_csv(&params.concepts),
                files: split_csv(&params.files),
                date_range: parse_date_range(&params.date_start, &params.date_end)?,
            };
            let hits = state.query.search(text, &filters, params.limit, format).await?;
            Ok(Json(serde_json::to_value(hits).expect("serializing observation views")))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TimelineParams {
    anchor: String,
    depth_before: Option<i64>,
    depth_after: Option<i64>,
    project: Option<String>,
    query: Option<String>,
    mode: Option<String>,
}

fn parse_anchor(raw: &str) -> Result<TimelineAnchor, ApiError> {
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(TimelineAnchor::Id(id));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| TimelineAnchor::Timestamp(dt.with_timezone(&Utc)))
        .map_err(|_| ApiError::Validation(format!("anchor is neither an id nor an ISO timestamp: {raw}")))
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TimelineResponse {
    Anchored(recall_store::Timeline),
    Candidates(Vec<recall_types::Observation>),
}

/// `GET /api/timeline`: anchor-based by default; when `query` is supplied
/// instead of (or alongside) `anchor`, retrieval picks the anchor first
/// (`mode=interactive` returns candidates for the caller to choose from).
pub async fn timeline(
    State(state): State<AppState>,
    Query(params): Query<TimelineParams>,
) -> Result<Json<TimelineResponse>, ApiError> {
    let depth_before = params.depth_before.unwrap_or(10).clamp(0, 50);
    let depth_after = params.depth_after.unwrap_or(10).clamp(0, 50);

    if let Some(text) = params.query.as_deref().filter(|s| !s.trim().is_empty()) {
        let filters = Filters {
            project: params.project.clone(),
            ..Default::default()
        };
        let mode = match params.mode.as_deref() {
            Some("interactive") => TimelineMode::Interactive,
            _ => TimelineMode::Auto,
        };
        let result = state.query.timeline_by_query(text, &filters, mode, depth_before, depth_after).await?;
        return Ok(Json(match result {
            TimelineByQueryResult::Anchored(t) => TimelineResponse::Anchored(t),
            TimelineByQueryResult::Candidates(c) => TimelineResponse::Candidates(c),
        }));
    }

    let anchor = parse_anchor(&params.anchor)?;
    let timeline = state
        .query
        .timeline_around(anchor, depth_before, depth_after, params.project.as_deref())
        .await?;
    Ok(Json(TimelineResponse::Anchored(timeline)))
}

pub async fn get_observation(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<recall_types::Observation>, ApiError> {
    Ok(Json(state.store.get_observation_by_id(id).await?))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<recall_types::Session>, ApiError> {
    Ok(Json(state.store.get_session_by_id(id).await?))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<recall_types::UserPrompt>, ApiError> {
    Ok(Json(state.store.get_prompt_by_id(id).await?))
}

#[derive(Debug, Serialize)]
pub struct StatEntry {
    kind: String,
    project: String,
    count: i64,
}

pub async fn stats(State(state): State<AppState>) -> Result<Json<Vec<StatEntry>>, ApiError> {
    let rows = state.store.stats().await?;
    Ok(Json(
        rows.into_iter().map(|(kind, project, count)| StatEntry { kind, project, count }).collect(),
    ))
}

#[derive(Debug, Serialize)]
pub struct ProcessingStatusResponse {
    #[serde(rename = "isProcessing")]
    is_processing: bool,
    #[serde(rename = "queueDepth")]
    queue_depth: usize,
}

pub async fn processing_status(State(state): State<AppState>) -> Json<ProcessingStatusResponse> {
    let queue_depth = state.registry.total_active_work().await;
    Json(ProcessingStatusResponse {
        is_processing: queue_depth > 0,
        queue_depth,
    })
}
