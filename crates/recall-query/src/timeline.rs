//! `timelineAround` and `timelineByQuery`.

use recall_store::{Store, Timeline, TimelineAnchor};
use recall_types::Filters;
use recall_vector::VectorIndex;
use std::sync::Arc;

use crate::error::QueryResult;
use crate::hybrid::{search_observations, DEFAULT_LIMIT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineMode {
    /// Uses the top retrieval hit as the anchor and returns its timeline.
    Auto,
    /// Returns the top N hits for the caller to pick an anchor from.
    Interactive,
}

#[derive(Debug, Clone)]
pub enum TimelineByQueryResult {
    Anchored(Timeline),
    Candidates(Vec<recall_types::Observation>),
}

/// `timelineAround`: a single chronological window tagged by kind, delegated
/// straight to `Store::get_timeline_around`.
pub async fn timeline_around(
    store: &Store,
    anchor: TimelineAnchor,
    depth_before: i64,
    depth_after: i64,
    project: Option<&str>,
) -> QueryResult<Timeline> {
    Ok(store
        .get_timeline_around(anchor, depth_before.max(0), depth_after.max(0), project)
        .await?)
}

/// `timelineByQuery`: runs retrieval first, then either anchors a timeline
/// on the top hit (`Auto`) or hands back the candidate list for the caller
/// to choose from (`Interactive`).
pub async fn timeline_by_query(
    store: &Store,
    vector: &Arc<dyn VectorIndex>,
    text: &str,
    filters: &Filters,
    mode: TimelineMode,
    depth_before: i64,
    depth_after: i64,
) -> QueryResult<TimelineByQueryResult> {
    let hits = search_observations(store, vector, Some(text), filters, Some(DEFAULT_LIMIT)).await?;

    match mode {
        TimelineMode::Interactive => Ok(TimelineByQueryResult::Candidates(hits)),
        TimelineMode::Auto => match hits.first() {
            Some(top) => {
                let timeline = timeline_around(
                    store,
                    TimelineAnchor::Id(top.id),
                    depth_before,
                    depth_after,
                    filters.project.as_deref(),
                )
                .await?;
                Ok(TimelineByQueryResult::Anchored(timeline))
            }
            None => Ok(TimelineByQueryResult::Anchored(Timeline::default())),
        },
    }
}
