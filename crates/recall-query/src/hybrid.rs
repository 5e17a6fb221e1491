//! The hybrid retrieval pipeline expressed as composable stages:
//! `VectorCandidates(text) ∩ FilterPredicate → StoreHydrate → TemporalSort →
//! Limit`, each stage testable in isolation. [`search_observations`] is the
//! one entry point that wires them together.

use chrono::{DateTime, Utc};
use recall_store::Store;
use recall_types::{EntityKind, Filters, Observation};
use recall_vector::VectorIndex;
use std::sync::Arc;

use crate::error::QueryResult;

/// Text-based retrieval never looks further back than this unless the
/// caller supplies an explicit date range (P7).
pub const RECENCY_WINDOW: chrono::Duration = chrono::Duration::days(90);

pub const MAX_LIMIT: i64 = 100;
pub const DEFAULT_LIMIT: i64 = 20;

/// Clamps a caller-supplied limit to `(0, MAX_LIMIT]`, substituting
/// `DEFAULT_LIMIT` for non-positive values.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    match requested {
        Some(n) if n > 0 => n.min(MAX_LIMIT),
        _ => DEFAULT_LIMIT,
    }
}

/// Widens `filters` with the 90-day recency floor unless the caller already
/// supplied an explicit date range, in which case that range is respected
/// verbatim (P7's "unless the caller passes an explicit dateRange").
fn filters_with_recency(filters: &Filters) -> Filters {
    let mut widened = filters.clone();
    if widened.date_range.is_none() {
        widened.date_range = Some((Utc::now() - RECENCY_WINDOW, Utc::now()));
    }
    widened
}

/// Stage 1+2: vector candidate selection with a full-text fallback. Returns
/// already-hydrated observations (both paths resolve to Store rows) so the
/// caller only has to sort and limit.
///
/// - If the vector index returns at least one match, those ids are hydrated
///   from Store.
/// - If the vector index is unavailable or returns nothing, falls back to
///   `Store::search_observations_fts` over the same recency-widened window.
async fn text_candidates(
    store: &Store,
    vector: &Arc<dyn VectorIndex>,
    text: &str,
    filters: &Filters,
) -> QueryResult<Vec<Observation>> {
    let widened = filters_with_recency(filters);

    match vector.query(EntityKind::Observation, text, MAX_LIMIT as usize, &widened).await {
        Ok(matches) if !matches.is_empty() => {
            let ids: Vec<i64> = matches.iter().map(|m| m.id).collect();
            let mut hydrated = store.fetch_observations_by_ids(&ids).await?;
            if let Some(project) = &filters.project {
                hydrated.retain(|o| &o.project == project);
            }
            Ok(hydrated)
        }
        Ok(_) => fts_fallback(store, text, filters, &widened).await,
        Err(err) => {
            tracing::warn!(error = %err, "vector query failed, degrading to full-text search");
            fts_fallback(store, text, filters, &widened).await
        }
    }
}

async fn fts_fallback(
    store: &Store,
    text: &str,
    filters: &Filters,
    widened: &Filters,
) -> QueryResult<Vec<Observation>> {
    let since: Option<DateTime<Utc>> = widened.date_range.map(|(start, _)| start);
    let observations = store
        .search_observations_fts(text, filters.project.as_deref(), since, MAX_LIMIT)
        .await?;
    Ok(observations)
}

/// Stage 3: direct Store filtering with no text query at all. Unlike the
/// text-driven path, filter-only retrieval does not apply the recency
/// window.
async fn filter_candidates(store: &Store, filters: &Filters, limit: i64) -> QueryResult<Vec<Observation>> {
    Ok(store.filter_observations(filters, limit).await?)
}

/// Stage 4: temporal sort. Recency dominates similarity for final
/// presentation; the vector/FTS stage only selects the candidate set.
fn temporal_sort(mut observations: Vec<Observation>) -> Vec<Observation> {
    observations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    observations
}

/// Stage 5: limit.
fn apply_limit(mut observations: Vec<Observation>, limit: i64) -> Vec<Observation> {
    observations.truncate(limit.max(0) as usize);
    observations
}

/// The full pipeline: `text` drives vector-then-FTS candidate selection;
/// absent `text` requires a non-empty `filters` and goes straight to Store
/// filtering. Neither present is a validation error.
pub async fn search_observations(
    store: &Store,
    vector: &Arc<dyn VectorIndex>,
    text: Option<&str>,
    filters: &Filters,
    limit: Option<i64>,
) -> QueryResult<Vec<Observation>> {
    let limit = clamp_limit(limit);

    let candidates = match text {
        Some(t) if !t.trim().is_empty() => text_candidates(store, vector, t, filters).await?,
        _ => {
            if filters.is_empty() {
                return Err(crate::error::QueryError::Validation(
                    "search requires either a text query or at least one filter".to_string(),
                ));
            }
            filter_candidates(store, filters, MAX_LIMIT).await?
        }
    };

    Ok(apply_limit(temporal_sort(candidates), limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_limit_substitutes_default_and_caps_maximum() {
        assert_eq!(clamp_limit(None), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(0)), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(-5)), DEFAULT_LIMIT);
        assert_eq!(clamp_limit(Some(500)), MAX_LIMIT);
        assert_eq!(clamp_limit(Some(42)), 42);
    }

    fn observation_at(id: i64, days_ago: i64) -> Observation {
        Observation {
            id,
            sdk_session_id: "s".to_string(),
            project: "demo".to_string(),
            kind: recall_types::ObservationType::Change,
            title: None,
            subtitle: None,
            narrative: None,
            facts: Vec::new(),
            concepts: Vec::new(),
            files_read: Vec::new(),
            files_modified: Vec::new(),
            prompt_number: None,
            discovery_tokens: 0,
            created_at: Utc::now() - chrono::Duration::days(days_ago),
        }
    }

    #[test]
    fn temporal_sort_orders_newest_first_regardless_of_input_order() {
        let observations = vec![observation_at(1, 10), observation_at(2, 1), observation_at(3, 5)];
        let sorted = temporal_sort(observations);
        assert_eq!(sorted.iter().map(|o| o.id).collect::<Vec<_>>(), vec![2, 3, 1]);
    }

    #[test]
    fn apply_limit_truncates() {
        let observations = vec![observation_at(1, 1), observation_at(2, 2), observation_at(3, 3)];
        assert_eq!(apply_limit(observations, 2).len(), 2);
    }
}
