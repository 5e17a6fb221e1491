//! Hybrid retrieval, timelines, and context assembly: combines vector
//! similarity, full-text search, and metadata filters with
//! a recency window, assembles chronological timelines, and computes the
//! context-economics statistics an agent fetches at session start.

mod context;
mod error;
mod hybrid;
mod timeline;
mod views;

pub use context::{get_context, ContextResult, TokenStats};
pub use error::{QueryError, QueryResult};
pub use hybrid::{clamp_limit, search_observations, DEFAULT_LIMIT, MAX_LIMIT, RECENCY_WINDOW};
pub use timeline::{timeline_around, timeline_by_query, TimelineByQueryResult, TimelineMode};
pub use views::{render_observations, render_summaries, ObservationIndexView, ObservationView, SummaryIndexView, SummaryView};

use recall_store::Store;
use recall_types::{Filters, ObservationType, ResultFormat, SessionSummary, UserPrompt};
use recall_vector::VectorIndex;
use std::sync::Arc;

/// Pure logic over `Store` and `VectorIndex`; no I/O of its own, cheap to
/// clone (both fields are themselves clone-cheap handles), shared through
/// `recall-server`'s `Core`/`AppState` the same way the other components are.
#[derive(Clone)]
pub struct QueryEngine {
    store: Store,
    vector: Arc<dyn VectorIndex>,
}

impl QueryEngine {
    pub fn new(store: Store, vector: Arc<dyn VectorIndex>) -> Self {
        Self { store, vector }
    }

    /// The general-purpose entry point behind `GET /api/search`.
    pub async fn search(
        &self,
        text: Option<&str>,
        filters: &Filters,
        limit: Option<i64>,
        format: ResultFormat,
    ) -> QueryResult<Vec<ObservationView>> {
        let observations = search_observations(&self.store, &self.vector, text, filters, limit).await?;
        Ok(render_observations(observations, format))
    }

    /// Specialized entry point: search constrained to one observation type.
    pub async fn by_type(
        &self,
        kind: ObservationType,
        text: Option<&str>,
        project: Option<&str>,
        limit: Option<i64>,
        format: ResultFormat,
    ) -> QueryResult<Vec<ObservationView>> {
        let filters = Filters {
            project: project.map(str::to_string),
            kind: Some(kind),
            ..Default::default()
        };
        self.search(text, &filters, limit, format).await
    }

    /// Specialized entry point: search constrained to a single concept tag.
    pub async fn by_concept(
        &self,
        concept: &str,
        project: Option<&str>,
        limit: Option<i64>,
        format: ResultFormat,
    ) -> QueryResult<Vec<ObservationView>> {
        let filters = Filters {
            project: project.map(str::to_string),
            concepts: vec![concept.to_string()],
            ..Default::default()
        };
        self.search(None, &filters, limit, format).await
    }

    /// Specialized entry point: search constrained to observations that
    /// touched a given file path (read or modified).
    pub async fn by_file(
        &self,
        file: &str,
        project: Option<&str>,
        limit: Option<i64>,
        format: ResultFormat,
    ) -> QueryResult<Vec<ObservationView>> {
        let filters = Filters {
            project: project.map(str::to_string),
            files: vec![file.to_string()],
            ..Default::default()
        };
        self.search(None, &filters, limit, format).await
    }

    /// Specialized entry point: search over session summaries.
    pub async fn search_summaries(
        &self,
        text: Option<&str>,
        project: Option<&str>,
        limit: Option<i64>,
    ) -> QueryResult<Vec<SessionSummary>> {
        let limit = clamp_limit(limit);
        let summaries = match text {
            Some(t) if !t.trim().is_empty() => self.store.search_summaries_fts(t, project, limit).await?,
            _ => self.store.get_recent_summaries(project, limit).await?,
        };
        Ok(summaries)
    }

    /// Specialized entry point: search over raw recorded prompts.
    pub async fn search_prompts(&self, text: &str, limit: Option<i64>) -> QueryResult<Vec<UserPrompt>> {
        let limit = clamp_limit(limit);
        Ok(self.store.search_prompts_fts(text, limit).await?)
    }

    pub async fn timeline_around(
        &self,
        anchor: recall_store::TimelineAnchor,
        depth_before: i64,
        depth_after: i64,
        project: Option<&str>,
    ) -> QueryResult<recall_store::Timeline> {
        timeline::timeline_around(&self.store, anchor, depth_before.min(50), depth_after.min(50), project).await
    }

    pub async fn timeline_by_query(
        &self,
        text: &str,
        filters: &Filters,
        mode: TimelineMode,
        depth_before: i64,
        depth_after: i64,
    ) -> QueryResult<TimelineByQueryResult> {
        timeline::timeline_by_query(
            &self.store,
            &self.vector,
            text,
            filters,
            mode,
            depth_before.min(50),
            depth_after.min(50),
        )
        .await
    }

    pub async fn get_context(
        &self,
        project: &str,
        limit: Option<i64>,
        summary_limit: Option<i64>,
    ) -> QueryResult<ContextResult> {
        context::get_context(&self.store, project, limit, summary_limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_store::Store;
    use recall_types::ObservationFields;
    use recall_vector::NullVectorIndex;

    async fn engine_with_data() -> QueryEngine {
        let store = Store::in_memory().await.unwrap();
        store
            .store_observation(
                "s1",
                "demo",
                &ObservationFields {
                    kind: Some(ObservationType::Bugfix),
                    title: Some("Fixed the auth bug".to_string()),
                    concepts: vec!["auth".to_string()],
                    files_modified: vec!["src/auth.rs".to_string()],
                    ..Default::default()
                },
                Some(1),
                50,
            )
            .await
            .unwrap();
        QueryEngine::new(store, Arc::new(NullVectorIndex))
    }

    #[tokio::test]
    async fn search_with_neither_text_nor_filters_is_an_error() {
        let engine = engine_with_data().await;
        let result = engine.search(None, &Filters::default(), None, ResultFormat::Full).await;
        assert!(matches!(result, Err(QueryError::Validation(_))));
    }

    #[tokio::test]
    async fn by_type_filters_to_matching_kind() {
        let engine = engine_with_data().await;
        let hits = engine
            .by_type(ObservationType::Bugfix, None, Some("demo"), None, ResultFormat::Full)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn by_concept_finds_tagged_observation() {
        let engine = engine_with_data().await;
        let hits = engine.by_concept("auth", None, None, ResultFormat::Index).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn by_file_finds_modified_path() {
        let engine = engine_with_data().await;
        let hits = engine.by_file("src/auth.rs", None, None, ResultFormat::Index).await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn text_search_falls_back_to_fts_when_vector_is_null() {
        let engine = engine_with_data().await;
        let hits = engine
            .search(Some("auth"), &Filters::default(), None, ResultFormat::Full)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn context_reports_token_stats() {
        let engine = engine_with_data().await;
        let context = engine.get_context("demo", None, None).await.unwrap();
        assert_eq!(context.observations.len(), 1);
        assert_eq!(context.token_stats.work_tokens, 50);
    }
}
