//! Durable relational storage for sessions, observations, summaries, and
//! raw prompts, with write-ahead logging, versioned migrations, and FTS5
//! mirrors kept in sync by triggers. See [`Store`] for the operation set.

pub mod error;
pub mod migrations;
pub mod rows;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use store::{EnsureSessionResult, Store, Timeline, TimelineAnchor, RECENCY_WINDOW};

#[cfg(test)]
mod tests {
    use super::*;
    use recall_types::{Filters, ObservationFields, ObservationType, SummaryFields};

    async fn fresh() -> Store {
        Store::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn ensure_session_creates_then_increments() {
        let store = fresh().await;
        let first = store
            .ensure_session("agent-a", "cli", "demo", Some("Build auth"))
            .await
            .unwrap();
        assert!(first.created);
        assert_eq!(first.prompt_number, 1);

        let second = store
            .ensure_session("agent-a", "cli", "demo", Some("Continue"))
            .await
            .unwrap();
        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.prompt_number, 2);
    }

    #[tokio::test]
    async fn ensure_session_keeps_project_when_empty() {
        let store = fresh().await;
        store.ensure_session("agent-b", "cli", "demo", None).await.unwrap();
        store.ensure_session("agent-b", "cli", "", None).await.unwrap();
        let session = store.get_session_by_agent_id("agent-b").await.unwrap().unwrap();
        assert_eq!(session.project, "demo");
    }

    #[tokio::test]
    async fn store_observation_coerces_unknown_type() {
        let store = fresh().await;
        let fields = ObservationFields {
            kind: None,
            subtitle: Some("x".to_string()),
            ..Default::default()
        };
        let (id, _) = store
            .store_observation("agent-c", "demo", &fields, Some(1), 42)
            .await
            .unwrap();
        let obs = store.get_observation_by_id(id).await.unwrap();
        assert_eq!(obs.kind, ObservationType::Change);
        assert_eq!(obs.subtitle.as_deref(), Some("x"));
        assert!(obs.title.is_none());
    }

    #[tokio::test]
    async fn filter_observations_applies_type_and_project() {
        let store = fresh().await;
        let bugfix = ObservationFields {
            kind: Some(ObservationType::Bugfix),
            title: Some("fix".into()),
            ..Default::default()
        };
        let feature = ObservationFields {
            kind: Some(ObservationType::Feature),
            title: Some("feat".into()),
            ..Default::default()
        };
        store.store_observation("s1", "demo", &bugfix, None, 0).await.unwrap();
        store.store_observation("s1", "demo", &feature, None, 0).await.unwrap();

        let filters = Filters {
            project: Some("demo".into()),
            kind: Some(ObservationType::Bugfix),
            ..Default::default()
        };
        let results = store.filter_observations(&filters, 20).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].title.as_deref(), Some("fix"));
    }

    #[tokio::test]
    async fn zero_observation_summary_is_still_stored() {
        let store = fresh().await;
        let (id, _) = store
            .store_summary("s2", "demo", &SummaryFields::default(), None, 0)
            .await
            .unwrap();
        let summaries = store.fetch_summaries_by_ids(&[id]).await.unwrap();
        assert_eq!(summaries.len(), 1);
        assert!(summaries[0].request.is_none());
    }

    #[tokio::test]
    async fn timeline_around_returns_anchor_only_at_zero_depth() {
        let store = fresh().await;
        let fields = ObservationFields::default();
        let (id, created_at) = store
            .store_observation("s3", "demo", &fields, None, 0)
            .await
            .unwrap();
        let timeline = store
            .get_timeline_around(TimelineAnchor::Id(id), 0, 0, Some("demo"))
            .await
            .unwrap();
        assert_eq!(timeline.observations.len(), 1);
        assert_eq!(timeline.observations[0].id, id);
        let _ = created_at;
    }
}
