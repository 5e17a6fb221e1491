//! The two result shapes a search can be rendered as. `Index`
//! is the compact listing view; `Full` carries every field. These are the
//! JSON bodies `recall-server` hands back verbatim.

use chrono::{DateTime, Utc};
use recall_types::{Observation, ObservationType, ResultFormat, SessionSummary};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ObservationView {
    Index(ObservationIndexView),
    Full(Observation),
}

#[derive(Debug, Clone, Serialize)]
pub struct ObservationIndexView {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ObservationType,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub created_at: DateTime<Utc>,
    pub project: String,
    pub concepts: Vec<String>,
    pub files: Vec<String>,
}

impl From<&Observation> for ObservationIndexView {
    fn from(o: &Observation) -> Self {
        Self {
            id: o.id,
            kind: o.kind,
            title: o.title.clone(),
            subtitle: o.subtitle.clone(),
            created_at: o.created_at,
            project: o.project.clone(),
            concepts: o.concepts.clone(),
            files: o
                .files_read
                .iter()
                .chain(o.files_modified.iter())
                .cloned()
                .collect(),
        }
    }
}

pub fn render_observations(observations: Vec<Observation>, format: ResultFormat) -> Vec<ObservationView> {
    observations
        .into_iter()
        .map(|o| match format {
            ResultFormat::Index => ObservationView::Index(ObservationIndexView::from(&o)),
            ResultFormat::Full => ObservationView::Full(o),
        })
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SummaryView {
    Index(SummaryIndexView),
    Full(SessionSummary),
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryIndexView {
    pub id: i64,
    pub project: String,
    pub request: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&SessionSummary> for SummaryIndexView {
    fn from(s: &SessionSummary) -> Self {
        Self {
            id: s.id,
            project: s.project.clone(),
            request: s.request.clone(),
            created_at: s.created_at,
        }
    }
}

pub fn render_summaries(summaries: Vec<SessionSummary>, format: ResultFormat) -> Vec<SummaryView> {
    summaries
        .into_iter()
        .map(|s| match format {
            ResultFormat::Index => SummaryView::Index(SummaryIndexView::from(&s)),
            ResultFormat::Full => SummaryView::Full(s),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample() -> Observation {
        Observation {
            id: 1,
            sdk_session_id: "s".to_string(),
            project: "demo".to_string(),
            kind: ObservationType::Bugfix,
            title: Some("Fixed it".to_string()),
            subtitle: None,
            narrative: Some("long story".to_string()),
            facts: vec!["fact".to_string()],
            concepts: vec!["auth".to_string()],
            files_read: vec!["a.rs".to_string()],
            files_modified: Vec::new(),
            prompt_number: Some(1),
            discovery_tokens: 10,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn index_view_drops_narrative_and_facts() {
        let rendered = render_observations(vec![sample()], ResultFormat::Index);
        let json = serde_json::to_value(&rendered[0]).unwrap();
        assert!(json.get("narrative").is_none());
        assert!(json.get("facts").is_none());
        assert_eq!(json["title"], "Fixed it");
    }

    #[test]
    fn full_view_carries_every_field() {
        let rendered = render_observations(vec![sample()], ResultFormat::Full);
        let json = serde_json::to_value(&rendered[0]).unwrap();
        assert_eq!(json["narrative"], "long story");
    }
}
