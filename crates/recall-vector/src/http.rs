use async_trait::async_trait;
use recall_types::{EntityKind, Filters};
use serde_json::json;
use std::time::Duration;

use crate::chunk::split_into_chunks;
use crate::{VectorError, VectorIndex, VectorMatch, VectorMetadata, VectorResult};

const MAX_CHUNK_CHARS: usize = 2000;

/// A thin REST client over an external, collection-oriented vector
/// database (one collection per `EntityKind`: `observation`, `summary`,
/// `prompt`). The wire shape follows the common "points" API most vector
/// databases expose; upsert/search/delete by id with a JSON metadata
/// payload used as the `where` predicate.
pub struct HttpVectorIndex {
    client: reqwest::Client,
    base_url: String,
}

impl HttpVectorIndex {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("building the vector index http client");
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn collection_url(&self, kind: EntityKind, suffix: &str) -> String {
        format!("{}/collections/{}/{}", self.base_url, kind.as_str(), suffix)
    }
}

#[async_trait]
impl VectorIndex for HttpVectorIndex {
    async fn upsert(
        &self,
        kind: EntityKind,
        id: i64,
        text: &str,
        metadata: VectorMetadata,
    ) -> VectorResult<()> {
        let chunks = split_into_chunks(id, text, MAX_CHUNK_CHARS);
        let points: Vec<_> = chunks
            .into_iter()
            .map(|(chunk_id, chunk_text)| {
                json!({
                    "id": chunk_id,
                    "text": chunk_text,
                    "metadata": metadata,
                })
            })
            .collect();

        let resp = self
            .client
            .put(self.collection_url(kind, "points"))
            .json(&json!({ "points": points }))
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(VectorError::Unavailable(format!(
                "upsert returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    async fn query(
        &self,
        kind: EntityKind,
        text: &str,
        k: usize,
        filters: &Filters,
    ) -> VectorResult<Vec<VectorMatch>> {
        let mut where_clause = serde_json::Map::new();
        if let Some(project) = &filters.project {
            where_clause.insert("project".to_string(), json!(project));
        }
        if let Some(kind_filter) = &filters.kind {
            where_clause.insert("kind".to_string(), json!(kind_filter.as_str()));
        }
        if let Some((start, _end)) = &filters.date_range {
            where_clause.insert("created_at_epoch_gte".to_string(), json!(start.timestamp()));
        }

        let resp = self
            .client
            .post(self.collection_url(kind, "points/search"))
            .json(&json!({
                "text": text,
                "limit": k,
                "where": where_clause,
            }))
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(VectorError::Unavailable(format!(
                "query returned {}",
                resp.status()
            )));
        }

        #[derive(serde::Deserialize)]
        struct SearchResponse {
            #[serde(default)]
            hits: Vec<Hit>,
        }
        #[derive(serde::Deserialize)]
        struct Hit {
            id: String,
            score: f32,
        }

        let parsed: SearchResponse = resp.json().await?;
        let matches = parsed
            .hits
            .into_iter()
            .filter_map(|hit| {
                crate::chunk::base_id(&hit.id).map(|id| VectorMatch {
                    id,
                    score: hit.score,
                })
            })
            .collect();
        Ok(matches)
    }

    async fn remove(&self, kind: EntityKind, id: i64) -> VectorResult<()> {
        let resp = self
            .client
            .post(self.collection_url(kind, "points/delete"))
            .json(&json!({ "id_prefix": format!("{id}#") }))
            .send()
            .await
            .map_err(|e| VectorError::Unavailable(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(VectorError::Unavailable(format!(
                "remove returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
