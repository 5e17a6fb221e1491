//! Write-behind mirror of observation/summary/prompt text into an external
//! vector collection. The collection itself is an opaque collaborator (per
//! the design this crate implements); everything here is the client
//! contract and chunking logic around it, not a vector database.

mod chunk;
mod error;
mod http;
mod null;

pub use chunk::split_into_chunks;
pub use error::{VectorError, VectorResult};
pub use http::HttpVectorIndex;
pub use null::NullVectorIndex;

use async_trait::async_trait;
use recall_types::{EntityKind, Filters};
use serde::{Deserialize, Serialize};

/// Metadata carried alongside an embedded chunk so `query`'s `where`
/// predicate can narrow candidates before the Store hydration step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorMetadata {
    pub project: String,
    pub kind: String,
    pub created_at_epoch: i64,
    pub concepts: Vec<String>,
    pub files: Vec<String>,
    pub prompt_number: Option<i64>,
}

/// One nearest-neighbor hit: the stored id (with chunk suffix stripped)
/// and its similarity score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VectorMatch {
    pub id: i64,
    pub score: f32,
}

/// Contract for the external vector collection. Large text is chunked
/// internally by implementations, never by callers.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn upsert(
        &self,
        kind: EntityKind,
        id: i64,
        text: &str,
        metadata: VectorMetadata,
    ) -> VectorResult<()>;

    async fn query(
        &self,
        kind: EntityKind,
        text: &str,
        k: usize,
        filters: &Filters,
    ) -> VectorResult<Vec<VectorMatch>>;

    async fn remove(&self, kind: EntityKind, id: i64) -> VectorResult<()>;
}
