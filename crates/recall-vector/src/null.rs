use async_trait::async_trait;
use recall_types::{EntityKind, Filters};

use crate::{VectorError, VectorIndex, VectorMatch, VectorMetadata, VectorResult};

/// A no-op `VectorIndex` for local development and for exercising
/// `QueryEngine`'s "vector index unavailable" degraded path in tests
/// without standing up an external service.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVectorIndex;

#[async_trait]
impl VectorIndex for NullVectorIndex {
    async fn upsert(
        &self,
        _kind: EntityKind,
        _id: i64,
        _text: &str,
        _metadata: VectorMetadata,
    ) -> VectorResult<()> {
        Ok(())
    }

    async fn query(
        &self,
        _kind: EntityKind,
        _text: &str,
        _k: usize,
        _filters: &Filters,
    ) -> VectorResult<Vec<VectorMatch>> {
        Err(VectorError::Unavailable("no vector backend configured".to_string()))
    }

    async fn remove(&self, _kind: EntityKind, _id: i64) -> VectorResult<()> {
        Ok(())
    }
}
