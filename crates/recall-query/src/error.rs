use thiserror::Error;

/// Mirrors `StoreError`'s shape (a small `thiserror` enum per crate
/// boundary) plus the one validation case this layer owns: a search with
/// neither `text` nor any filter set is rejected outright.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Store(#[from] recall_store::error::StoreError),
}

pub type QueryResult<T> = Result<T, QueryError>;
