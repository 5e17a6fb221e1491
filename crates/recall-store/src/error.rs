use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no row found for {0}")]
    NotFound(String),
    #[error("migration failed: {0}")]
    Migration(#[source] sqlx::Error),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
