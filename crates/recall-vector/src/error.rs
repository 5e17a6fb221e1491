use thiserror::Error;

#[derive(Debug, Error)]
pub enum VectorError {
    #[error("vector collection unreachable: {0}")]
    Unavailable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

pub type VectorResult<T> = Result<T, VectorError>;
