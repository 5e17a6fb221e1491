//! `ApiError`: maps the error taxonomy onto HTTP responses, via
//! the usual `(StatusCode, Json<ErrorResponse>)` handler-error idiom.
//! Only validation and not-found errors
//! and the catch-all store-write failure surface here;
//! an ingestion-soft condition is a 200 response built by the handler itself,
//! a degraded backend is logged and never reaches the client, and
//! parse-leniency (kind 5) never leaves `recall-runtime`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Store(#[from] recall_store::error::StoreError),
    #[error(transparent)]
    Query(#[from] recall_query::QueryError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Query(recall_query::QueryError::Validation(msg)) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            ApiError::Query(recall_query::QueryError::Store(recall_store::error::StoreError::NotFound(msg))) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            ApiError::Store(recall_store::error::StoreError::NotFound(msg)) => {
                (StatusCode::NOT_FOUND, msg.clone())
            }
            ApiError::Store(err) => {
                tracing::error!(error = %err, "store write failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
            }
            ApiError::Query(err) => {
                tracing::error!(error = %err, "query failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal storage error".to_string())
            }
        };

        (status, Json(ErrorResponse { error, errors: Vec::new() })).into_response()
    }
}
