//! Error types for ca-sync HTTP handlers

use crate::sync::SyncError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ca_common::events::SyncPhase;
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), e.g. teacher already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Lesson API returned nothing for the requested range (404)
    #[error("No lessons: {0}")]
    NoLessons(String),

    /// Startup failed; only a reset can recover (503)
    #[error("Critical error: {0}")]
    Critical(String),

    /// Initial load still running (503)
    #[error("Not ready: {0}")]
    NotReady(String),

    /// Remote store or lesson API failure (502)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// ca-common error
    #[error("Common error: {0}")]
    Common(#[from] ca_common::Error),
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        let message = err.to_string();
        match err {
            SyncError::Fatal { .. } | SyncError::NotLoaded(SyncPhase::Failed) => ApiError::Critical(message),
            SyncError::NotLoaded(_) => ApiError::NotReady(message),
            SyncError::Remote(_) | SyncError::ExternalApi(_) => ApiError::Upstream(message),
            SyncError::NoLessons(_) => ApiError::NoLessons(message),
            SyncError::Conflict(msg) => ApiError::Conflict(msg),
            SyncError::NotFound(msg) => ApiError::NotFound(msg),
            SyncError::InvalidInput(msg) => ApiError::BadRequest(msg),
            SyncError::LocalCache(_) => ApiError::Internal(message),
            SyncError::Common(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg),
            ApiError::NoLessons(msg) => (StatusCode::NOT_FOUND, "NO_LESSONS", msg),
            ApiError::Critical(msg) => (StatusCode::SERVICE_UNAVAILABLE, "CRITICAL_ERROR", msg),
            ApiError::NotReady(msg) => (StatusCode::SERVICE_UNAVAILABLE, "NOT_READY", msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Common(ref err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "COMMON_ERROR",
                err.to_string(),
            ),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
