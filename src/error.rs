//! Error types shared across the crate

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, warn};

use crate::state::TableId;

/// Failures converting persisted session timing into typed state
#[derive(Debug, Error, PartialEq)]
pub enum TimerError {
    #[error("invalid {field} timestamp: {value:?}")]
    InvalidTimestamp { field: &'static str, value: String },
}

/// Failures of table registry operations
#[derive(Debug, Error, PartialEq)]
pub enum TableError {
    #[error("table {0} not found")]
    NotFound(TableId),
    #[error("table {0} already has a running session")]
    AlreadyRunning(TableId),
    #[error("table {0} has no running session")]
    NotRunning(TableId),
    #[error("table {0} is already paused")]
    AlreadyPaused(TableId),
    #[error("table {0} is not paused")]
    NotPaused(TableId),
    #[error("invalid session duration: {0}")]
    InvalidDuration(f64),
    #[error("failed to lock table registry: {0}")]
    LockPoisoned(String),
}

/// Errors returned by HTTP handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Table(#[from] TableError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            ApiError::Table(TableError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Table(TableError::InvalidDuration(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Table(TableError::LockPoisoned(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Table(_) => StatusCode::CONFLICT,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorBody { message: self.to_string() })).into_response()
    }
}
