//! API error types and the JSON error envelope.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use drover_core::ErrorCode;
use serde::Serialize;

/// API error response envelope.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
    /// Error code for programmatic handling.
    pub error_code: i32,
    /// Batch context, where the client can use it to self-correct.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("too many workers registered from this address")]
    TooManyWorkers,

    #[error("unknown worker")]
    UnknownWorker,

    #[error("worker is disabled")]
    WorkerDisabled,

    #[error("worker must commit its current batch first")]
    MustCommitCurrent { batch_id: String },

    #[error("batch is not assigned to this worker")]
    ForbiddenBatch,

    #[error("batch id must not be empty")]
    EmptyBatchId,

    #[error("unknown batch")]
    UnknownBatch,

    #[error("content size does not match the archived batch")]
    SizeMismatch { batch_id: String },

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),

    #[error("storage error: {0}")]
    Storage(#[from] drover_storage::StorageError),

    #[error("metadata error: {0}")]
    Metadata(#[from] drover_metadata::MetadataError),
}

impl ApiError {
    /// Get the protocol error code for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::TooManyWorkers => ErrorCode::TooManyWorkers,
            Self::UnknownWorker => ErrorCode::UnknownWorker,
            Self::WorkerDisabled => ErrorCode::WorkerDisabled,
            Self::MustCommitCurrent { .. } => ErrorCode::MustCommitCurrent,
            Self::ForbiddenBatch => ErrorCode::ForbiddenBatch,
            Self::EmptyBatchId => ErrorCode::EmptyBatchId,
            Self::UnknownBatch => ErrorCode::UnknownBatch,
            Self::SizeMismatch { .. } => ErrorCode::SizeMismatch,
            Self::NotFound => ErrorCode::NotFound,
            Self::Internal(_) | Self::Storage(_) | Self::Metadata(_) => ErrorCode::Internal,
        }
    }

    /// Get the HTTP status code for this error. Protocol violations are all
    /// 403; backend failures are plain 500s after the transaction aborted.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::TooManyWorkers
            | Self::UnknownWorker
            | Self::WorkerDisabled
            | Self::MustCommitCurrent { .. }
            | Self::ForbiddenBatch
            | Self::EmptyBatchId
            | Self::UnknownBatch
            | Self::SizeMismatch { .. } => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Internal(_) | Self::Storage(_) | Self::Metadata(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn batch_id(&self) -> Option<String> {
        match self {
            Self::MustCommitCurrent { batch_id } | Self::SizeMismatch { batch_id } => {
                Some(batch_id.clone())
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }

        let body = ErrorResponse {
            error: self.to_string(),
            error_code: self.error_code().as_i32(),
            batch_id: self.batch_id(),
        };
        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
