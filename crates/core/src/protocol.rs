//! Wire types for the coordination API.
//!
//! Every request body is JSON; every error response uses the envelope
//! `{"error": <string>, "error_code": <int>, ...}` with HTTP status 403 for
//! the protocol codes below.

use serde::{Deserialize, Serialize};

/// Machine-readable codes carried in the error envelope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    TooManyWorkers,
    UnknownWorker,
    WorkerDisabled,
    MustCommitCurrent,
    ForbiddenBatch,
    EmptyBatchId,
    UnknownBatch,
    SizeMismatch,
    NotFound,
    Internal,
}

impl ErrorCode {
    /// Numeric form used on the wire.
    pub fn as_i32(self) -> i32 {
        match self {
            Self::TooManyWorkers => 1,
            Self::UnknownWorker => 2,
            Self::WorkerDisabled => 3,
            Self::MustCommitCurrent => 4,
            Self::ForbiddenBatch => 5,
            Self::EmptyBatchId => 6,
            Self::UnknownBatch => 7,
            Self::SizeMismatch => 8,
            Self::NotFound => 404,
            Self::Internal => 500,
        }
    }
}

/// Response to `POST /api/workers/create`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateWorkerResponse {
    pub worker_id: String,
    /// Public base URL of the archive bucket, for display only; actual
    /// upload targets are always handed out as presigned URLs.
    pub s3_url: String,
}

/// Response to `GET /api/workers` (filtered by caller IP).
#[derive(Debug, Serialize, Deserialize)]
pub struct WorkerListResponse {
    pub workers: Vec<String>,
}

/// Body of `POST /api/batches` and `POST /api/batches/{id}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchRequest {
    pub worker_id: String,
}

/// A batch assignment: the batch key plus the identifiers to archive.
#[derive(Debug, Serialize, Deserialize)]
pub struct BatchResponse {
    pub batch_id: String,
    pub objects: Vec<String>,
}

/// Body of `POST /api/commit`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommitRequest {
    pub worker_id: String,
    pub batch_id: String,
    /// Byte length the worker claims to have produced.
    pub content_size: u64,
}

/// Response to `POST /api/commit`. An empty `upload_url` means the size was
/// verified against the authoritative object and nothing should be uploaded.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommitResponse {
    pub upload_url: String,
}

/// Body of `POST /api/finalize`.
#[derive(Debug, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub worker_id: String,
    pub batch_id: String,
}

/// Body of `POST /api/videos/submit`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct VideoSubmission {
    #[serde(default)]
    pub videos: Vec<String>,
}

/// Body of `POST /api/playlists/submit`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PlaylistSubmission {
    #[serde(default)]
    pub playlists: Vec<String>,
}

/// Body of `POST /api/channels/submit`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ChannelSubmission {
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Identifiers that were actually staged (already-known ones are dropped).
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub inserted: Vec<String>,
}

/// Response to `GET /api/stats`.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub batch_count: i64,
    pub batch_finished: i64,
    pub batch_remaining: i64,
    /// Sum of authoritative archive sizes across finished batches, in bytes.
    pub content_size: i64,
    pub estimated_video_count: i64,
    pub estimated_video_finished: i64,
    pub estimated_video_remaining: i64,
    pub worker_count: i64,
    /// Workers whose last successful commit or finalize is within one hour.
    pub worker_active: i64,
}
