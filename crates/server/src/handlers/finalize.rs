//! First-time completion handler.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{require_bound_batch, resolve_worker};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use drover_core::canonical_object_key;
use drover_core::protocol::FinalizeRequest;
use time::OffsetDateTime;

/// POST /api/finalize - Record the first completion of a batch.
///
/// Reads the uploaded object's size straight from the store (never trusting
/// the worker's number) and persists it as the verification oracle for
/// every future worker. A finalize that races an already-finished batch
/// releases the worker without touching the batch row: rewriting the
/// authoritative size would retroactively invalidate past verifications.
#[tracing::instrument(skip_all, fields(batch_id = %req.batch_id))]
pub async fn finalize_batch(
    State(state): State<AppState>,
    Json(req): Json<FinalizeRequest>,
) -> ApiResult<StatusCode> {
    let worker = resolve_worker(&state, &req.worker_id).await?;
    require_bound_batch(&worker, &req.batch_id)?;

    let batch = state
        .metadata
        .get_batch(&req.batch_id)
        .await?
        .ok_or(ApiError::UnknownBatch)?;

    let now = OffsetDateTime::now_utc();

    if batch.finished {
        tracing::warn!(
            worker_id = %worker.worker_id,
            batch_id = %batch.batch_id,
            "Finalize of an already-finished batch, releasing worker without touching the row"
        );
        state.metadata.release_worker(worker.worker_id, now).await?;
        return Ok(StatusCode::NO_CONTENT);
    }

    // HEAD before any mutation: if the store is unreachable or the object
    // is missing, nothing changes and the worker may retry.
    let size = state
        .blobs
        .head_size(&canonical_object_key(&batch.batch_id))
        .await?;

    let transitioned = state.metadata.record_finalization(&batch.batch_id, size).await?;
    if !transitioned {
        tracing::warn!(
            batch_id = %batch.batch_id,
            "Batch finalized concurrently, keeping the earlier authoritative size"
        );
    } else {
        tracing::info!(
            worker_id = %worker.worker_id,
            batch_id = %batch.batch_id,
            content_size = size,
            "Batch finalized"
        );
    }

    state.metadata.release_worker(worker.worker_id, now).await?;
    Ok(StatusCode::NO_CONTENT)
}
