//! Batch dispatch handlers.

use crate::dispatch::verification_draw;
use crate::error::{ApiError, ApiResult};
use crate::handlers::common::resolve_worker;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Path, State};
use drover_core::protocol::{BatchRequest, BatchResponse};
use drover_metadata::MetadataError;
use drover_metadata::models::BatchRow;

/// POST /api/batches - Assign the next batch to a worker.
#[tracing::instrument(skip_all)]
pub async fn request_batch(
    State(state): State<AppState>,
    Json(req): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    let worker = resolve_worker(&state, &req.worker_id).await?;

    // The anti-spam rule: one batch at a time, commit or finalize before
    // asking for more.
    if let Some(held) = worker.current_batch {
        return Err(ApiError::MustCommitCurrent { batch_id: held });
    }

    let finished = state.metadata.count_batches(true).await?;
    let unfinished = state.metadata.count_batches(false).await?;

    let verify = {
        let mut rng = state.lottery.lock().expect("lottery lock poisoned");
        verification_draw(&mut *rng, worker.reputation)
    };

    // Re-verification hands out a finished batch as a known-answer
    // challenge; it is also the only option once the corpus is exhausted.
    let batch = if verify && finished > 0 {
        state.metadata.pick_random_batch(true).await?
    } else if unfinished == 0 && finished > 0 {
        state.metadata.pick_random_batch(true).await?
    } else {
        state.metadata.pick_random_batch(false).await?
    };

    let Some(batch) = batch else {
        return Err(ApiError::Internal("no batches available".to_string()));
    };

    match state
        .metadata
        .bind_worker_to_batch(worker.worker_id, &batch.batch_id)
        .await
    {
        Ok(()) => {}
        Err(MetadataError::Conflict(_)) => {
            // Lost a dispatch race against ourselves; report whatever got
            // bound first.
            let worker = resolve_worker(&state, &req.worker_id).await?;
            let held = worker
                .current_batch
                .ok_or_else(|| ApiError::Internal("worker hold vanished".to_string()))?;
            return Err(ApiError::MustCommitCurrent { batch_id: held });
        }
        Err(e) => return Err(e.into()),
    }

    tracing::debug!(
        worker_id = %worker.worker_id,
        batch_id = %batch.batch_id,
        finished = batch.finished,
        "Batch dispatched"
    );

    Ok(Json(batch_payload(batch)))
}

/// POST /api/batches/{batch_id} - Re-fetch the batch a worker is bound to.
#[tracing::instrument(skip_all, fields(batch_id = %batch_id))]
pub async fn refetch_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
    Json(req): Json<BatchRequest>,
) -> ApiResult<Json<BatchResponse>> {
    let worker = resolve_worker(&state, &req.worker_id).await?;

    if worker.current_batch.as_deref() != Some(batch_id.as_str()) {
        return Err(ApiError::ForbiddenBatch);
    }

    let batch = state
        .metadata
        .get_batch(&batch_id)
        .await?
        .ok_or(ApiError::UnknownBatch)?;

    Ok(Json(batch_payload(batch)))
}

fn batch_payload(batch: BatchRow) -> BatchResponse {
    BatchResponse {
        batch_id: batch.batch_id,
        objects: batch.videos.0,
    }
}
