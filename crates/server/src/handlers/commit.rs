//! Commit verifier handler.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::{require_bound_batch, resolve_worker};
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use drover_core::protocol::{CommitRequest, CommitResponse};
use drover_core::{GZIP_CONTENT_TYPE, canonical_object_key, versioned_object_key};
use time::OffsetDateTime;

/// Relative discrepancy between a reported and an authoritative size.
fn relative_discrepancy(reported: i64, authoritative: i64) -> f64 {
    if authoritative == 0 {
        return if reported == 0 { 0.0 } else { f64::INFINITY };
    }
    (reported as f64 - authoritative as f64).abs() / authoritative as f64
}

/// POST /api/commit - Validate a worker's reported archive size.
///
/// For an unfinished batch this simply issues the presigned PUT for the
/// canonical object (completion itself happens on `/api/finalize`). For a
/// finished batch it is a known-answer check against the recorded size:
/// agree and the worker is released with an empty `upload_url`; disagree and
/// either a trusted worker gets to upload new evidence under a versioned
/// key, or an untrusted one takes a reputation penalty.
#[tracing::instrument(skip_all, fields(batch_id = %req.batch_id))]
pub async fn commit_batch(
    State(state): State<AppState>,
    Json(req): Json<CommitRequest>,
) -> ApiResult<Json<CommitResponse>> {
    let worker = resolve_worker(&state, &req.worker_id).await?;
    require_bound_batch(&worker, &req.batch_id)?;

    let batch = state
        .metadata
        .get_batch(&req.batch_id)
        .await?
        .ok_or(ApiError::UnknownBatch)?;

    let content_size = i64::try_from(req.content_size).map_err(|_| {
        ApiError::Internal(format!(
            "content_size {} exceeds supported range",
            req.content_size
        ))
    })?;

    let Some(authoritative) = batch.content_size.filter(|_| batch.finished) else {
        // Not finished yet: nothing to verify against, hand out the upload
        // target for the canonical object.
        let upload_url = state
            .blobs
            .presign_put(
                &canonical_object_key(&batch.batch_id),
                content_size,
                GZIP_CONTENT_TYPE,
            )
            .await?;
        return Ok(Json(CommitResponse { upload_url }));
    };

    let discrepancy = relative_discrepancy(content_size, authoritative);

    if discrepancy < state.config.verify.content_threshold {
        // Sizes agree: the worker told the truth about a batch we already
        // hold, credit it and tell it to upload nothing.
        state
            .metadata
            .release_worker(worker.worker_id, OffsetDateTime::now_utc())
            .await?;

        tracing::debug!(
            worker_id = %worker.worker_id,
            batch_id = %batch.batch_id,
            discrepancy,
            "Verification passed"
        );
        return Ok(Json(CommitResponse {
            upload_url: String::new(),
        }));
    }

    if worker.reputation > state.config.verify.trusted_reputation {
        // A trusted worker disagreeing loudly is evidence, not noise.
        // Record the new size, bump the version, and let it upload under a
        // version-suffixed key; the canonical object stays untouched. The
        // worker keeps its hold and is credited on its next commit.
        let version = state
            .metadata
            .record_versioned_overwrite(&batch.batch_id, content_size)
            .await?;
        let upload_url = state
            .blobs
            .presign_put(
                &versioned_object_key(&batch.batch_id, version),
                content_size,
                GZIP_CONTENT_TYPE,
            )
            .await?;

        tracing::warn!(
            worker_id = %worker.worker_id,
            batch_id = %batch.batch_id,
            reported = content_size,
            authoritative,
            version,
            "Trusted overwrite accepted"
        );
        return Ok(Json(CommitResponse { upload_url }));
    }

    // Untrusted mismatch: penalise and keep the worker bound to the batch
    // so an operator can look at the evidence.
    state
        .metadata
        .penalise_worker(worker.worker_id, state.config.verify.mismatch_penalty)
        .await?;

    tracing::warn!(
        worker_id = %worker.worker_id,
        batch_id = %batch.batch_id,
        reported = content_size,
        authoritative,
        discrepancy,
        "Size mismatch, worker penalised"
    );
    Err(ApiError::SizeMismatch {
        batch_id: batch.batch_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discrepancy_is_relative() {
        assert!(relative_discrepancy(12400, 12345) < 0.05);
        assert!(relative_discrepancy(12345, 12345) == 0.0);
        assert!(relative_discrepancy(99999, 12345) > 0.05);
        // Symmetric in direction of the error.
        assert!(relative_discrepancy(11800, 12345) < 0.05);
        assert!(relative_discrepancy(0, 12345) >= 1.0);
    }

    #[test]
    fn discrepancy_handles_zero_authoritative() {
        assert_eq!(relative_discrepancy(0, 0), 0.0);
        assert!(relative_discrepancy(1, 0).is_infinite());
    }
}
