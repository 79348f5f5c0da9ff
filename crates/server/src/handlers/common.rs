//! Shared handler helpers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{ConnectInfo, Request};
use drover_metadata::models::WorkerRow;
use std::net::SocketAddr;
use uuid::Uuid;

/// Resolve the client IP for admission decisions from the connection info
/// set by `into_make_service_with_connect_info`. Falls back to loopback
/// when the router is driven without it (unit tests).
pub fn client_ip(req: &Request) -> String {
    match req.extensions().get::<ConnectInfo<SocketAddr>>() {
        Some(ConnectInfo(addr)) => addr.ip().to_string(),
        None => {
            tracing::debug!("no connection info on request, attributing to loopback");
            "127.0.0.1".to_string()
        }
    }
}

/// Resolve a worker identity. Every protected endpoint starts here:
/// unparseable and unenrolled IDs are equally unknown, and a disabled
/// worker is rejected before anything else is looked at.
pub async fn resolve_worker(state: &AppState, worker_id: &str) -> ApiResult<WorkerRow> {
    let worker_id = Uuid::parse_str(worker_id).map_err(|_| ApiError::UnknownWorker)?;
    let worker = state
        .metadata
        .get_worker(worker_id)
        .await?
        .ok_or(ApiError::UnknownWorker)?;

    if worker.disabled {
        return Err(ApiError::WorkerDisabled);
    }
    Ok(worker)
}

/// Enforce the commit/finalize precondition: a non-empty batch id equal to
/// the batch this worker currently holds.
pub fn require_bound_batch(worker: &WorkerRow, batch_id: &str) -> ApiResult<()> {
    if batch_id.is_empty() {
        return Err(ApiError::EmptyBatchId);
    }
    match worker.current_batch.as_deref() {
        Some(held) if held == batch_id => Ok(()),
        Some(held) => Err(ApiError::MustCommitCurrent {
            batch_id: held.to_string(),
        }),
        None => Err(ApiError::ForbiddenBatch),
    }
}
