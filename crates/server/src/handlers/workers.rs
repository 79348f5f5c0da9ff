//! Worker enrollment and recovery handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::common::client_ip;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use drover_core::protocol::{CreateWorkerResponse, WorkerListResponse};
use drover_metadata::models::WorkerRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// POST /api/workers/create - Enroll a new worker.
#[tracing::instrument(skip_all)]
pub async fn create_worker(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<CreateWorkerResponse>> {
    let ip = client_ip(&req);

    // Admission cap is the only thing the IP is used for; identity stays an
    // opaque server-issued ID.
    let existing = state.metadata.count_workers_by_ip(&ip).await?;
    if existing > state.config.server.max_workers_per_ip {
        return Err(ApiError::TooManyWorkers);
    }

    let worker = WorkerRow {
        worker_id: Uuid::new_v4(),
        ip,
        reputation: 0,
        disabled: false,
        current_batch: None,
        created_at: OffsetDateTime::now_utc(),
        last_committed: None,
    };
    state.metadata.enroll_worker(&worker).await?;

    tracing::info!(worker_id = %worker.worker_id, ip = %worker.ip, "Worker enrolled");

    Ok(Json(CreateWorkerResponse {
        worker_id: worker.worker_id.to_string(),
        s3_url: state.blobs.public_base_url(),
    }))
}

/// GET /api/workers - List worker IDs enrolled from the caller's IP, so a
/// client that lost its ID can recover it.
#[tracing::instrument(skip_all)]
pub async fn list_workers(
    State(state): State<AppState>,
    req: Request,
) -> ApiResult<Json<WorkerListResponse>> {
    let ip = client_ip(&req);
    let workers = state.metadata.workers_for_ip(&ip).await?;

    Ok(Json(WorkerListResponse {
        workers: workers.iter().map(Uuid::to_string).collect(),
    }))
}
