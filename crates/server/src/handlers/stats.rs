//! Public statistics handler.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use drover_core::protocol::StatsResponse;
use drover_core::{ACTIVE_WORKER_WINDOW_SECS, VIDEOS_PER_BATCH};
use time::{Duration, OffsetDateTime};

/// GET /api/stats - Swarm progress counters.
#[tracing::instrument(skip_all)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<StatsResponse>> {
    let active_since = OffsetDateTime::now_utc() - Duration::seconds(ACTIVE_WORKER_WINDOW_SECS);
    let stats = state.metadata.coordination_stats(active_since).await?;

    let batch_remaining = stats.batch_count - stats.batch_finished;
    Ok(Json(StatsResponse {
        batch_count: stats.batch_count,
        batch_finished: stats.batch_finished,
        batch_remaining,
        content_size: stats.content_size,
        estimated_video_count: stats.batch_count * VIDEOS_PER_BATCH,
        estimated_video_finished: stats.batch_finished * VIDEOS_PER_BATCH,
        estimated_video_remaining: batch_remaining * VIDEOS_PER_BATCH,
        worker_count: stats.worker_count,
        worker_active: stats.worker_active,
    }))
}
