//! Community submission handlers: filter, dedup, stage.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::State;
use drover_core::ident;
use drover_core::protocol::{
    ChannelSubmission, PlaylistSubmission, SubmissionResponse, VideoSubmission,
};
use drover_metadata::SubmissionKind;
use std::collections::HashSet;

/// Drop malformed identifiers and in-request duplicates, preserving order.
fn filter_candidates(ids: Vec<String>, accept: fn(&str) -> bool) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter(|id| accept(id))
        .filter(|id| seen.insert(id.clone()))
        .collect()
}

/// Stage candidates that are not already known (authoritative or staging
/// table), returning exactly the ones inserted.
async fn stage_submissions(
    state: &AppState,
    kind: SubmissionKind,
    candidates: Vec<String>,
) -> ApiResult<Vec<String>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let known = state.metadata.known_identifiers(kind, &candidates).await?;
    let fresh: Vec<String> = candidates
        .into_iter()
        .filter(|id| !known.contains(id))
        .collect();

    if !fresh.is_empty() {
        state.metadata.stage_identifiers(kind, &fresh).await?;
        tracing::debug!(kind = ?kind, staged = fresh.len(), "Submissions staged");
    }
    Ok(fresh)
}

/// POST /api/videos/submit
#[tracing::instrument(skip_all)]
pub async fn submit_videos(
    State(state): State<AppState>,
    Json(req): Json<VideoSubmission>,
) -> ApiResult<Json<SubmissionResponse>> {
    let candidates = filter_candidates(req.videos, ident::is_video_id);
    let inserted = stage_submissions(&state, SubmissionKind::Videos, candidates).await?;
    Ok(Json(SubmissionResponse { inserted }))
}

/// POST /api/playlists/submit
#[tracing::instrument(skip_all)]
pub async fn submit_playlists(
    State(state): State<AppState>,
    Json(req): Json<PlaylistSubmission>,
) -> ApiResult<Json<SubmissionResponse>> {
    let candidates = filter_candidates(req.playlists, ident::is_playlist_id);
    let inserted = stage_submissions(&state, SubmissionKind::Playlists, candidates).await?;
    Ok(Json(SubmissionResponse { inserted }))
}

/// POST /api/channels/submit
#[tracing::instrument(skip_all)]
pub async fn submit_channels(
    State(state): State<AppState>,
    Json(req): Json<ChannelSubmission>,
) -> ApiResult<Json<SubmissionResponse>> {
    let candidates = filter_candidates(req.channels, ident::is_channel_id);
    let inserted = stage_submissions(&state, SubmissionKind::Channels, candidates).await?;
    Ok(Json(SubmissionResponse { inserted }))
}
