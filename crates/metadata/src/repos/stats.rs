//! Read-only aggregate statistics.

use crate::error::MetadataResult;
use crate::models::StatsRow;
use async_trait::async_trait;
use time::OffsetDateTime;

/// Repository for the public stats endpoint.
#[async_trait]
pub trait StatsRepo: Send + Sync {
    /// Batch and worker counters; `active_since` bounds the "active worker"
    /// window (last successful commit at or after that instant).
    async fn coordination_stats(&self, active_since: OffsetDateTime) -> MetadataResult<StatsRow>;
}
