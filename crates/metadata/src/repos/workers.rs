//! Worker repository.

use crate::error::MetadataResult;
use crate::models::WorkerRow;
use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

/// Repository for worker rows.
///
/// Mutations against the same worker row must be serialisable; every method
/// here is a single atomic statement or transaction, so concurrent requests
/// never observe torn state.
#[async_trait]
pub trait WorkerRepo: Send + Sync {
    /// Insert a freshly enrolled worker.
    async fn enroll_worker(&self, worker: &WorkerRow) -> MetadataResult<()>;

    /// Get a worker by ID.
    async fn get_worker(&self, worker_id: Uuid) -> MetadataResult<Option<WorkerRow>>;

    /// Count workers enrolled from an IP.
    async fn count_workers_by_ip(&self, ip: &str) -> MetadataResult<u64>;

    /// List worker IDs enrolled from an IP (lost-ID recovery).
    async fn workers_for_ip(&self, ip: &str) -> MetadataResult<Vec<Uuid>>;

    /// Bind a worker to a batch. Compare-and-set: fails with
    /// [`crate::MetadataError::Conflict`] if the worker already holds one.
    async fn bind_worker_to_batch(&self, worker_id: Uuid, batch_id: &str) -> MetadataResult<()>;

    /// Release a worker after an honest commit or finalize: clears
    /// `current_batch`, credits one reputation point, stamps
    /// `last_committed`.
    async fn release_worker(&self, worker_id: Uuid, now: OffsetDateTime) -> MetadataResult<()>;

    /// Deduct `delta` reputation; the worker is disabled when the result
    /// drops below zero. The held batch stays bound.
    async fn penalise_worker(&self, worker_id: Uuid, delta: i64) -> MetadataResult<()>;
}
