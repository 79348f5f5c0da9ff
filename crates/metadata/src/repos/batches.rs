//! Batch repository.

use crate::error::MetadataResult;
use crate::models::BatchRow;
use async_trait::async_trait;

/// Repository for batch rows.
#[async_trait]
pub trait BatchRepo: Send + Sync {
    /// Get a batch by ID.
    async fn get_batch(&self, batch_id: &str) -> MetadataResult<Option<BatchRow>>;

    /// Insert a batch. Batches are normally pre-seeded by the corpus
    /// partitioner; this exists for seeding tools and test fixtures.
    async fn insert_batch(&self, batch: &BatchRow) -> MetadataResult<()>;

    /// Count batches by finished state.
    async fn count_batches(&self, finished: bool) -> MetadataResult<u64>;

    /// Pick a uniformly random batch among those with the given finished
    /// state.
    async fn pick_random_batch(&self, finished: bool) -> MetadataResult<Option<BatchRow>>;

    /// First-time completion: set `(content_size, finished)` if the batch is
    /// still unfinished. Returns whether the row transitioned; an
    /// already-finished batch is left untouched so the authoritative size
    /// used for past verifications survives.
    async fn record_finalization(&self, batch_id: &str, size: i64) -> MetadataResult<bool>;

    /// Trusted overwrite: set `content_size` to the new size and bump
    /// `version`. Returns the version *before* the increment, which names
    /// the upload object key.
    async fn record_versioned_overwrite(&self, batch_id: &str, new_size: i64)
    -> MetadataResult<i64>;
}
