//! Blob store trait.

use crate::error::StorageResult;
use async_trait::async_trait;

/// Write-controlled view of the archive bucket.
///
/// The only write path the swarm ever gets is a presigned PUT scoped to one
/// object key with a fixed content length and content type; a deviating
/// upload is rejected by the store itself, not by us.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Produce a presigned PUT URL for `key`, valid only for an upload of
    /// exactly `content_length` bytes with the given content type.
    async fn presign_put(
        &self,
        key: &str,
        content_length: i64,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Read the store's authoritative byte length of `key`.
    /// Fails with [`crate::StorageError::NotFound`] if the object is absent.
    async fn head_size(&self, key: &str) -> StorageResult<i64>;

    /// Public base URL of the bucket, for client display.
    fn public_base_url(&self) -> String;
}
