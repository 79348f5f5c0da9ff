//! Object-store gateway for Drover.
//!
//! The coordination server never moves archive bytes itself: workers upload
//! through presigned PUT URLs, and the server reads back authoritative sizes
//! with HEAD requests. This crate provides exactly that surface:
//! - Presigned PUT URL issuance, constrained to key, length, and type
//! - HEAD size reads for finalization
//! - The public bucket base URL handed to workers at enrollment

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::s3::S3Backend;
pub use error::{StorageError, StorageResult};
pub use traits::BlobStore;

use drover_core::config::StorageConfig;
use std::sync::Arc;
use std::time::Duration;

/// Create a blob store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn BlobStore>> {
    config.validate().map_err(StorageError::Config)?;

    let backend = S3Backend::with_presign_expiry(
        &config.bucket,
        config.endpoint.clone(),
        config.region.clone(),
        config.access_key.clone(),
        config.secret_key.clone(),
        config.force_path_style,
        Duration::from_secs(config.presign_expiry_secs),
    )
    .await?;
    Ok(Arc::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_core::config::StorageConfig;

    #[tokio::test]
    async fn from_config_s3_ok() {
        let config = StorageConfig {
            bucket: "bucket".to_string(),
            endpoint: Some("minio:9000".to_string()),
            region: Some("us-east-1".to_string()),
            access_key: None,
            secret_key: None,
            force_path_style: true,
            presign_expiry_secs: 3600,
        };

        let store = from_config(&config).await.unwrap();
        drop(store);
    }

    #[tokio::test]
    async fn from_config_rejects_partial_credentials() {
        let config = StorageConfig {
            bucket: "bucket".to_string(),
            endpoint: None,
            region: None,
            access_key: Some("access".to_string()),
            secret_key: None,
            force_path_style: false,
            presign_expiry_secs: 3600,
        };

        match from_config(&config).await {
            Ok(_) => panic!("expected error"),
            Err(StorageError::Config(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
