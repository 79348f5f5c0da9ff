//! S3-compatible blob store using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::BlobStore;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use std::time::Duration;
use tracing::instrument;

fn map_s3_operation_error<E>(err: aws_sdk_s3::error::SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    StorageError::S3(Box::new(err))
}

/// S3-compatible blob store.
pub struct S3Backend {
    client: Client,
    bucket: String,
    /// Stored endpoint host without scheme, for the public base URL.
    endpoint_host: Option<String>,
    region: String,
    force_path_style: bool,
    presign_expiry: Duration,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("endpoint_host", &self.endpoint_host)
            .field("region", &self.region)
            .field("force_path_style", &self.force_path_style)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// # Arguments
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`)
    ///   instead of virtual-hosted style (`bucket.endpoint/key`). Required
    ///   for MinIO and some S3-compatible services.
    pub async fn new(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        Self::with_presign_expiry(
            bucket,
            endpoint,
            region,
            access_key,
            secret_key,
            force_path_style,
            Duration::from_secs(3600),
        )
        .await
    }

    /// Create a new S3 backend with an explicit presign validity window.
    pub async fn with_presign_expiry(
        bucket: &str,
        endpoint: Option<String>,
        region: Option<String>,
        access_key: Option<String>,
        secret_key: Option<String>,
        force_path_style: bool,
        presign_expiry: Duration,
    ) -> StorageResult<Self> {
        if access_key.is_some() ^ secret_key.is_some() {
            return Err(StorageError::Config(
                "storage config requires both access_key and secret_key when either is set"
                    .to_string(),
            ));
        }

        let resolved_region = region.unwrap_or_else(|| "us-east-1".to_string());
        let mut s3_config_builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(aws_config::Region::new(resolved_region.clone()));

        // Explicit credentials from config, else the ambient AWS chain.
        if let (Some(key_id), Some(secret)) = (access_key, secret_key) {
            let credentials =
                aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "drover-config");
            s3_config_builder = s3_config_builder.credentials_provider(credentials);
        } else {
            let chain =
                aws_config::default_provider::credentials::DefaultCredentialsChain::builder()
                    .region(aws_config::Region::new(resolved_region.clone()))
                    .build()
                    .await;
            s3_config_builder = s3_config_builder.credentials_provider(chain);
        }

        // Accept bare host:port endpoints (e.g., "minio:9000"); scheme
        // defaults to https for S3-compatible cloud stores.
        let normalized_endpoint = endpoint.as_ref().map(|endpoint_url| {
            let endpoint_lower = endpoint_url.to_lowercase();
            if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
                endpoint_url.clone()
            } else {
                format!("https://{}", endpoint_url)
            }
        });

        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }

        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let endpoint_host = normalized_endpoint.map(|url| {
            url.trim_start_matches("https://")
                .trim_start_matches("http://")
                .trim_end_matches('/')
                .to_string()
        });

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            endpoint_host,
            region: resolved_region,
            force_path_style,
            presign_expiry,
        })
    }
}

#[async_trait]
impl BlobStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn presign_put(
        &self,
        key: &str,
        content_length: i64,
        content_type: &str,
    ) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(self.presign_expiry)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        // content_length and content_type become signed headers, so the
        // store itself rejects an upload that deviates from them.
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_length(content_length)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(map_s3_operation_error)?;

        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn head_size(&self, key: &str) -> StorageResult<i64> {
        let output = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err
                    && service_err.raw().status().as_u16() == 404
                {
                    return StorageError::NotFound(key.to_string());
                }
                map_s3_operation_error(err)
            })?;

        Ok(output.content_length().unwrap_or(0))
    }

    fn public_base_url(&self) -> String {
        match &self.endpoint_host {
            Some(host) if self.force_path_style => format!("https://{}/{}", host, self.bucket),
            Some(host) => format!("https://{}.{}.{}", self.bucket, self.region, host),
            None => format!("https://{}.s3.{}.amazonaws.com", self.bucket, self.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drover_core::{GZIP_CONTENT_TYPE, canonical_object_key};

    async fn make_backend(force_path_style: bool) -> S3Backend {
        S3Backend::new(
            "archive-bucket",
            Some("s3.test".to_string()),
            Some("eu-central-1".to_string()),
            Some("access".to_string()),
            Some("secret".to_string()),
            force_path_style,
        )
        .await
        .expect("backend should construct for unit tests")
    }

    #[tokio::test]
    async fn public_base_url_virtual_hosted() {
        let backend = make_backend(false).await;
        assert_eq!(
            backend.public_base_url(),
            "https://archive-bucket.eu-central-1.s3.test"
        );
    }

    #[tokio::test]
    async fn public_base_url_path_style() {
        let backend = make_backend(true).await;
        assert_eq!(backend.public_base_url(), "https://s3.test/archive-bucket");
    }

    #[tokio::test]
    async fn public_base_url_without_endpoint() {
        let backend = S3Backend::new("b", None, Some("us-east-1".to_string()), None, None, false)
            .await
            .unwrap();
        assert_eq!(backend.public_base_url(), "https://b.s3.us-east-1.amazonaws.com");
    }

    #[tokio::test]
    async fn requires_complete_credentials() {
        let err = S3Backend::new(
            "bucket",
            None,
            Some("us-east-1".to_string()),
            Some("access".to_string()),
            None,
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StorageError::Config(_)));
    }

    #[tokio::test]
    async fn presign_put_constrains_length_and_type() {
        let backend = make_backend(true).await;
        let key = canonical_object_key("batch-0001");
        let url = backend
            .presign_put(&key, 12345, GZIP_CONTENT_TYPE)
            .await
            .unwrap();

        assert!(url.contains("batch-0001.json.gz"));
        assert!(url.contains("X-Amz-Signature="));
        assert!(url.contains("X-Amz-Expires="));
        // Both constraint headers must be part of the signature.
        assert!(url.contains("content-length"));
        assert!(url.contains("content-type"));
    }

    #[tokio::test]
    async fn presigned_versioned_keys_never_alias_canonical() {
        let backend = make_backend(true).await;
        let canonical = backend
            .presign_put(&canonical_object_key("b1"), 10, GZIP_CONTENT_TYPE)
            .await
            .unwrap();
        let versioned = backend
            .presign_put(
                &drover_core::versioned_object_key("b1", 0),
                10,
                GZIP_CONTENT_TYPE,
            )
            .await
            .unwrap();

        assert!(canonical.contains("/b1.json.gz?"));
        assert!(versioned.contains("/b1.json.gz-0?"));
    }
}
