//! In-memory blob store stub for server tests.

use async_trait::async_trait;
use drover_storage::{BlobStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// Stand-in for the S3 gateway. Presigned URLs are fake but embed the
/// object key and constraints so tests can assert on them; HEAD answers
/// come from a seeded map of object sizes.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct StubBlobStore {
    objects: Mutex<HashMap<String, i64>>,
}

#[allow(dead_code)]
impl StubBlobStore {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Pretend a worker uploaded `key` with the given byte length.
    pub fn put_object(&self, key: &str, size: i64) {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), size);
    }
}

#[async_trait]
impl BlobStore for StubBlobStore {
    async fn presign_put(
        &self,
        key: &str,
        content_length: i64,
        content_type: &str,
    ) -> StorageResult<String> {
        Ok(format!(
            "https://archive-bucket.us-east-1.s3.test/{key}?X-Amz-Signature=stub&content-length={content_length}&content-type={content_type}"
        ))
    }

    async fn head_size(&self, key: &str) -> StorageResult<i64> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .copied()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn public_base_url(&self) -> String {
        "https://archive-bucket.us-east-1.s3.test".to_string()
    }
}
