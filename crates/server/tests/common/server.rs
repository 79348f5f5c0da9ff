//! Server test utilities.

use super::storage::StubBlobStore;
use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode};
use drover_core::config::AppConfig;
use drover_metadata::models::{BatchRow, WorkerRow};
use drover_metadata::repos::{BatchRepo, WorkerRepo};
use drover_metadata::{MetadataStore, SqliteStore};
use drover_server::{AppState, create_router};
use serde_json::Value;
use sqlx::types::Json as SqlJson;
use std::net::SocketAddr;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub store: Arc<SqliteStore>,
    pub blobs: Arc<StubBlobStore>,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Create a new test server backed by SQLite and an in-memory blob stub.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server with custom config modifications.
    pub async fn with_config<F>(modifier: F) -> Self
    where
        F: FnOnce(&mut AppConfig),
    {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

        let db_path = temp_dir.path().join("metadata.db");
        let store = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );
        let metadata: Arc<dyn MetadataStore> = store.clone();

        let blobs = Arc::new(StubBlobStore::new());

        let mut config = AppConfig::for_testing();
        config.metadata = drover_core::config::MetadataConfig::Sqlite { path: db_path };
        modifier(&mut config);

        let state = AppState::new(config, metadata, blobs.clone());
        let router = create_router(state.clone());

        Self {
            router,
            state,
            store,
            blobs,
            _temp_dir: temp_dir,
        }
    }

    /// Seed a batch fixture.
    pub async fn seed_batch(&self, batch_id: &str, finished: bool, content_size: Option<i64>) {
        let batch = BatchRow {
            batch_id: batch_id.to_string(),
            start_ctid: Some("(0,1)".to_string()),
            end_ctid: Some("(16,2)".to_string()),
            finished,
            content_size,
            version: 0,
            videos: SqlJson(vec![
                "dQw4w9WgXcQ".to_string(),
                "aaaaaaaaaaa".to_string(),
                "bbbbbbbbbbb".to_string(),
            ]),
        };
        self.store
            .insert_batch(&batch)
            .await
            .expect("Failed to seed batch");
    }

    /// Fetch a worker row by its textual ID.
    pub async fn worker_row(&self, worker_id: &str) -> WorkerRow {
        let id = Uuid::parse_str(worker_id).expect("invalid worker id");
        self.store
            .get_worker(id)
            .await
            .expect("Failed to fetch worker")
            .expect("worker not found")
    }

    /// Fetch a batch row.
    pub async fn batch_row(&self, batch_id: &str) -> BatchRow {
        self.store
            .get_batch(batch_id)
            .await
            .expect("Failed to fetch batch")
            .expect("batch not found")
    }

    /// Set a worker's reputation directly (fixture shortcut).
    pub async fn set_reputation(&self, worker_id: &str, reputation: i64) {
        sqlx::query("UPDATE workers SET reputation = ? WHERE worker_id = ?")
            .bind(reputation)
            .bind(Uuid::parse_str(worker_id).unwrap())
            .execute(self.store.pool())
            .await
            .expect("Failed to set reputation");
    }

    /// Clear a worker's batch hold without the usual release credit
    /// (fixture shortcut for repeated-dispatch tests).
    pub async fn clear_hold(&self, worker_id: &str) {
        sqlx::query("UPDATE workers SET current_batch = NULL WHERE worker_id = ?")
            .bind(Uuid::parse_str(worker_id).unwrap())
            .execute(self.store.pool())
            .await
            .expect("Failed to clear hold");
    }

    /// Enroll a worker through the API and return its ID.
    pub async fn enroll_worker(&self) -> String {
        let (status, body) = json_request(&self.router, "POST", "/api/workers/create", None).await;
        assert_eq!(status, StatusCode::OK, "enrollment failed: {body}");
        body["worker_id"].as_str().expect("worker_id").to_string()
    }
}

/// Make a JSON request against the router and decode the response.
#[allow(dead_code)]
pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    json_request_from(router, method, uri, body, None).await
}

/// Like [`json_request`], with an explicit client address attached the way
/// `into_make_service_with_connect_info` would.
#[allow(dead_code)]
pub async fn json_request_from(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
    peer: Option<SocketAddr>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let mut request = builder.body(body).unwrap();
    if let Some(addr) = peer {
        request.extensions_mut().insert(ConnectInfo(addr));
    }

    let response = router.clone().oneshot(request).await.unwrap();

    let status = response.status();
    let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json: Value = if body_bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
