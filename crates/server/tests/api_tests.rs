//! Integration tests for the HTTP surface: enrollment, stats, and the
//! error envelope.

mod common;

use axum::http::StatusCode;
use common::server::{TestServer, json_request, json_request_from};
use serde_json::json;
use std::net::SocketAddr;

#[tokio::test]
async fn landing_page_serves_html() {
    let server = TestServer::new().await;

    let (status, _) = json_request(&server.router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn enroll_returns_worker_id_and_bucket_url() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "POST", "/api/workers/create", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["s3_url"].as_str(),
        Some("https://archive-bucket.us-east-1.s3.test")
    );

    let worker = server.worker_row(body["worker_id"].as_str().unwrap()).await;
    assert_eq!(worker.reputation, 0);
    assert!(!worker.disabled);
    assert!(worker.current_batch.is_none());
}

#[tokio::test]
async fn worker_listing_is_scoped_to_caller_ip() {
    let server = TestServer::new().await;

    let worker_id = server.enroll_worker().await;

    // Same IP (loopback fallback) sees the worker.
    let (status, body) = json_request(&server.router, "GET", "/api/workers", None).await;
    assert_eq!(status, StatusCode::OK);
    let listed: Vec<&str> = body["workers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(listed, vec![worker_id.as_str()]);

    // A different IP sees nothing.
    let peer: SocketAddr = "198.51.100.7:52100".parse().unwrap();
    let (status, body) =
        json_request_from(&server.router, "GET", "/api/workers", None, Some(peer)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["workers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn enrollment_is_capped_per_ip() {
    let server = TestServer::with_config(|config| {
        config.server.max_workers_per_ip = 1;
    })
    .await;

    // The cap rejects once the IP has *more than* the configured number of
    // existing workers.
    server.enroll_worker().await;
    server.enroll_worker().await;

    let (status, body) = json_request(&server.router, "POST", "/api/workers/create", None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"].as_i64(), Some(1));

    // Other IPs are unaffected.
    let peer: SocketAddr = "198.51.100.7:52100".parse().unwrap();
    let (status, _) =
        json_request_from(&server.router, "POST", "/api/workers/create", None, Some(peer)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_and_malformed_worker_ids_are_rejected() {
    let server = TestServer::new().await;
    server.seed_batch("b1", false, None).await;

    for worker_id in ["1f9b6a76-9f39-4c2a-a2b8-000000000000", "not-a-uuid", ""] {
        let (status, body) = json_request(
            &server.router,
            "POST",
            "/api/batches",
            Some(json!({ "worker_id": worker_id })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"].as_i64(), Some(2));
    }
}

#[tokio::test]
async fn stats_reflect_seeded_state() {
    let server = TestServer::new().await;

    let (status, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batch_count"].as_i64(), Some(0));
    assert_eq!(body["worker_count"].as_i64(), Some(0));

    server.seed_batch("b1", true, Some(1000)).await;
    server.seed_batch("b2", true, Some(2345)).await;
    server.seed_batch("b3", false, None).await;
    server.enroll_worker().await;

    let (status, body) = json_request(&server.router, "GET", "/api/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["batch_count"].as_i64(), Some(3));
    assert_eq!(body["batch_finished"].as_i64(), Some(2));
    assert_eq!(body["batch_remaining"].as_i64(), Some(1));
    assert_eq!(body["content_size"].as_i64(), Some(3345));
    assert_eq!(body["estimated_video_count"].as_i64(), Some(30_000));
    assert_eq!(body["estimated_video_finished"].as_i64(), Some(20_000));
    assert_eq!(body["estimated_video_remaining"].as_i64(), Some(10_000));
    assert_eq!(body["worker_count"].as_i64(), Some(1));
    // The enrolled worker has not committed anything yet.
    assert_eq!(body["worker_active"].as_i64(), Some(0));
}

#[tokio::test]
async fn unknown_routes_are_not_protocol_errors() {
    let server = TestServer::new().await;

    let (status, _) = json_request(&server.router, "GET", "/api/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
