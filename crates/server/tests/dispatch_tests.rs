//! Dispatch selection policy tests, driven through the HTTP surface with a
//! seeded lottery.

mod common;

use axum::http::StatusCode;
use common::server::{TestServer, json_request};
use serde_json::json;

/// Dispatch once and return the assigned batch id.
async fn dispatch(server: &TestServer, worker_id: &str) -> String {
    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/batches",
        Some(json!({ "worker_id": worker_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "dispatch failed: {body}");
    body["batch_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn fresh_workers_are_always_verified() {
    let server = TestServer::new().await;
    server.seed_batch("finished", true, Some(1000)).await;
    server.seed_batch("unfinished", false, None).await;

    let worker_id = server.enroll_worker().await;
    server.state.seed_lottery(7);

    // Reputation 0 draws from {0} alone: every dispatch is a challenge.
    for _ in 0..50 {
        assert_eq!(dispatch(&server, &worker_id).await, "finished");
        server.clear_hold(&worker_id).await;
    }
}

#[tokio::test]
async fn verification_probability_follows_reputation() {
    let server = TestServer::new().await;
    server.seed_batch("finished", true, Some(1000)).await;
    server.seed_batch("unfinished", false, None).await;

    let worker_id = server.enroll_worker().await;
    let reputation = 3i64;
    server.set_reputation(&worker_id, reputation).await;
    server.state.seed_lottery(42);

    let trials = 10_000u32;
    let mut finished_hits = 0u32;
    for _ in 0..trials {
        if dispatch(&server, &worker_id).await == "finished" {
            finished_hits += 1;
        }
        server.clear_hold(&worker_id).await;
    }

    // P(finished) = 1/(R+1) = 0.25; allow four standard deviations.
    let observed = finished_hits as f64 / trials as f64;
    let expected = 1.0 / (reputation as f64 + 1.0);
    let tolerance = 4.0 * (expected * (1.0 - expected) / trials as f64).sqrt();
    assert!(
        (observed - expected).abs() < tolerance,
        "observed {observed}, expected {expected} ± {tolerance}"
    );
}

#[tokio::test]
async fn exhausted_corpus_always_reverifies() {
    let server = TestServer::new().await;
    server.seed_batch("finished", true, Some(1000)).await;

    let worker_id = server.enroll_worker().await;
    // Trusted enough that the lottery almost never picks verification.
    server.set_reputation(&worker_id, 1_000_000).await;
    server.state.seed_lottery(7);

    for _ in 0..50 {
        assert_eq!(dispatch(&server, &worker_id).await, "finished");
        server.clear_hold(&worker_id).await;
    }
}

#[tokio::test]
async fn without_finished_batches_only_new_work_is_dispatched() {
    let server = TestServer::new().await;
    server.seed_batch("unfinished", false, None).await;

    let worker_id = server.enroll_worker().await;
    server.state.seed_lottery(7);

    // Reputation 0 wants to verify every time, but there is no oracle yet.
    for _ in 0..50 {
        assert_eq!(dispatch(&server, &worker_id).await, "unfinished");
        server.clear_hold(&worker_id).await;
    }
}

#[tokio::test]
async fn empty_corpus_is_a_server_error() {
    let server = TestServer::new().await;
    let worker_id = server.enroll_worker().await;

    let (status, body) = json_request(
        &server.router,
        "POST",
        "/api/batches",
        Some(json!({ "worker_id": worker_id })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error_code"].as_i64(), Some(500));
}
