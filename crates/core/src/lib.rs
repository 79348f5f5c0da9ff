//! Core domain types and shared logic for the Drover coordination server.
//!
//! This crate defines the vocabulary used across all other crates:
//! - Configuration structures for the server, verifier, storage, and metadata
//! - Wire-protocol request/response types and error codes
//! - Identifier validation for community submissions
//! - Object-key naming for batch archives

pub mod config;
pub mod ident;
pub mod object_key;
pub mod protocol;

pub use object_key::{canonical_object_key, versioned_object_key};
pub use protocol::ErrorCode;

/// Estimated number of target identifiers covered by one batch.
/// Used only for the rough progress figures on `/api/stats`.
pub const VIDEOS_PER_BATCH: i64 = 10_000;

/// Content type every batch archive upload must carry; baked into the
/// presigned URL so the store rejects anything else.
pub const GZIP_CONTENT_TYPE: &str = "application/gzip";

/// A worker counts as active when its last successful commit or finalize
/// happened within this window.
pub const ACTIVE_WORKER_WINDOW_SECS: i64 = 3600;
