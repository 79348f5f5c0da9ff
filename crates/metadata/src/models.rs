//! Database models mapping to the coordination schema.

use sqlx::FromRow;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;

/// Enrolled worker identity.
#[derive(Debug, Clone, FromRow)]
pub struct WorkerRow {
    pub worker_id: Uuid,
    /// Remote address observed at enrollment; used only for the per-IP
    /// admission cap and for recovering lost worker IDs.
    pub ip: String,
    /// Signed trust score. Starts at 0, +1 per honest commit or finalize,
    /// -10 per size mismatch.
    pub reputation: i64,
    /// Once true, every further request from this worker is rejected.
    pub disabled: bool,
    /// Batch this worker currently holds. Set ⇔ the worker's next call must
    /// be commit or finalize for exactly this batch. Holding is exclusive
    /// per worker, not per batch.
    pub current_batch: Option<String>,
    pub created_at: OffsetDateTime,
    /// Most recent successful commit or finalize.
    pub last_committed: Option<OffsetDateTime>,
}

/// Unit of work: a fixed partition of the target corpus.
#[derive(Debug, Clone, FromRow)]
pub struct BatchRow {
    /// Stable key; also the base of the archive object key
    /// (`<batch_id>.json.gz`).
    pub batch_id: String,
    /// Opaque range markers into the source corpus; not interpreted here.
    pub start_ctid: Option<String>,
    pub end_ctid: Option<String>,
    pub finished: bool,
    /// Authoritative byte length of the canonical object; present iff
    /// `finished`.
    pub content_size: Option<i64>,
    /// Bumped once per accepted trusted overwrite; never decreases.
    pub version: i64,
    /// Target identifiers contained in this batch.
    pub videos: Json<Vec<String>>,
}

/// Aggregate counters backing `/api/stats`.
#[derive(Debug, Clone, Default)]
pub struct StatsRow {
    pub batch_count: i64,
    pub batch_finished: i64,
    /// Sum of authoritative sizes across finished batches, in bytes.
    pub content_size: i64,
    pub worker_count: i64,
    pub worker_active: i64,
}
