//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{BatchRepo, StatsRepo, SubmissionRepo, WorkerRepo};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// SQLite schema (embedded).
const SQLITE_SCHEMA: &str = include_str!("sqlite_schema.sql");

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: WorkerRepo + BatchRepo + SubmissionRepo + StatsRepo + Send + Sync {
    /// Run database migrations.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity and health.
    async fn health_check(&self) -> MetadataResult<()>;
}

/// SQLite-based metadata store, for development and tests.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Create a new SQLite store.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .foreign_keys(true)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection avoids
            // persistent "database is locked" failures under axum concurrency.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SQLITE_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// Implement all the repository traits for SqliteStore
mod sqlite_impl {
    use super::*;
    use crate::models::{BatchRow, StatsRow, WorkerRow};
    use crate::repos::SubmissionKind;
    use std::collections::HashSet;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl WorkerRepo for SqliteStore {
        async fn enroll_worker(&self, worker: &WorkerRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO workers (worker_id, ip, reputation, disabled, current_batch, created_at, last_committed)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(worker.worker_id)
            .bind(&worker.ip)
            .bind(worker.reputation)
            .bind(worker.disabled)
            .bind(&worker.current_batch)
            .bind(worker.created_at)
            .bind(worker.last_committed)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn get_worker(&self, worker_id: Uuid) -> MetadataResult<Option<WorkerRow>> {
            let row = sqlx::query_as::<_, WorkerRow>("SELECT * FROM workers WHERE worker_id = ?")
                .bind(worker_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn count_workers_by_ip(&self, ip: &str) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers WHERE ip = ?")
                .bind(ip)
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }

        async fn workers_for_ip(&self, ip: &str) -> MetadataResult<Vec<Uuid>> {
            let ids = sqlx::query_scalar::<_, Uuid>(
                "SELECT worker_id FROM workers WHERE ip = ? ORDER BY created_at",
            )
            .bind(ip)
            .fetch_all(&self.pool)
            .await?;
            Ok(ids)
        }

        async fn bind_worker_to_batch(
            &self,
            worker_id: Uuid,
            batch_id: &str,
        ) -> MetadataResult<()> {
            // Compare-and-set: losing a dispatch race must not silently
            // replace a batch the worker still owes a commit for.
            let result = sqlx::query(
                "UPDATE workers SET current_batch = ? WHERE worker_id = ? AND current_batch IS NULL",
            )
            .bind(batch_id)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::Conflict(format!(
                    "worker {worker_id} already holds a batch"
                )));
            }
            Ok(())
        }

        async fn release_worker(
            &self,
            worker_id: Uuid,
            now: OffsetDateTime,
        ) -> MetadataResult<()> {
            let result = sqlx::query(
                r#"
                UPDATE workers
                SET current_batch = NULL, reputation = reputation + 1, last_committed = ?
                WHERE worker_id = ?
                "#,
            )
            .bind(now)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("worker {worker_id}")));
            }
            Ok(())
        }

        async fn penalise_worker(&self, worker_id: Uuid, delta: i64) -> MetadataResult<()> {
            // All SET clauses read the pre-update reputation, so the disable
            // flag flips exactly when the new value crosses below zero.
            let result = sqlx::query(
                r#"
                UPDATE workers
                SET reputation = reputation - ?, disabled = disabled OR (reputation - ? < 0)
                WHERE worker_id = ?
                "#,
            )
            .bind(delta)
            .bind(delta)
            .bind(worker_id)
            .execute(&self.pool)
            .await?;

            if result.rows_affected() == 0 {
                return Err(MetadataError::NotFound(format!("worker {worker_id}")));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl BatchRepo for SqliteStore {
        async fn get_batch(&self, batch_id: &str) -> MetadataResult<Option<BatchRow>> {
            let row = sqlx::query_as::<_, BatchRow>("SELECT * FROM batches WHERE batch_id = ?")
                .bind(batch_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn insert_batch(&self, batch: &BatchRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO batches (batch_id, start_ctid, end_ctid, finished, content_size, version, videos)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&batch.batch_id)
            .bind(&batch.start_ctid)
            .bind(&batch.end_ctid)
            .bind(batch.finished)
            .bind(batch.content_size)
            .bind(batch.version)
            .bind(&batch.videos)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn count_batches(&self, finished: bool) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE finished = ?")
                .bind(finished)
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }

        async fn pick_random_batch(&self, finished: bool) -> MetadataResult<Option<BatchRow>> {
            let row = sqlx::query_as::<_, BatchRow>(
                "SELECT * FROM batches WHERE finished = ? ORDER BY RANDOM() LIMIT 1",
            )
            .bind(finished)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row)
        }

        async fn record_finalization(&self, batch_id: &str, size: i64) -> MetadataResult<bool> {
            // Guarded on finished so a lost finalize race can never rewrite
            // an authoritative size that verifications already used.
            let result = sqlx::query(
                "UPDATE batches SET content_size = ?, finished = 1 WHERE batch_id = ? AND finished = 0",
            )
            .bind(size)
            .bind(batch_id)
            .execute(&self.pool)
            .await?;

            Ok(result.rows_affected() > 0)
        }

        async fn record_versioned_overwrite(
            &self,
            batch_id: &str,
            new_size: i64,
        ) -> MetadataResult<i64> {
            let mut tx = self.pool.begin().await?;

            let version: Option<i64> =
                sqlx::query_scalar("SELECT version FROM batches WHERE batch_id = ?")
                    .bind(batch_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some(version) = version else {
                return Err(MetadataError::NotFound(format!("batch {batch_id}")));
            };

            sqlx::query(
                "UPDATE batches SET content_size = ?, version = version + 1 WHERE batch_id = ?",
            )
            .bind(new_size)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(version)
        }
    }

    #[async_trait]
    impl SubmissionRepo for SqliteStore {
        async fn known_identifiers(
            &self,
            kind: SubmissionKind,
            ids: &[String],
        ) -> MetadataResult<HashSet<String>> {
            let mut known = HashSet::new();
            if ids.is_empty() {
                return Ok(known);
            }

            for table in [kind.canonical_table(), kind.staging_table()] {
                let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!(
                    "SELECT {col} FROM {table} WHERE {col} IN (",
                    col = kind.id_column(),
                ));
                let mut separated = builder.separated(", ");
                for id in ids {
                    separated.push_bind(id);
                }
                builder.push(")");

                let rows: Vec<String> = builder
                    .build_query_scalar()
                    .fetch_all(&self.pool)
                    .await?;
                known.extend(rows);
            }

            Ok(known)
        }

        async fn stage_identifiers(
            &self,
            kind: SubmissionKind,
            ids: &[String],
        ) -> MetadataResult<()> {
            if ids.is_empty() {
                return Ok(());
            }

            let now = OffsetDateTime::now_utc();
            let mut builder = sqlx::QueryBuilder::<Sqlite>::new(format!(
                "INSERT INTO {} ({}, submitted_at) ",
                kind.staging_table(),
                kind.id_column(),
            ));
            builder.push_values(ids, |mut row, id| {
                row.push_bind(id);
                row.push_bind(now);
            });
            builder.push(" ON CONFLICT DO NOTHING");

            builder.build().execute(&self.pool).await?;
            Ok(())
        }
    }

    #[async_trait]
    impl StatsRepo for SqliteStore {
        async fn coordination_stats(
            &self,
            active_since: OffsetDateTime,
        ) -> MetadataResult<StatsRow> {
            let batch_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
                .fetch_one(&self.pool)
                .await?;
            let batch_finished: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE finished = 1")
                    .fetch_one(&self.pool)
                    .await?;
            let content_size: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(content_size), 0) FROM batches WHERE finished = 1",
            )
            .fetch_one(&self.pool)
            .await?;
            let worker_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
                .fetch_one(&self.pool)
                .await?;
            let worker_active: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM workers WHERE last_committed >= ?")
                    .bind(active_since)
                    .fetch_one(&self.pool)
                    .await?;

            Ok(StatsRow {
                batch_count,
                batch_finished,
                content_size,
                worker_count,
                worker_active,
            })
        }
    }
}
