//! PostgreSQL-based metadata store implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::repos::{BatchRepo, StatsRepo, SubmissionRepo, WorkerRepo};
use crate::store::MetadataStore;
use async_trait::async_trait;
use drover_core::config::PgSslMode;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgSslMode as SqlxPgSslMode};
use sqlx::{Pool, Postgres};
use std::str::FromStr;

/// PostgreSQL schema (embedded).
const POSTGRES_SCHEMA: &str = include_str!("postgres_schema.sql");

fn postgres_schema_statements(schema: &str) -> Vec<&str> {
    schema
        .split(';')
        .filter_map(|statement| {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                return None;
            }
            let has_sql = trimmed.lines().any(|line| {
                let line = line.trim();
                !line.is_empty() && !line.starts_with("--")
            });
            has_sql.then_some(trimmed)
        })
        .collect()
}

/// PostgreSQL-based metadata store.
pub struct PostgresStore {
    pool: Pool<Postgres>,
}

impl PostgresStore {
    /// Create a new PostgreSQL store from a connection URL.
    pub async fn from_url(
        url: &str,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let opts = PgConnectOptions::from_str(url)?;
        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Create a new PostgreSQL store from individual connection parameters.
    ///
    /// This allows credentials to be passed separately, enabling better
    /// secret management (e.g., passwords via environment variables).
    #[allow(clippy::too_many_arguments)]
    pub async fn from_params(
        host: &str,
        port: u16,
        username: Option<&str>,
        password: Option<&str>,
        database: &str,
        ssl_mode: Option<PgSslMode>,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        let mut opts = PgConnectOptions::new()
            .host(host)
            .port(port)
            .database(database);

        if let Some(user) = username {
            opts = opts.username(user);
        }

        if let Some(pass) = password {
            opts = opts.password(pass);
        }

        if let Some(mode) = ssl_mode {
            let sqlx_mode = match mode {
                PgSslMode::Disable => SqlxPgSslMode::Disable,
                PgSslMode::Prefer => SqlxPgSslMode::Prefer,
                PgSslMode::Require => SqlxPgSslMode::Require,
            };
            opts = opts.ssl_mode(sqlx_mode);
        }

        // Log connection info without password
        tracing::info!(
            host = host,
            port = port,
            database = database,
            username = username.unwrap_or("<none>"),
            ssl_mode = ?ssl_mode,
            "Connecting to PostgreSQL"
        );

        Self::connect(opts, max_connections, statement_timeout_ms).await
    }

    /// Internal: Connect to PostgreSQL with the given options.
    async fn connect(
        mut opts: PgConnectOptions,
        max_connections: u32,
        statement_timeout_ms: Option<u64>,
    ) -> MetadataResult<Self> {
        // Bound every statement so a wedged query cannot pin a worker row
        // lock indefinitely.
        if let Some(timeout_ms) = statement_timeout_ms {
            opts = opts.options([("statement_timeout", format!("{}ms", timeout_ms))]);
            tracing::info!("PostgreSQL statement_timeout set to {}ms", timeout_ms);
        }

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;

        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PostgresStore {
    async fn migrate(&self) -> MetadataResult<()> {
        // PostgreSQL doesn't allow multiple statements in a single prepared
        // statement, so we split the schema and execute each separately.
        for statement in postgres_schema_statements(POSTGRES_SCHEMA) {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

mod postgres_impl {
    use super::*;
    use crate::models::{BatchRow, StatsRow, WorkerRow};
    use crate::repos::SubmissionKind;
    use std::collections::HashSet;
    use time::OffsetDateTime;
    use uuid::Uuid;

    #[async_trait]
    impl WorkerRepo for PostgresStore {
        async fn enroll_worker(&self, worker: &WorkerRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO workers (worker_id, ip, reputation, disabled, current_batch, created_at, last_committed)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
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
            let row = sqlx::query_as::<_, WorkerRow>("SELECT * FROM workers WHERE worker_id = $1")
                .bind(worker_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn count_workers_by_ip(&self, ip: &str) -> MetadataResult<u64> {
            let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers WHERE ip = $1")
                .bind(ip)
                .fetch_one(&self.pool)
                .await?;
            Ok(count as u64)
        }

        async fn workers_for_ip(&self, ip: &str) -> MetadataResult<Vec<Uuid>> {
            let ids = sqlx::query_scalar::<_, Uuid>(
                "SELECT worker_id FROM workers WHERE ip = $1 ORDER BY created_at",
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
                "UPDATE workers SET current_batch = $1 WHERE worker_id = $2 AND current_batch IS NULL",
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
                SET current_batch = NULL, reputation = reputation + 1, last_committed = $1
                WHERE worker_id = $2
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
                SET reputation = reputation - $1, disabled = disabled OR (reputation - $1 < 0)
                WHERE worker_id = $2
                "#,
            )
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
    impl BatchRepo for PostgresStore {
        async fn get_batch(&self, batch_id: &str) -> MetadataResult<Option<BatchRow>> {
            let row = sqlx::query_as::<_, BatchRow>("SELECT * FROM batches WHERE batch_id = $1")
                .bind(batch_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row)
        }

        async fn insert_batch(&self, batch: &BatchRow) -> MetadataResult<()> {
            sqlx::query(
                r#"
                INSERT INTO batches (batch_id, start_ctid, end_ctid, finished, content_size, version, videos)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
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
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE finished = $1")
                    .bind(finished)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count as u64)
        }

        async fn pick_random_batch(&self, finished: bool) -> MetadataResult<Option<BatchRow>> {
            let row = sqlx::query_as::<_, BatchRow>(
                "SELECT * FROM batches WHERE finished = $1 ORDER BY random() LIMIT 1",
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
                "UPDATE batches SET content_size = $1, finished = TRUE WHERE batch_id = $2 AND finished = FALSE",
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

            // Row lock serialises concurrent trusted overwrites of the same
            // batch, keeping version numbers (and object keys) unique.
            let version: Option<i64> =
                sqlx::query_scalar("SELECT version FROM batches WHERE batch_id = $1 FOR UPDATE")
                    .bind(batch_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            let Some(version) = version else {
                return Err(MetadataError::NotFound(format!("batch {batch_id}")));
            };

            sqlx::query(
                "UPDATE batches SET content_size = $1, version = version + 1 WHERE batch_id = $2",
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
    impl SubmissionRepo for PostgresStore {
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
                let mut builder = sqlx::QueryBuilder::<Postgres>::new(format!(
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
            let mut builder = sqlx::QueryBuilder::<Postgres>::new(format!(
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
    impl StatsRepo for PostgresStore {
        async fn coordination_stats(
            &self,
            active_since: OffsetDateTime,
        ) -> MetadataResult<StatsRow> {
            let batch_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM batches")
                .fetch_one(&self.pool)
                .await?;
            let batch_finished: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM batches WHERE finished = TRUE")
                    .fetch_one(&self.pool)
                    .await?;
            let content_size: i64 = sqlx::query_scalar(
                "SELECT COALESCE(SUM(content_size), 0)::BIGINT FROM batches WHERE finished = TRUE",
            )
            .fetch_one(&self.pool)
            .await?;
            let worker_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workers")
                .fetch_one(&self.pool)
                .await?;
            let worker_active: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM workers WHERE last_committed >= $1")
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
