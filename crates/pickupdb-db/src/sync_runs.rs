//! Database operations for `sync_runs` and `sync_run_products`.
//!
//! A sync run is one pass of the bulk refresh over the product catalog.
//! Runs move `queued` -> `running` -> `succeeded` | `failed`; transitions
//! are guarded in SQL so a run can never skip or repeat a state.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// What started the run: `cli`, `server`, or `scheduler`.
    pub trigger_source: String,
    pub status: String,
    /// `true` when freshness checks were bypassed and every product was
    /// refetched.
    pub forced: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub products_processed: i32,
    pub products_failed: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A row from the `sync_run_products` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunProductRow {
    pub id: i64,
    pub sync_run_id: i64,
    pub product_code: String,
    /// Typically `succeeded` or `failed`.
    pub status: String,
    pub pickup_count: i32,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// sync_runs operations
// ---------------------------------------------------------------------------

/// Creates a new sync run in `queued` status.
///
/// Generates a UUID in Rust and binds it to `public_id`. Returns the full
/// newly-created row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert or fetch fails.
pub async fn create_sync_run(
    pool: &PgPool,
    trigger_source: &str,
    forced: bool,
) -> Result<SyncRunRow, DbError> {
    let public_id = Uuid::new_v4();

    let row = sqlx::query_as::<_, SyncRunRow>(
        "INSERT INTO sync_runs (public_id, trigger_source, status, forced) \
         VALUES ($1, $2, 'queued', $3) \
         RETURNING id, public_id, trigger_source, status, forced, \
                   started_at, completed_at, products_processed, products_failed, \
                   error_message, created_at",
    )
    .bind(public_id)
    .bind(trigger_source)
    .bind(forced)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Marks a run as `running` and sets `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `queued`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn start_sync_run(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'running', started_at = NOW() \
         WHERE id = $1 AND status = 'queued'",
    )
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "queued",
        });
    }

    Ok(())
}

/// Marks a run as `succeeded`, sets `completed_at = NOW()` and the product
/// counters.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    products_processed: i32,
    products_failed: i32,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'succeeded', completed_at = NOW(), \
             products_processed = $1, products_failed = $2 \
         WHERE id = $3 AND status = 'running'",
    )
    .bind(products_processed)
    .bind(products_failed)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not `running`,
/// or [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by its internal `id`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row exists with the given `id`, or
/// [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_run(pool: &PgPool, id: i64) -> Result<SyncRunRow, DbError> {
    let row = sqlx::query_as::<_, SyncRunRow>(
        "SELECT id, public_id, trigger_source, status, forced, \
                started_at, completed_at, products_processed, products_failed, \
                error_message, created_at \
         FROM sync_runs \
         WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Returns the most recent `limit` runs, ordered by `created_at DESC`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunRow>(
        "SELECT id, public_id, trigger_source, status, forced, \
                started_at, completed_at, products_processed, products_failed, \
                error_message, created_at \
         FROM sync_runs \
         ORDER BY created_at DESC, id DESC \
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ---------------------------------------------------------------------------
// sync_run_products operations
// ---------------------------------------------------------------------------

/// Inserts or updates the per-product result row for a sync run.
///
/// Conflicts on `(sync_run_id, product_code)` update `status`,
/// `pickup_count`, and `error_message` in place, so retrying a product
/// within a run rewrites its outcome instead of duplicating it.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_sync_run_product(
    pool: &PgPool,
    run_id: i64,
    product_code: &str,
    status: &str,
    pickup_count: Option<i32>,
    error_message: Option<&str>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_run_products \
             (sync_run_id, product_code, status, pickup_count, error_message) \
         VALUES ($1, $2, $3, COALESCE($4, 0), $5) \
         ON CONFLICT (sync_run_id, product_code) DO UPDATE SET \
             status        = EXCLUDED.status, \
             pickup_count  = EXCLUDED.pickup_count, \
             error_message = EXCLUDED.error_message",
    )
    .bind(run_id)
    .bind(product_code)
    .bind(status)
    .bind(pickup_count)
    .bind(error_message)
    .execute(pool)
    .await?;

    Ok(())
}

/// Returns all product-level result rows for a given sync run.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_sync_run_products(
    pool: &PgPool,
    run_id: i64,
) -> Result<Vec<SyncRunProductRow>, DbError> {
    let rows = sqlx::query_as::<_, SyncRunProductRow>(
        "SELECT id, sync_run_id, product_code, status, pickup_count, \
                error_message, created_at \
         FROM sync_run_products \
         WHERE sync_run_id = $1 \
         ORDER BY product_code",
    )
    .bind(run_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
