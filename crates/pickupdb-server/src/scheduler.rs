//! Background jobs: scheduled refresh of aged pickup records.

use std::sync::Arc;

use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use pickupdb_core::{AppConfig, FreshnessPolicy};
use pickupdb_db::PickupStore;
use pickupdb_rezdy::RezdyClient;

/// Builds and starts the job scheduler. The returned handle must stay alive
/// for jobs to keep firing.
pub async fn build_scheduler(
    pool: PgPool,
    client: Option<Arc<RezdyClient>>,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;
    register_stale_refresh_job(&scheduler, pool, client, config).await?;
    scheduler.start().await?;
    Ok(scheduler)
}

/// Registers the hourly refresh of records that have aged past the TTL.
///
/// Fires at ten past every hour. Without an upstream client the job logs
/// and skips; cached records then age in place until a key is configured.
async fn register_stale_refresh_job(
    scheduler: &JobScheduler,
    pool: PgPool,
    client: Option<Arc<RezdyClient>>,
    config: Arc<AppConfig>,
) -> Result<(), JobSchedulerError> {
    let job = Job::new_async("0 10 * * * *", move |_uuid, _lock| {
        let pool = pool.clone();
        let client = client.clone();
        let config = Arc::clone(&config);

        Box::pin(async move {
            let Some(client) = client else {
                tracing::info!("stale refresh skipped; no upstream client is configured");
                return;
            };

            tracing::info!("stale refresh starting");
            run_stale_refresh(&pool, &client, &config).await;
        })
    })?;

    scheduler.add(job).await?;
    Ok(())
}

/// One refresh pass: plan over the catalog (or cached codes), refetch what
/// the plan selected, and record the outcome as a sync run. Failures are
/// logged, never raised; the next firing retries.
async fn run_stale_refresh(pool: &PgPool, client: &RezdyClient, config: &AppConfig) {
    let store = PickupStore::new(pool.clone());

    let catalog = match pickupdb_core::load_catalog(&config.catalog_path) {
        Ok(catalog) => Some(catalog.products),
        Err(err) => {
            tracing::warn!(error = %err, "catalog snapshot unavailable; planning from cached codes");
            None
        }
    };

    let universe = pickupdb_engine::resolve_code_universe(&store, catalog.as_deref()).await;
    if universe.is_empty() {
        tracing::info!("stale refresh found nothing to consider");
        return;
    }

    let policy = FreshnessPolicy::from_secs(config.cache_ttl_secs, config.cache_stale_after_secs);
    let plan = pickupdb_engine::build_sync_plan(&store, &universe, false, &policy).await;
    if plan.to_fetch.is_empty() {
        tracing::info!(
            considered = plan.total_considered,
            "stale refresh: every record is fresh"
        );
        return;
    }

    let run = match pickupdb_db::create_sync_run(pool, "scheduler", false).await {
        Ok(run) => run,
        Err(err) => {
            tracing::error!(error = %err, "stale refresh could not create its sync run");
            return;
        }
    };
    if let Err(err) = pickupdb_db::start_sync_run(pool, run.id).await {
        tracing::error!(run_id = run.id, error = %err, "stale refresh could not start its sync run");
        return;
    }

    let mut processed: i32 = 0;
    let mut failed: i32 = 0;

    for code in &plan.to_fetch {
        match pickupdb_engine::sync_product(&store, client, code).await {
            Ok(count) => {
                processed = processed.saturating_add(1);
                let pickup_count = i32::try_from(count).unwrap_or(i32::MAX);
                record_product_outcome(pool, run.id, code, "succeeded", Some(pickup_count), None)
                    .await;
            }
            Err(err) => {
                failed = failed.saturating_add(1);
                tracing::warn!(product_code = %code, error = %err, "stale refresh failed for product");
                record_product_outcome(pool, run.id, code, "failed", None, Some(&err.to_string()))
                    .await;
            }
        }
    }

    if processed == 0 && failed > 0 {
        let message = format!("all {failed} products failed to refresh");
        if let Err(err) = pickupdb_db::fail_sync_run(pool, run.id, &message).await {
            tracing::error!(run_id = run.id, error = %err, "stale refresh could not mark its run failed");
        }
    } else if let Err(err) = pickupdb_db::complete_sync_run(pool, run.id, processed, failed).await {
        tracing::error!(run_id = run.id, error = %err, "stale refresh could not complete its run");
    }

    tracing::info!(
        processed,
        failed,
        skipped_fresh = plan.skipped_fresh,
        "stale refresh finished"
    );
}

async fn record_product_outcome(
    pool: &PgPool,
    run_id: i64,
    code: &str,
    status: &str,
    pickup_count: Option<i32>,
    error_message: Option<&str>,
) {
    if let Err(err) = pickupdb_db::upsert_sync_run_product(
        pool,
        run_id,
        code,
        status,
        pickup_count,
        error_message,
    )
    .await
    {
        tracing::warn!(run_id, product_code = %code, error = %err, "could not record product outcome");
    }
}
