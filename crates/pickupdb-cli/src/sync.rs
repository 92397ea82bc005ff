//! Bulk sync command handler.
//!
//! Plans the run without touching the network, asks for confirmation, then
//! fetches sequentially through the rate gate. Per-product failures are
//! recorded to `sync_run_products` and the run continues; Ctrl-C is checked
//! between products so an interrupted run leaves valid partial state and the
//! next run picks up whatever is still stale.

use std::io::Write as _;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use pickupdb_core::FreshnessPolicy;
use pickupdb_db::PickupStore;
use pickupdb_engine::{build_sync_plan, resolve_code_universe, sync_product, SyncPlan};
use pickupdb_rezdy::{RateGate, RezdyClient};

use crate::fail_run_best_effort;

/// Refresh cached pickup records from the booking platform.
///
/// Considers the catalog snapshot (or, without one, the cached key set),
/// skips products with fresh records unless `force` is set, and fetches the
/// rest one at a time. `dry_run` prints the plan and returns before any
/// confirmation, network call, or database write.
///
/// # Errors
///
/// Returns an error if the product-code filter matches nothing, the API key
/// is missing, the run rows cannot be created, or every planned product
/// fails. Individual fetch failures are logged and recorded, not propagated.
pub(crate) async fn run_sync(
    pool: &sqlx::PgPool,
    config: &pickupdb_core::AppConfig,
    force: bool,
    product_code: Option<&str>,
    dry_run: bool,
    assume_yes: bool,
) -> anyhow::Result<()> {
    let store = PickupStore::new(pool.clone());

    let catalog = match pickupdb_core::load_catalog(&config.catalog_path) {
        Ok(catalog) => Some(catalog),
        Err(err) => {
            tracing::warn!(
                path = %config.catalog_path.display(),
                error = %err,
                "catalog snapshot unavailable"
            );
            None
        }
    };
    let universe =
        resolve_code_universe(&store, catalog.as_ref().map(|c| c.products.as_slice())).await;

    let universe = match product_code {
        Some(code) => {
            if !universe.iter().any(|c| c == code) {
                anyhow::bail!("product '{code}' is not in the catalog or the cache; nothing to sync");
            }
            vec![code.to_string()]
        }
        None => universe,
    };
    if universe.is_empty() {
        println!("no products to consider; add a catalog snapshot or cache some records first");
        return Ok(());
    }

    let policy = FreshnessPolicy::from_secs(config.cache_ttl_secs, config.cache_stale_after_secs);
    let plan = build_sync_plan(&store, &universe, force, &policy).await;

    if plan.to_fetch.is_empty() {
        println!(
            "all {} considered records are fresh; nothing to sync",
            plan.total_considered
        );
        return Ok(());
    }

    // One request per product, paced by the shared gate.
    let estimated = Duration::from_millis(config.rate_min_interval_ms)
        * u32::try_from(plan.to_fetch.len()).unwrap_or(u32::MAX);

    if dry_run {
        print_plan(&plan, estimated);
        return Ok(());
    }

    if !assume_yes {
        let prompt = format!(
            "fetch {} products from the live API (about {:.0}s)?",
            plan.to_fetch.len(),
            estimated.as_secs_f64()
        );
        if !confirm(&prompt)? {
            println!("aborted");
            return Ok(());
        }
    }

    let api_key = config
        .rezdy_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("REZDY_API_KEY is not set; cannot sync from the live API"))?;
    let gate = Arc::new(RateGate::from_millis(config.rate_min_interval_ms));
    let client = RezdyClient::with_base_url(
        api_key,
        config.fetch_timeout_secs,
        &config.fetch_user_agent,
        gate,
        config.fetch_max_retries,
        config.fetch_backoff_base_ms,
        &config.rezdy_base_url,
    )?;

    run_plan(pool, &store, &client, &plan, force).await
}

/// Execute a non-empty plan under a tracked sync run.
async fn run_plan(
    pool: &sqlx::PgPool,
    store: &PickupStore,
    client: &RezdyClient,
    plan: &SyncPlan,
    force: bool,
) -> anyhow::Result<()> {
    let run = pickupdb_db::create_sync_run(pool, "cli", force).await?;
    if let Err(e) = pickupdb_db::start_sync_run(pool, run.id).await {
        fail_run_best_effort(pool, run.id, "sync", format!("{e:#}")).await;
        return Err(e.into());
    }

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            flag.store(true, Ordering::SeqCst);
        }
    });

    let started = Instant::now();
    let mut processed: i32 = 0;
    let mut failed: i32 = 0;
    let mut with_pickups: i32 = 0;

    for code in &plan.to_fetch {
        if interrupted.load(Ordering::SeqCst) {
            let message = format!(
                "interrupted after {} of {} products",
                processed + failed,
                plan.to_fetch.len()
            );
            fail_run_best_effort(pool, run.id, "sync", message.clone()).await;
            println!("{message}; completed writes are kept and the next run resumes");
            anyhow::bail!("sync interrupted");
        }

        match sync_product(store, client, code).await {
            Ok(count) => {
                processed = processed.saturating_add(1);
                if count > 0 {
                    with_pickups = with_pickups.saturating_add(1);
                }
                let pickup_count = i32::try_from(count).unwrap_or(i32::MAX);
                record_product_result(pool, run.id, code, "succeeded", Some(pickup_count), None)
                    .await;
            }
            Err(e) => {
                failed = failed.saturating_add(1);
                tracing::error!(product_code = %code, error = %e, "sync failed for product");
                let message = e.to_string();
                record_product_result(pool, run.id, code, "failed", None, Some(&message)).await;
            }
        }
    }

    if failed > 0 {
        tracing::warn!(failed, total = plan.to_fetch.len(), "some products failed during sync");
    }

    if processed == 0 {
        let message = format!("all {failed} products failed to sync");
        fail_run_best_effort(pool, run.id, "sync", message.clone()).await;
        anyhow::bail!("{message}");
    }

    if let Err(err) = pickupdb_db::complete_sync_run(pool, run.id, processed, failed).await {
        let message = format!("{err:#}");
        fail_run_best_effort(pool, run.id, "sync", message).await;
        return Err(err.into());
    }

    println!(
        "synced {processed} products ({failed} failed, {with_pickups} with pickups) in {:.1}s; skipped {} fresh",
        started.elapsed().as_secs_f64(),
        plan.skipped_fresh
    );
    Ok(())
}

/// Record one per-product outcome; a rejected bookkeeping write is logged,
/// never fatal to the run.
async fn record_product_result(
    pool: &sqlx::PgPool,
    run_id: i64,
    product_code: &str,
    status: &str,
    pickup_count: Option<i32>,
    error_message: Option<&str>,
) {
    if let Err(e) = pickupdb_db::upsert_sync_run_product(
        pool,
        run_id,
        product_code,
        status,
        pickup_count,
        error_message,
    )
    .await
    {
        tracing::warn!(product_code, error = %e, "failed to record per-product sync result");
    }
}

fn print_plan(plan: &SyncPlan, estimated: Duration) {
    println!(
        "dry-run: would fetch {} of {} products ({} fresh, skipped), about {:.0}s at the configured pace",
        plan.to_fetch.len(),
        plan.total_considered,
        plan.skipped_fresh,
        estimated.as_secs_f64()
    );
    for code in &plan.to_fetch {
        println!("  {code}");
    }
}

/// Ask a y/N question on stdout and read the answer from stdin.
fn confirm(prompt: &str) -> anyhow::Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
