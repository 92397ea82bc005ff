//! Cache inspection and invalidation command handlers.

use clap::Subcommand;

use pickupdb_db::PickupStore;

/// Sub-commands available under `cache`.
#[derive(Debug, Subcommand)]
pub enum CacheCommands {
    /// Show record counts by provenance and freshness
    Stats,
    /// Remove cached records; the next resolution repopulates lazily
    Clear {
        /// Remove a single product's record instead of all of them
        #[arg(long)]
        product_code: Option<String>,
    },
}

/// Dispatch a `cache` sub-command.
///
/// # Errors
///
/// Returns an error if the underlying database query fails.
pub(crate) async fn run_cache(
    pool: &sqlx::PgPool,
    config: &pickupdb_core::AppConfig,
    command: &CacheCommands,
) -> anyhow::Result<()> {
    match command {
        CacheCommands::Stats => run_cache_stats(pool, config).await,
        CacheCommands::Clear { product_code } => {
            run_cache_clear(pool, product_code.as_deref()).await
        }
    }
}

/// Print record totals, provenance split, and freshness split.
async fn run_cache_stats(
    pool: &sqlx::PgPool,
    config: &pickupdb_core::AppConfig,
) -> anyhow::Result<()> {
    let store = PickupStore::new(pool.clone());
    let total = store.count().await?;
    let sources = store.source_counts().await?;
    let freshness = store
        .freshness_counts(config.cache_ttl_secs, config.cache_stale_after_secs)
        .await?;

    println!("cached records: {total}");
    println!();
    println!("by source:");
    if sources.is_empty() {
        println!("  (none)");
    }
    for (source, count) in &sources {
        println!("  {source:<10} {count}");
    }
    println!();
    println!(
        "by freshness (ttl {}s, stale after {}s):",
        config.cache_ttl_secs, config.cache_stale_after_secs
    );
    println!("  {:<10} {}", "fresh", freshness.fresh);
    println!("  {:<10} {}", "stale", freshness.stale);
    println!("  {:<10} {}", "expired", freshness.expired);
    Ok(())
}

/// Remove one record, or every record when no product code is given.
async fn run_cache_clear(pool: &sqlx::PgPool, product_code: Option<&str>) -> anyhow::Result<()> {
    let store = PickupStore::new(pool.clone());
    let removed = store.invalidate(product_code).await?;
    match product_code {
        Some(code) => println!("removed {removed} cached record(s) for {code}"),
        None => println!("removed {removed} cached record(s)"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "cache_test.rs"]
mod tests;
