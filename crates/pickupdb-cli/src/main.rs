mod cache;
mod catalog;
mod check;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pickupdb-cli")]
#[command(about = "Pickup-region cache and sync command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Refresh cached pickup records from the booking platform
    Sync {
        /// Refetch every product, ignoring record freshness
        #[arg(long)]
        force: bool,

        /// Restrict the run to a single product code
        #[arg(long)]
        product_code: Option<String>,

        /// Print the plan without fetching or writing anything
        #[arg(long)]
        dry_run: bool,

        /// Skip the interactive confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Compare the two filter paths and report any drift
    Check {
        /// Check a single region query instead of every canonical region
        #[arg(long)]
        region: Option<String>,
    },
    /// Inspect or clear the pickup record cache
    Cache {
        #[command(subcommand)]
        command: cache::CacheCommands,
    },
    /// Work with the product catalog snapshot
    Catalog {
        #[command(subcommand)]
        command: catalog::CatalogCommands,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pickupdb_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    // `catalog` only touches the snapshot file; everything else needs the pool.
    if let Commands::Catalog { command } = &cli.command {
        return catalog::run_catalog(&config, command);
    }

    let pool_config = pickupdb_db::PoolConfig::from_app_config(&config);
    let pool = pickupdb_db::connect_pool(&config.database_url, pool_config).await?;
    pickupdb_db::run_migrations(&pool).await?;

    match cli.command {
        Commands::Sync {
            force,
            product_code,
            dry_run,
            yes,
        } => sync::run_sync(&pool, &config, force, product_code.as_deref(), dry_run, yes).await,
        Commands::Check { region } => check::run_check(&pool, &config, region.as_deref()).await,
        Commands::Cache { command } => cache::run_cache(&pool, &config, &command).await,
        Commands::Catalog { .. } => unreachable!("handled before pool setup"),
    }
}

/// Attempt to mark a sync run as failed, logging any secondary error.
pub(crate) async fn fail_run_best_effort(
    pool: &sqlx::PgPool,
    run_id: i64,
    context: &'static str,
    message: String,
) {
    if let Err(mark_err) = pickupdb_db::fail_sync_run(pool, run_id, &message).await {
        tracing::error!(run_id, error = %mark_err, "failed to mark {context} run as failed");
    }
}

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
