mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use pickupdb_core::AppConfig;
use pickupdb_db::PickupStore;
use pickupdb_engine::{Analytics, FilterConfig, PickupFilter};
use pickupdb_rezdy::{RateGate, RezdyClient};

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(pickupdb_core::load_app_config_from_env()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pickupdb_db::PoolConfig::from_app_config(&config);
    let pool = pickupdb_db::connect_pool(&config.database_url, pool_config).await?;
    pickupdb_db::run_migrations(&pool).await?;

    let catalog = load_catalog_snapshot(&config);

    // One client per process; every fetch, scheduled or interactive, paces
    // through the same gate.
    let client = build_client(&config)?;
    let filter = Arc::new(PickupFilter::new(
        PickupStore::new(pool.clone()),
        client.clone(),
        FilterConfig::from_app_config(&config),
        Arc::new(Analytics::new(config.analytics_capacity)),
    ));

    let _scheduler =
        scheduler::build_scheduler(pool.clone(), client, Arc::clone(&config)).await?;

    let auth = AuthState::from_env(matches!(config.env, pickupdb_core::Environment::Development))?;
    let state = AppState {
        pool,
        filter,
        catalog: Arc::new(catalog),
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Catalog snapshot for the filter surface. A missing or invalid file is
/// not fatal; the filter then serves an empty product set until restart.
fn load_catalog_snapshot(config: &AppConfig) -> Vec<pickupdb_core::CatalogProduct> {
    match pickupdb_core::load_catalog(&config.catalog_path) {
        Ok(catalog) => {
            tracing::info!(
                path = %config.catalog_path.display(),
                products = catalog.products.len(),
                "catalog snapshot loaded"
            );
            catalog.products
        }
        Err(err) => {
            tracing::warn!(
                path = %config.catalog_path.display(),
                error = %err,
                "catalog snapshot unavailable; filter surface starts empty"
            );
            Vec::new()
        }
    }
}

/// Upstream client, or `None` when no API key is configured. Without a key
/// the server serves cached and heuristic data only.
fn build_client(config: &AppConfig) -> anyhow::Result<Option<Arc<RezdyClient>>> {
    let Some(api_key) = config.rezdy_api_key.as_deref() else {
        tracing::warn!("REZDY_API_KEY not set; serving cached and heuristic data only");
        return Ok(None);
    };

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
    Ok(Some(Arc::new(client)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
