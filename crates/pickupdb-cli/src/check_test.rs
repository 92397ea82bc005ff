use super::*;

use chrono::Utc;
use pickupdb_core::{AppConfig, Environment, PickupLocation, PickupSource, ProductPickupRecord};

/// Config pointing at the workspace catalog snapshot, with no API key so the
/// check could not fetch even if it tried.
fn catalog_config() -> AppConfig {
    AppConfig {
        database_url: String::new(),
        env: Environment::Test,
        bind_addr: "0.0.0.0:3000".parse().unwrap(),
        log_level: "info".to_string(),
        catalog_path: std::path::PathBuf::from("../../config/catalog.yaml"),
        rezdy_api_key: None,
        rezdy_base_url: "https://api.rezdy.com/v1".to_string(),
        db_max_connections: 10,
        db_min_connections: 1,
        db_acquire_timeout_secs: 10,
        fetch_timeout_secs: 5,
        fetch_user_agent: "pickupdb-test/0.1".to_string(),
        fetch_max_retries: 0,
        fetch_backoff_base_ms: 0,
        rate_min_interval_ms: 0,
        cache_ttl_secs: 900,
        cache_stale_after_secs: 604_800,
        analytics_capacity: 100,
        filter_max_concurrency: 4,
        memo_ttl_secs: 60,
    }
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_store_is_consistent_across_all_regions(pool: sqlx::PgPool) {
    let config = catalog_config();

    let result = run_check(&pool, &config, None).await;

    assert!(
        result.is_ok(),
        "keyword-only snapshot should be consistent, got: {result:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn structured_record_keeps_both_paths_aligned(pool: sqlx::PgPool) {
    let config = catalog_config();
    let catalog = pickupdb_core::load_catalog(&config.catalog_path).expect("catalog should load");
    let code = catalog.products[0].code.clone();

    let record = ProductPickupRecord::new(
        code,
        vec![PickupLocation {
            name: "Anzac Square".to_string(),
            pickup_id: "bne-anzac-square".to_string(),
            address: None,
            latitude: None,
            longitude: None,
            minutes_prior: 0,
            instructions: None,
        }],
        PickupSource::Api,
        Utc::now(),
    );
    PickupStore::new(pool.clone())
        .put(&record)
        .await
        .expect("seeding the record failed");

    let result = run_check(&pool, &config, None).await;

    assert!(
        result.is_ok(),
        "structured data should agree on both paths, got: {result:?}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn single_region_query_is_accepted(pool: sqlx::PgPool) {
    let config = catalog_config();

    let result = run_check(&pool, &config, Some("brisbane")).await;

    assert!(result.is_ok(), "single-region check failed: {result:?}");
}

#[sqlx::test(migrations = "../../migrations")]
async fn missing_catalog_is_an_error(pool: sqlx::PgPool) {
    let mut config = catalog_config();
    config.catalog_path = std::path::PathBuf::from("no-such-catalog.yaml");

    let result = run_check(&pool, &config, None).await;

    let err = result.expect_err("expected Err without a catalog snapshot");
    assert!(
        format!("{err}").contains("catalog"),
        "error should mention the catalog, got: {err}"
    );
}
