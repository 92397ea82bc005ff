use super::*;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pickupdb_core::{AppConfig, Environment, PickupSource, ProductPickupRecord};

/// Config pointing the sync at a mock server, with pacing and retries
/// zeroed so tests run fast.
fn test_config(base_url: &str, catalog_path: &str) -> AppConfig {
    AppConfig {
        database_url: String::new(),
        env: Environment::Test,
        bind_addr: "0.0.0.0:3000".parse().unwrap(),
        log_level: "info".to_string(),
        catalog_path: std::path::PathBuf::from(catalog_path),
        rezdy_api_key: Some("test-key".to_string()),
        rezdy_base_url: base_url.to_string(),
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

/// Seed a record aged by `age` so the plan classifies it as needed.
async fn seed_record(pool: &sqlx::PgPool, code: &str, age: chrono::Duration) {
    let record = ProductPickupRecord::new(code, Vec::new(), PickupSource::Api, Utc::now() - age);
    PickupStore::new(pool.clone())
        .put(&record)
        .await
        .unwrap_or_else(|e| panic!("seed_record failed for '{code}': {e}"));
}

fn pickups_body(entries: &[(&str, &str)]) -> serde_json::Value {
    let locations: Vec<serde_json::Value> = entries
        .iter()
        .map(|(name, id)| json!({"locationName": name, "pickupId": id}))
        .collect();
    json!({"requestStatus": {"success": true}, "pickupLocations": locations})
}

#[sqlx::test(migrations = "../../migrations")]
async fn dry_run_makes_no_requests_and_writes_no_rows(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_record(&pool, "EXPIRED01", chrono::Duration::days(8)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, None, true, true).await;
    assert!(result.is_ok(), "dry-run should return Ok, got: {result:?}");

    let requests = server.received_requests().await.unwrap_or_default();
    assert!(requests.is_empty(), "dry-run must not touch the network");

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_runs")
        .fetch_one(&pool)
        .await
        .expect("count query failed");
    assert_eq!(runs, 0, "dry-run must not create any sync_runs rows");
}

#[sqlx::test(migrations = "../../migrations")]
async fn syncs_an_expired_record_and_tracks_the_run(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/PTEST01/pickups"))
        .respond_with(ResponseTemplate::new(200).set_body_json(pickups_body(&[
            ("Anzac Square", "bne-anzac-square"),
            ("Roma St Station", "bne-roma-st-station"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    seed_record(&pool, "PTEST01", chrono::Duration::days(8)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, None, false, true).await;
    assert!(result.is_ok(), "sync should succeed, got: {result:?}");

    let run: (String, i32, i32, bool) = sqlx::query_as(
        "SELECT status, products_processed, products_failed, forced FROM sync_runs",
    )
    .fetch_one(&pool)
    .await
    .expect("expected exactly one sync run");
    assert_eq!(run.0, "succeeded");
    assert_eq!(run.1, 1, "one product processed");
    assert_eq!(run.2, 0, "no failures");
    assert!(!run.3, "run was not forced");

    let product: (String, i32) = sqlx::query_as(
        "SELECT status, pickup_count FROM sync_run_products WHERE product_code = 'PTEST01'",
    )
    .fetch_one(&pool)
    .await
    .expect("expected a per-product row");
    assert_eq!(product.0, "succeeded");
    assert_eq!(product.1, 2);

    let record = PickupStore::new(pool.clone())
        .get("PTEST01")
        .await
        .expect("store read failed")
        .expect("record should exist after sync");
    assert_eq!(record.pickups.len(), 2);
}

#[sqlx::test(migrations = "../../migrations")]
async fn records_per_product_failures_and_continues(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/DOWN01/pickups"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/products/UP02/pickups"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(pickups_body(&[("Cavill Ave", "gc-cavill-ave")])),
        )
        .mount(&server)
        .await;

    seed_record(&pool, "DOWN01", chrono::Duration::days(8)).await;
    seed_record(&pool, "UP02", chrono::Duration::days(8)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, None, false, true).await;
    assert!(
        result.is_ok(),
        "partial failure should not abort the run, got: {result:?}"
    );

    let run: (String, i32, i32) =
        sqlx::query_as("SELECT status, products_processed, products_failed FROM sync_runs")
            .fetch_one(&pool)
            .await
            .expect("expected exactly one sync run");
    assert_eq!(run.0, "succeeded");
    assert_eq!(run.1, 1);
    assert_eq!(run.2, 1);

    let failed: (String, Option<String>) = sqlx::query_as(
        "SELECT status, error_message FROM sync_run_products WHERE product_code = 'DOWN01'",
    )
    .fetch_one(&pool)
    .await
    .expect("expected a row for the failed product");
    assert_eq!(failed.0, "failed");
    assert!(failed.1.is_some(), "failure should carry an error message");
}

#[sqlx::test(migrations = "../../migrations")]
async fn all_products_failing_fails_the_run(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/DOWN01/pickups"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    seed_record(&pool, "DOWN01", chrono::Duration::days(8)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, None, false, true).await;
    let err = result.expect_err("expected Err when every product fails");
    assert!(
        format!("{err}").contains("failed"),
        "error should mention the failure, got: {err}"
    );

    let run: (String, Option<String>) =
        sqlx::query_as("SELECT status, error_message FROM sync_runs")
            .fetch_one(&pool)
            .await
            .expect("expected exactly one sync run");
    assert_eq!(run.0, "failed");
    assert!(run.1.is_some(), "failed run should carry an error message");
}

#[sqlx::test(migrations = "../../migrations")]
async fn all_fresh_records_skip_run_creation(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    seed_record(&pool, "FRESH01", chrono::Duration::minutes(1)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, None, false, true).await;
    assert!(result.is_ok(), "nothing to sync should be Ok, got: {result:?}");

    let runs: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sync_runs")
        .fetch_one(&pool)
        .await
        .expect("count query failed");
    assert_eq!(runs, 0, "an empty plan must not create a run");
}

#[sqlx::test(migrations = "../../migrations")]
async fn unknown_product_code_filter_is_an_error(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, false, Some("NOPE"), false, true).await;

    let err = result.expect_err("expected Err for an unknown product code");
    assert!(
        format!("{err}").contains("not in the catalog"),
        "error should name the missing product, got: {err}"
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn force_refetches_a_fresh_record(pool: sqlx::PgPool) {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/products/FRESH01/pickups"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(pickups_body(&[("Anzac Square", "bne-anzac-square")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    seed_record(&pool, "FRESH01", chrono::Duration::minutes(1)).await;
    let config = test_config(&server.uri(), "no-such-catalog.yaml");

    let result = run_sync(&pool, &config, true, None, false, true).await;
    assert!(result.is_ok(), "forced sync should succeed, got: {result:?}");

    let forced: bool = sqlx::query_scalar("SELECT forced FROM sync_runs")
        .fetch_one(&pool)
        .await
        .expect("expected exactly one sync run");
    assert!(forced, "run row should record that it was forced");

    let record = PickupStore::new(pool.clone())
        .get("FRESH01")
        .await
        .expect("store read failed")
        .expect("record should still exist");
    assert_eq!(record.pickups.len(), 1, "forced fetch replaced the record");
}
