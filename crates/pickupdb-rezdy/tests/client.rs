//! Integration tests for `RezdyClient` using wiremock HTTP mocks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pickupdb_rezdy::{RateGate, RezdyClient, RezdyError};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(base_url: &str, gate: Arc<RateGate>, max_retries: u32) -> RezdyClient {
    RezdyClient::with_base_url(
        "test-key",
        5,
        "pickupdb-test/0.1",
        gate,
        max_retries,
        0,
        base_url,
    )
    .expect("client construction should not fail")
}

fn ungated(base_url: &str, max_retries: u32) -> RezdyClient {
    test_client(base_url, Arc::new(RateGate::from_millis(0)), max_retries)
}

#[tokio::test]
async fn get_pickups_returns_normalized_locations() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "requestStatus": { "success": true },
        "pickupLocations": [
            {
                "locationName": "Anzac Square",
                "pickupId": "bne-anzac-square",
                "address": "228 Adelaide St, Brisbane City",
                "minutesPrior": 15
            },
            {
                "locationName": "King George Square",
                "pickupId": "bne-king-george-square"
            }
        ]
    });

    Mock::given(method("GET"))
        .and(path("/products/PBNE01/pickups"))
        .and(query_param("apiKey", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 0);
    let pickups = client
        .get_pickups("PBNE01")
        .await
        .expect("should parse pickups");

    assert_eq!(pickups.len(), 2);
    assert_eq!(pickups[0].name, "Anzac Square");
    assert_eq!(pickups[0].pickup_id, "bne-anzac-square");
    assert_eq!(pickups[0].minutes_prior, 15);
    assert_eq!(pickups[1].pickup_id, "bne-king-george-square");
    assert_eq!(pickups[1].minutes_prior, 0);
}

#[tokio::test]
async fn not_found_is_a_confirmed_empty_list() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/products/PNONE/pickups"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 3);
    let pickups = client
        .get_pickups("PNONE")
        .await
        .expect("404 must be a valid empty state");

    assert!(pickups.is_empty());
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "404 must not be retried");
}

#[tokio::test]
async fn envelope_failure_returns_api_error() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "requestStatus": {
            "success": false,
            "error": { "errorCode": "10", "errorMessage": "API key not valid" }
        }
    });

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 3);
    let err = client.get_pickups("PBNE01").await.unwrap_err();

    assert!(matches!(err, RezdyError::Api(_)));
    assert!(
        err.to_string().contains("API key not valid"),
        "expected envelope message in error, got: {err}"
    );
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1, "envelope errors must not be retried");
}

#[tokio::test]
async fn retries_server_error_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let body = serde_json::json!({
        "requestStatus": { "success": true },
        "pickupLocations": [
            { "locationName": "Gallery Walk", "pickupId": "tam-gallery-walk" }
        ]
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 2);
    let pickups = client
        .get_pickups("PTAM01")
        .await
        .expect("should succeed after retry");

    assert_eq!(pickups.len(), 1);
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2, "one failure plus one success");
}

#[tokio::test]
async fn rate_limit_surfaces_after_exhausting_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 1);
    let err = client.get_pickups("PBNE01").await.unwrap_err();

    assert!(matches!(
        err,
        RezdyError::RateLimited {
            retry_after_secs: 0
        }
    ));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2, "initial attempt plus one retry");
}

#[tokio::test]
async fn malformed_body_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 3);
    let err = client.get_pickups("PBNE01").await.unwrap_err();

    assert!(matches!(err, RezdyError::Deserialize { .. }));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn client_error_status_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = ungated(&server.uri(), 3);
    let err = client.get_pickups("PBNE01").await.unwrap_err();

    assert!(matches!(
        err,
        RezdyError::UnexpectedStatus { status: 403, .. }
    ));
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
}

#[tokio::test]
async fn back_to_back_fetches_are_paced_by_the_gate() {
    let server = MockServer::start().await;

    let body = serde_json::json!({
        "requestStatus": { "success": true },
        "pickupLocations": []
    });
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let gate = Arc::new(RateGate::from_millis(50));
    let client = test_client(&server.uri(), gate, 0);

    let start = Instant::now();
    client.get_pickups("P1").await.unwrap();
    client.get_pickups("P2").await.unwrap();
    client.get_pickups("P3").await.unwrap();

    // Three gated requests need at least two full intervals.
    assert!(
        start.elapsed() >= Duration::from_millis(100),
        "three fetches completed in {:?}",
        start.elapsed()
    );
}
