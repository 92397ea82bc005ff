//! HTTP client for the booking platform's per-product pickups endpoint.
//!
//! Wraps `reqwest` with API key management, typed error handling, envelope
//! checking, and bounded retry. Every request first acquires the shared
//! [`RateGate`], so however many logical callers are active, outbound traffic
//! is one paced stream.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};

use pickupdb_core::PickupLocation;

use crate::error::RezdyError;
use crate::gate::RateGate;
use crate::normalize::normalize_locations;
use crate::retry::retry_with_backoff;
use crate::types::PickupsResponse;

pub const DEFAULT_BASE_URL: &str = "https://api.rezdy.com/v1";

/// Client for the per-product pickups endpoint.
///
/// Use [`RezdyClient::new`] for production or [`RezdyClient::with_base_url`]
/// to point at a mock server in tests.
pub struct RezdyClient {
    client: Client,
    api_key: String,
    base_url: Url,
    gate: Arc<RateGate>,
    /// Maximum number of retry attempts after the first failure.
    max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    backoff_base_ms: u64,
}

impl RezdyClient {
    /// Creates a client pointed at the production API.
    ///
    /// # Errors
    ///
    /// Returns [`RezdyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        gate: Arc<RateGate>,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, RezdyError> {
        Self::with_base_url(
            api_key,
            timeout_secs,
            user_agent,
            gate,
            max_retries,
            backoff_base_ms,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`RezdyError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`RezdyError::Api`] if `base_url` is not a
    /// valid URL base.
    #[allow(clippy::too_many_arguments)]
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        gate: Arc<RateGate>,
        max_retries: u32,
        backoff_base_ms: u64,
        base_url: &str,
    ) -> Result<Self, RezdyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let parsed = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| RezdyError::Api(format!("invalid base URL '{base_url}': {e}")))?;
        if parsed.cannot_be_a_base() {
            return Err(RezdyError::Api(format!(
                "invalid base URL '{base_url}': cannot be a base"
            )));
        }

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url: parsed,
            gate,
            max_retries,
            backoff_base_ms,
        })
    }

    /// The gate this client paces its requests through.
    #[must_use]
    pub fn gate(&self) -> &Arc<RateGate> {
        &self.gate
    }

    /// Fetches the pickup list for one product, normalized into core types.
    ///
    /// HTTP 404 means the platform has no pickup list for this product and is
    /// returned as `Ok(vec![])`: a confirmed empty state, not a failure.
    /// Transient errors (network, 429, 5xx) are retried with back-off; each
    /// attempt acquires the rate gate first.
    ///
    /// # Errors
    ///
    /// - [`RezdyError::Api`] if the response envelope reports failure.
    /// - [`RezdyError::RateLimited`] on 429 after all retries are exhausted.
    /// - [`RezdyError::UnexpectedStatus`] on any other non-2xx status.
    /// - [`RezdyError::Http`] on network failure after all retries.
    /// - [`RezdyError::Deserialize`] if the body does not parse (not retried).
    pub async fn get_pickups(
        &self,
        product_code: &str,
    ) -> Result<Vec<PickupLocation>, RezdyError> {
        let url = self.pickups_url(product_code)?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            let url = url.clone();
            async move { self.fetch_pickups_once(&url, product_code).await }
        })
        .await
    }

    async fn fetch_pickups_once(
        &self,
        url: &Url,
        product_code: &str,
    ) -> Result<Vec<PickupLocation>, RezdyError> {
        self.gate.acquire().await;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            tracing::debug!(product_code, "upstream has no pickup list (404)");
            return Ok(Vec::new());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(RezdyError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(RezdyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: PickupsResponse =
            serde_json::from_str(&body).map_err(|e| RezdyError::Deserialize {
                context: format!("pickups for {product_code}"),
                source: e,
            })?;

        if !parsed.request_status.success {
            return Err(RezdyError::Api(parsed.request_status.describe_error()));
        }

        Ok(normalize_locations(product_code, parsed.pickup_locations))
    }

    /// Builds `{base}/products/{code}/pickups?apiKey=...` with percent-encoded
    /// path segments.
    fn pickups_url(&self, product_code: &str) -> Result<Url, RezdyError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| {
                RezdyError::Api(format!("base URL '{}' cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(["products", product_code, "pickups"]);
        url.query_pairs_mut().append_pair("apiKey", &self.api_key);
        Ok(url)
    }
}
