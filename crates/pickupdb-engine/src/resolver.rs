//! Region resolution and product filtering.
//!
//! [`PickupFilter::resolve`] answers "which regions does this product pick up
//! in, and how do we know" for one product:
//!
//! 1. Check the in-process memo; a valid entry is returned as-is.
//! 2. Check the record store. Fresh and stale records are served (stale ones
//!    are flagged for refresh via analytics metadata); expired records force
//!    a refetch unless the filter is offline or has no client.
//! 3. On a miss or expiry, fetch through the rate-gated client, persist the
//!    result, and classify it.
//! 4. If the fetch fails, degrade: serve the expired record if one exists,
//!    otherwise fall back to keyword matching and persist a heuristic
//!    stopgap so the next pass does not repeat the doomed fetch.
//!
//! Structured pickup data always outranks keyword matching: the keyword
//! table is consulted only when a record carries no structured pickups.
//! Resolution never returns an error; every failure path degrades to a
//! less precise answer and is logged.

use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::{stream, StreamExt};
use serde::Serialize;
use serde_json::json;

use pickupdb_core::{
    match_regions, normalize_region, AppConfig, CatalogProduct, Freshness, FreshnessPolicy,
    PickupLocation, PickupSource, ProductPickupRecord, Region, RegionRegistry,
};
use pickupdb_db::LocationHit;
use pickupdb_rezdy::RezdyClient;

use crate::analytics::{Analytics, EventType};
use crate::memo::MemoCache;
use crate::store::RecordStore;
use crate::EngineError;

/// Tuning knobs for [`PickupFilter`].
#[derive(Debug, Clone)]
pub struct FilterConfig {
    pub freshness: FreshnessPolicy,
    /// When set, the filter never touches the network: misses resolve
    /// heuristically and expired records are served as-is.
    pub offline: bool,
    /// How long a memoized resolution stays valid.
    pub memo_ttl: Duration,
    /// Upper bound on concurrently resolving products in a filter pass.
    pub max_concurrency: usize,
}

impl FilterConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            freshness: FreshnessPolicy::from_secs(
                config.cache_ttl_secs,
                config.cache_stale_after_secs,
            ),
            offline: false,
            memo_ttl: Duration::seconds(i64::try_from(config.memo_ttl_secs).unwrap_or(i64::MAX)),
            max_concurrency: config.filter_max_concurrency.max(1),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            freshness: FreshnessPolicy::default(),
            offline: false,
            memo_ttl: Duration::seconds(60),
            max_concurrency: 4,
        }
    }
}

/// How one product was classified.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub product_code: String,
    /// Regions the product serves, first-seen order, deduplicated. Empty
    /// means only the `all` wildcard matches it.
    pub regions: Vec<Region>,
    /// `Api` when structured pickups drove the classification, `Heuristic`
    /// when the keyword table did, `None` when neither produced a signal.
    pub provenance: PickupSource,
    /// The keyword phrase that matched, for explainability.
    pub matched_keyword: Option<&'static str>,
    pub pickups: Vec<PickupLocation>,
}

impl Resolution {
    /// Region membership; `all` matches every product.
    #[must_use]
    pub fn matches(&self, region: Region) -> bool {
        region == Region::All || self.regions.contains(&region)
    }
}

/// Counters for one filter pass, over every examined product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub total_products: usize,
    pub filtered_count: usize,
    /// Products whose classification came from structured pickup data.
    pub api_data_used: usize,
    /// Products classified by keyword fallback.
    pub fallback_used: usize,
    pub region: Region,
}

/// Result of [`PickupFilter::filter_products`].
#[derive(Debug, Clone, Serialize)]
pub struct FilterOutcome {
    pub products: Vec<CatalogProduct>,
    pub stats: FilterStats,
}

/// Outcome of a bulk [`PickupFilter::refresh_all`] pass.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub failed: Vec<String>,
}

/// Region filter with store-first, fetch-second, keyword-last resolution.
///
/// Generic over the record store so tests run against
/// [`MemoryStore`](crate::MemoryStore) and production against Postgres.
/// `client` is optional; without one the filter behaves as permanently
/// offline.
pub struct PickupFilter<S> {
    store: S,
    client: Option<Arc<RezdyClient>>,
    registry: RegionRegistry,
    config: FilterConfig,
    analytics: Arc<Analytics>,
    memo: MemoCache<Resolution>,
}

impl<S: RecordStore> PickupFilter<S> {
    #[must_use]
    pub fn new(
        store: S,
        client: Option<Arc<RezdyClient>>,
        config: FilterConfig,
        analytics: Arc<Analytics>,
    ) -> Self {
        let config = FilterConfig {
            max_concurrency: config.max_concurrency.max(1),
            ..config
        };
        Self {
            store,
            client,
            registry: RegionRegistry::new(),
            memo: MemoCache::new(config.memo_ttl),
            config,
            analytics,
        }
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &RegionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    #[must_use]
    pub fn analytics(&self) -> &Arc<Analytics> {
        &self.analytics
    }

    /// Classifies one product into regions with provenance.
    pub async fn resolve(&self, product: &CatalogProduct) -> Resolution {
        let code = product.code.as_str();

        if let Some(memoized) = self.memo.get(code).await {
            self.analytics
                .track(EventType::CacheHit, Some(code), json!({"layer": "memo"}))
                .await;
            return memoized;
        }

        let record = match self.store.get(code).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(
                    product_code = code,
                    error = %err,
                    "store read failed, treating as cache miss"
                );
                None
            }
        };

        let resolution = match record {
            Some(record) => {
                let freshness = record.freshness(&self.config.freshness, Utc::now());
                match (freshness, self.fetch_client()) {
                    (Freshness::Fresh | Freshness::Stale, _) => {
                        self.note_hit(code, freshness).await;
                        self.classify(product, &record)
                    }
                    (Freshness::Expired, Some(client)) => {
                        self.analytics
                            .track(EventType::CacheMiss, Some(code), json!({"freshness": "expired"}))
                            .await;
                        self.fetch_and_classify(client, product, Some(&record)).await
                    }
                    // Offline: an expired record still beats guessing.
                    (Freshness::Expired, None) => {
                        self.note_hit(code, Freshness::Expired).await;
                        self.classify(product, &record)
                    }
                }
            }
            None => {
                self.analytics
                    .track(EventType::CacheMiss, Some(code), json!({}))
                    .await;
                match self.fetch_client() {
                    Some(client) => self.fetch_and_classify(client, product, None).await,
                    None => self.classify_by_keywords(product),
                }
            }
        };

        if resolution.provenance == PickupSource::Heuristic {
            self.analytics
                .track(
                    EventType::HeuristicFallback,
                    Some(code),
                    json!({"keyword": resolution.matched_keyword}),
                )
                .await;
        }

        self.memo.insert(code, resolution.clone()).await;
        resolution
    }

    /// Filters `products` down to the ones serving the queried region.
    ///
    /// `region_input` is normalized first, so URL slugs, UI labels, and free
    /// text all land on the same canonical region. A (post-normalization)
    /// `all` query short-circuits: every product passes and nothing is
    /// resolved or fetched. Input order is preserved.
    pub async fn filter_products(
        &self,
        region_input: &str,
        products: &[CatalogProduct],
    ) -> FilterOutcome {
        let region = normalize_region(region_input);
        let total_products = products.len();

        if region == Region::All {
            self.note_filter_pass(region, total_products, total_products)
                .await;
            return FilterOutcome {
                products: products.to_vec(),
                stats: FilterStats {
                    total_products,
                    filtered_count: total_products,
                    api_data_used: 0,
                    fallback_used: 0,
                    region,
                },
            };
        }

        // Materialized eagerly (futures are inert until polled) so the
        // stream holds concrete futures; a closure returning an opaque
        // borrowing future here trips rustc's higher-ranked lifetime check
        // when handlers are verified as `Send`.
        let resolve_futures: Vec<_> = products.iter().map(|product| self.resolve(product)).collect();
        let resolutions: Vec<Resolution> = stream::iter(resolve_futures)
            .buffered(self.config.max_concurrency)
            .collect()
            .await;

        let api_data_used = resolutions
            .iter()
            .filter(|r| r.provenance == PickupSource::Api)
            .count();
        let fallback_used = resolutions
            .iter()
            .filter(|r| r.provenance == PickupSource::Heuristic)
            .count();

        let filtered: Vec<CatalogProduct> = products
            .iter()
            .zip(&resolutions)
            .filter(|(_, resolution)| resolution.matches(region))
            .map(|(product, _)| product.clone())
            .collect();

        self.note_filter_pass(region, total_products, filtered.len())
            .await;

        FilterOutcome {
            stats: FilterStats {
                total_products,
                filtered_count: filtered.len(),
                api_data_used,
                fallback_used,
                region,
            },
            products: filtered,
        }
    }

    /// Forced refetch of one product, bypassing freshness checks.
    ///
    /// # Errors
    ///
    /// [`EngineError::Offline`] without a usable client, otherwise the fetch
    /// or store failure.
    pub async fn refresh(&self, product_code: &str) -> Result<usize, EngineError> {
        let client = self.fetch_client().ok_or(EngineError::Offline)?;
        let count = crate::sync::sync_product(&self.store, client, product_code).await?;
        self.memo.clear(Some(product_code)).await;
        self.analytics
            .track(
                EventType::ApiFetch,
                Some(product_code),
                json!({"count": count, "forced": true}),
            )
            .await;
        Ok(count)
    }

    /// Forced refetch of every code in `product_codes`, sequentially through
    /// the shared rate gate. Per-product failures are logged and collected,
    /// never aborting the pass.
    pub async fn refresh_all(&self, product_codes: &[String]) -> RefreshSummary {
        let mut refreshed = 0;
        let mut failed = Vec::new();
        for code in product_codes {
            match self.refresh(code).await {
                Ok(_) => refreshed += 1,
                Err(err) => {
                    tracing::warn!(product_code = %code, error = %err, "refresh failed");
                    failed.push(code.clone());
                }
            }
        }
        RefreshSummary { refreshed, failed }
    }

    /// Removes one record, or every record when `product_code` is `None`,
    /// from both the store and the memo. Returns how many stored records
    /// were removed.
    ///
    /// # Errors
    ///
    /// Store failures; explicit invalidation does not degrade silently.
    pub async fn clear_cache(&self, product_code: Option<&str>) -> Result<u64, EngineError> {
        let removed = self.store.invalidate(product_code).await?;
        self.memo.clear(product_code).await;
        self.analytics
            .track(
                EventType::CacheInvalidated,
                product_code,
                json!({"removed": removed}),
            )
            .await;
        Ok(removed)
    }

    /// Looks a pickup location up by name across all cached records and
    /// tracks the hit as a selection.
    ///
    /// # Errors
    ///
    /// Store failures.
    pub async fn location_by_name(&self, name: &str) -> Result<Option<LocationHit>, EngineError> {
        let hit = self.store.find_location_by_name(name).await?;
        if let Some(hit) = &hit {
            self.analytics
                .track(
                    EventType::PickupSelected,
                    Some(&hit.product_code),
                    json!({"location": hit.location.name}),
                )
                .await;
        }
        Ok(hit)
    }

    fn fetch_client(&self) -> Option<&RezdyClient> {
        if self.config.offline {
            None
        } else {
            self.client.as_deref()
        }
    }

    async fn note_hit(&self, code: &str, freshness: Freshness) {
        if let Err(err) = self.store.touch(code).await {
            tracing::warn!(product_code = code, error = %err, "failed to record store hit");
        }
        if freshness == Freshness::Stale {
            tracing::debug!(product_code = code, "serving stale record, due for refresh");
        }
        self.analytics
            .track(
                EventType::CacheHit,
                Some(code),
                json!({"layer": "store", "freshness": freshness.as_tag()}),
            )
            .await;
    }

    async fn note_filter_pass(&self, region: Region, total: usize, filtered: usize) {
        self.analytics
            .track(
                EventType::FilterApplied,
                None,
                json!({"region": region.as_slug(), "total": total, "filtered": filtered}),
            )
            .await;
    }

    async fn fetch_and_classify(
        &self,
        client: &RezdyClient,
        product: &CatalogProduct,
        expired: Option<&ProductPickupRecord>,
    ) -> Resolution {
        let code = product.code.as_str();
        match client.get_pickups(code).await {
            Ok(pickups) => {
                self.analytics
                    .track(EventType::ApiFetch, Some(code), json!({"count": pickups.len()}))
                    .await;
                let record =
                    ProductPickupRecord::new(code, pickups, PickupSource::Api, Utc::now());
                self.persist(&record).await;
                self.classify(product, &record)
            }
            Err(err) => {
                tracing::warn!(product_code = code, error = %err, "pickup fetch failed");
                self.analytics
                    .track(EventType::ApiError, Some(code), json!({"error": err.to_string()}))
                    .await;
                if let Some(record) = expired {
                    self.classify(product, record)
                } else {
                    let resolution = self.classify_by_keywords(product);
                    if resolution.provenance == PickupSource::Heuristic {
                        // Stopgap record: remembers the heuristic answer so
                        // the next pass does not repeat the doomed fetch.
                        let record = ProductPickupRecord::new(
                            code,
                            Vec::new(),
                            PickupSource::Heuristic,
                            Utc::now(),
                        );
                        self.persist(&record).await;
                    }
                    resolution
                }
            }
        }
    }

    async fn persist(&self, record: &ProductPickupRecord) {
        if let Err(err) = self.store.put(record).await {
            tracing::warn!(
                product_code = %record.product_code,
                error = %err,
                "failed to persist pickup record"
            );
        }
    }

    /// Classification with the precedence rule: structured pickups win,
    /// keywords only in their true absence. A confirmed-empty API record has
    /// no structured pickups, so it classifies by keywords.
    fn classify(&self, product: &CatalogProduct, record: &ProductPickupRecord) -> Resolution {
        if !record.has_structured_pickups() {
            return self.classify_by_keywords(product);
        }

        let mut regions = Vec::new();
        for pickup_id in record.pickup_ids() {
            if let Some(region) = self.registry.region_of(pickup_id) {
                if !regions.contains(&region) {
                    regions.push(region);
                }
            }
        }

        Resolution {
            product_code: record.product_code.clone(),
            regions,
            provenance: PickupSource::Api,
            matched_keyword: None,
            pickups: record.pickups.clone(),
        }
    }

    fn classify_by_keywords(&self, product: &CatalogProduct) -> Resolution {
        let hits = match_regions(&product.search_text());
        let provenance = if hits.is_empty() {
            PickupSource::None
        } else {
            PickupSource::Heuristic
        };

        Resolution {
            product_code: product.code.clone(),
            regions: hits.iter().map(|hit| hit.region).collect(),
            provenance,
            matched_keyword: hits.first().map(|hit| hit.phrase),
            pickups: Vec::new(),
        }
    }
}
