//! Shared pickup data model: locations, per-product records, freshness, and
//! the generic cache entry used by in-process memoization.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A single pickup point offered for a product.
///
/// This is the normalized shape used everywhere downstream of the upstream
/// client: stored in the cache, returned by the query surface, and matched
/// against the region registry via `pickup_id`. Serialized camelCase both in
/// JSONB storage and in API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupLocation {
    pub name: String,
    /// Upstream-issued identifier for the pickup point or pickup group. This
    /// is what the region registry keys on.
    pub pickup_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Minutes before tour departure the rider must be at the pickup point.
    #[serde(default)]
    pub minutes_prior: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Provenance of a stored pickup resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickupSource {
    /// Structured data confirmed by the upstream API (including a confirmed
    /// empty list).
    Api,
    /// Derived from keyword matching over catalog text; no structured data
    /// existed when the record was written.
    Heuristic,
    /// Examined, but neither structured data nor a keyword match was found.
    None,
}

impl PickupSource {
    /// Storage tag, used for the `source` column and analytics metadata.
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            PickupSource::Api => "api",
            PickupSource::Heuristic => "heuristic",
            PickupSource::None => "none",
        }
    }

    /// Inverse of [`as_tag`](Self::as_tag). Unknown tags return `None` so a
    /// corrupted row can be treated as a cache miss instead of an error.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "api" => Some(PickupSource::Api),
            "heuristic" => Some(PickupSource::Heuristic),
            "none" => Some(PickupSource::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for PickupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Durable per-product cache record.
///
/// One record per product code. Created on first successful fetch or
/// heuristic resolution, refreshed by bulk sync or lazy refetch on expiry,
/// removed only by explicit invalidation. `access_count` starts at 1 on the
/// first write and increments on every store hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductPickupRecord {
    pub product_code: String,
    /// Ordered as returned by the upstream API.
    pub pickups: Vec<PickupLocation>,
    pub source: PickupSource,
    pub fetched_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: i64,
}

impl ProductPickupRecord {
    /// A record as written on first resolution: `access_count` 1,
    /// `last_accessed` equal to `fetched_at`.
    #[must_use]
    pub fn new(
        product_code: impl Into<String>,
        pickups: Vec<PickupLocation>,
        source: PickupSource,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            pickups,
            source,
            fetched_at,
            last_accessed: fetched_at,
            access_count: 1,
        }
    }

    /// Upstream pickup identifiers carried by this record, in order.
    pub fn pickup_ids(&self) -> impl Iterator<Item = &str> {
        self.pickups.iter().map(|p| p.pickup_id.as_str())
    }

    /// `true` when the record carries structured (API-confirmed) pickups.
    /// A confirmed-empty API record returns `false` here; keyword matching
    /// is the only remaining classification signal for such a product, while
    /// `source` still records that upstream was consulted successfully.
    #[must_use]
    pub fn has_structured_pickups(&self) -> bool {
        self.source == PickupSource::Api && !self.pickups.is_empty()
    }

    /// Age-based freshness classification at `now`.
    #[must_use]
    pub fn freshness(&self, policy: &FreshnessPolicy, now: DateTime<Utc>) -> Freshness {
        policy.classify(self.fetched_at, now)
    }
}

/// Age classification of a cached record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// Younger than the TTL; served as-is.
    Fresh,
    /// Past the TTL but inside the stale window; still servable, flagged for
    /// background refresh.
    Stale,
    /// Past the stale window; must be refetched before serving unless an
    /// explicit offline mode asks otherwise.
    Expired,
}

impl Freshness {
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
            Freshness::Expired => "expired",
        }
    }
}

/// Thresholds for [`Freshness`] classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    /// Records younger than this are fresh.
    pub ttl: Duration,
    /// Records at least this old are expired.
    pub stale_after: Duration,
}

impl FreshnessPolicy {
    /// Builds a policy from whole-second thresholds, forcing
    /// `stale_after >= ttl` so the stale window cannot be negative.
    #[must_use]
    pub fn from_secs(ttl_secs: u64, stale_after_secs: u64) -> Self {
        let ttl = Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX));
        let stale_after =
            Duration::seconds(i64::try_from(stale_after_secs.max(ttl_secs)).unwrap_or(i64::MAX));
        Self { ttl, stale_after }
    }

    /// Classifies an age of `now - fetched_at` against the thresholds.
    #[must_use]
    pub fn classify(&self, fetched_at: DateTime<Utc>, now: DateTime<Utc>) -> Freshness {
        let age = now - fetched_at;
        if age < self.ttl {
            Freshness::Fresh
        } else if age < self.stale_after {
            Freshness::Stale
        } else {
            Freshness::Expired
        }
    }
}

impl Default for FreshnessPolicy {
    /// 15 minutes fresh, 7 days until hard expiry.
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(15),
            stale_after: Duration::days(7),
        }
    }
}

/// Generic expiring wrapper for in-process caches.
///
/// `expires_at` is always strictly after `timestamp`: a zero or negative TTL
/// is clamped to one millisecond rather than producing an entry that was born
/// expired-at-creation with equal timestamps.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    data: T,
    timestamp: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    #[must_use]
    pub fn new(data: T, ttl: Duration) -> Self {
        Self::at(data, ttl, Utc::now())
    }

    /// As [`new`](Self::new) with an explicit creation instant, for tests.
    #[must_use]
    pub fn at(data: T, ttl: Duration, now: DateTime<Utc>) -> Self {
        let ttl = ttl.max(Duration::milliseconds(1));
        Self {
            data,
            timestamp: now,
            expires_at: now + ttl,
        }
    }

    /// `true` while `now < expires_at`.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    #[must_use]
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    #[must_use]
    pub fn data(&self) -> &T {
        &self.data
    }

    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    #[must_use]
    pub fn into_data(self) -> T {
        self.data
    }
}
