//! Bounded in-process event log with derived cache and fetch metrics.
//!
//! Every resolution step reports what happened (hit, miss, fetch, fallback)
//! and the log answers "how is the cache doing" questions over a trailing
//! window. Tracking is fire-and-forget: nothing in here can fail a caller.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use uuid::Uuid;

/// How many locations [`Analytics::metrics`] ranks.
const TOP_LOCATIONS: usize = 5;

/// What a tracked event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// A resolution was answered from the store or the memo.
    CacheHit,
    /// No usable record existed for the product.
    CacheMiss,
    /// An upstream fetch completed successfully.
    ApiFetch,
    /// An upstream fetch failed; attempts = fetches + errors.
    ApiError,
    /// Keyword matching classified a product with no structured data.
    HeuristicFallback,
    /// A region filter pass finished.
    FilterApplied,
    /// A rider picked a concrete pickup location.
    PickupSelected,
    /// A record or the whole cache was explicitly invalidated.
    CacheInvalidated,
}

impl EventType {
    #[must_use]
    pub fn as_tag(self) -> &'static str {
        match self {
            EventType::CacheHit => "cache_hit",
            EventType::CacheMiss => "cache_miss",
            EventType::ApiFetch => "api_fetch",
            EventType::ApiError => "api_error",
            EventType::HeuristicFallback => "heuristic_fallback",
            EventType::FilterApplied => "filter_applied",
            EventType::PickupSelected => "pickup_selected",
            EventType::CacheInvalidated => "cache_invalidated",
        }
    }
}

/// One append-only log entry. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub event_type: EventType,
    pub product_code: Option<String>,
    /// Free-form context. `pickup_selected` events carry the location name
    /// under the `"location"` key.
    pub metadata: serde_json::Value,
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
}

/// Downstream export hook for tracked events.
///
/// Export failures are logged and swallowed by [`Analytics::track`]; a flaky
/// sink can never break resolution.
pub trait AnalyticsSink: Send + Sync {
    /// # Errors
    ///
    /// Whatever the sink considers a delivery failure.
    fn export(
        &self,
        event: &AnalyticsEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Selection count for one pickup location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCount {
    pub name: String,
    pub selections: u64,
}

/// Metrics derived on demand over a trailing window.
///
/// Rates are `None` when their denominator is zero, so "no traffic yet" is
/// distinguishable from "0% hit rate".
#[derive(Debug, Clone, Serialize)]
pub struct AnalyticsMetrics {
    pub window_secs: i64,
    pub total_events: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub hit_rate: Option<f64>,
    pub api_fetches: u64,
    pub api_errors: u64,
    pub error_rate: Option<f64>,
    pub heuristic_fallbacks: u64,
    pub top_locations: Vec<LocationCount>,
}

/// Ring buffer of [`AnalyticsEvent`] with a per-instance session id.
///
/// Oldest events are evicted first once `capacity` is reached.
pub struct Analytics {
    session_id: Uuid,
    capacity: usize,
    events: Mutex<VecDeque<AnalyticsEvent>>,
    sink: Option<Box<dyn AnalyticsSink>>,
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics")
            .field("session_id", &self.session_id)
            .field("capacity", &self.capacity)
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl Analytics {
    /// Creates a log holding at most `capacity` events. A zero capacity is
    /// clamped to one so the buffer can always hold the latest event.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            capacity: capacity.max(1),
            events: Mutex::new(VecDeque::new()),
            sink: None,
        }
    }

    /// As [`new`](Self::new), forwarding every tracked event to `sink`.
    #[must_use]
    pub fn with_sink(capacity: usize, sink: Box<dyn AnalyticsSink>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::new(capacity)
        }
    }

    #[must_use]
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Appends an event, evicting the oldest entry when full. Sink failures
    /// are logged at debug and otherwise ignored.
    pub async fn track(
        &self,
        event_type: EventType,
        product_code: Option<&str>,
        metadata: serde_json::Value,
    ) {
        let event = AnalyticsEvent {
            event_type,
            product_code: product_code.map(str::to_string),
            metadata,
            session_id: self.session_id,
            timestamp: Utc::now(),
        };

        if let Some(sink) = &self.sink {
            if let Err(err) = sink.export(&event) {
                tracing::debug!(
                    event = event_type.as_tag(),
                    error = %err,
                    "analytics sink export failed"
                );
            }
        }

        let mut events = self.events.lock().await;
        if events.len() == self.capacity {
            events.pop_front();
        }
        events.push_back(event);
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    /// The `limit` most recent events, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<AnalyticsEvent> {
        let events = self.events.lock().await;
        events.iter().rev().take(limit).cloned().collect()
    }

    /// Derives metrics from the events tracked in the last `window`.
    pub async fn metrics(&self, window: Duration) -> AnalyticsMetrics {
        let cutoff = Utc::now() - window;
        let events = self.events.lock().await;

        let mut total_events = 0_u64;
        let mut cache_hits = 0_u64;
        let mut cache_misses = 0_u64;
        let mut api_fetches = 0_u64;
        let mut api_errors = 0_u64;
        let mut heuristic_fallbacks = 0_u64;
        let mut selections: HashMap<&str, u64> = HashMap::new();

        for event in events.iter().filter(|e| e.timestamp >= cutoff) {
            total_events += 1;
            match event.event_type {
                EventType::CacheHit => cache_hits += 1,
                EventType::CacheMiss => cache_misses += 1,
                EventType::ApiFetch => api_fetches += 1,
                EventType::ApiError => api_errors += 1,
                EventType::HeuristicFallback => heuristic_fallbacks += 1,
                EventType::PickupSelected => {
                    if let Some(name) = event.metadata.get("location").and_then(|v| v.as_str()) {
                        *selections.entry(name).or_insert(0) += 1;
                    }
                }
                EventType::FilterApplied | EventType::CacheInvalidated => {}
            }
        }

        let mut top_locations: Vec<LocationCount> = selections
            .into_iter()
            .map(|(name, selections)| LocationCount {
                name: name.to_string(),
                selections,
            })
            .collect();
        // Ties break by name so the ranking is deterministic.
        top_locations.sort_by(|a, b| {
            b.selections
                .cmp(&a.selections)
                .then_with(|| a.name.cmp(&b.name))
        });
        top_locations.truncate(TOP_LOCATIONS);

        AnalyticsMetrics {
            window_secs: window.num_seconds(),
            total_events,
            cache_hits,
            cache_misses,
            hit_rate: ratio(cache_hits, cache_hits + cache_misses),
            api_fetches,
            api_errors,
            error_rate: ratio(api_errors, api_fetches + api_errors),
            heuristic_fallbacks,
            top_locations,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}
