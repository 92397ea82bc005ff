//! Region resolution engine: store-first filtering, heuristic fallback,
//! bulk sync planning, consistency checking, and analytics.
//!
//! The engine is storage-agnostic: everything is generic over
//! [`RecordStore`], with [`MemoryStore`] for tests and the Postgres-backed
//! [`PickupStore`](pickupdb_db::PickupStore) for production. Interactive
//! resolution never returns an error; it degrades. The fallible surface
//! (explicit refreshes, invalidation, sync) reports [`EngineError`].

use thiserror::Error;

/// Failures from the engine's explicit, fallible operations.
///
/// Interactive resolution never surfaces these; only caller-initiated
/// operations (refresh, invalidate, sync) do.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no upstream client is configured")]
    Offline,

    #[error(transparent)]
    Fetch(#[from] pickupdb_rezdy::RezdyError),

    #[error(transparent)]
    Store(#[from] pickupdb_db::DbError),
}

pub mod analytics;
pub mod consistency;
pub mod memo;
pub mod paths;
pub mod resolver;
pub mod store;
pub mod sync;

pub use analytics::{
    Analytics, AnalyticsEvent, AnalyticsMetrics, AnalyticsSink, EventType, LocationCount,
};
pub use consistency::{
    check_all_regions, check_region, ConsistencyReport, ConsistencySummary,
};
pub use memo::MemoCache;
pub use paths::listing_filter;
pub use resolver::{
    FilterConfig, FilterOutcome, FilterStats, PickupFilter, RefreshSummary, Resolution,
};
pub use store::{MemoryStore, RecordStore};
pub use sync::{build_sync_plan, resolve_code_universe, sync_product, SyncPlan};
