//! Work planning and the per-product fetch step for bulk sync.
//!
//! The CLI's sync command and the server's scheduled refresh both drive the
//! same two primitives: [`build_sync_plan`] decides what needs fetching
//! without touching the network, and [`sync_product`] performs one gated
//! fetch-and-persist. Iteration order, pacing, confirmation, and run
//! bookkeeping belong to the callers.

use chrono::Utc;
use serde::Serialize;

use pickupdb_core::{
    CatalogProduct, Freshness, FreshnessPolicy, PickupSource, ProductPickupRecord,
};
use pickupdb_rezdy::RezdyClient;

use crate::store::RecordStore;
use crate::EngineError;

/// What a sync run would do, computed without network calls or writes.
///
/// A dry run prints this directly; a real run processes `to_fetch` in order.
#[derive(Debug, Clone, Serialize)]
pub struct SyncPlan {
    /// Product codes to fetch, in input order.
    pub to_fetch: Vec<String>,
    /// Codes skipped because a fresh record already exists.
    pub skipped_fresh: usize,
    pub total_considered: usize,
}

/// The product codes a sync run iterates.
///
/// Prefers the catalog snapshot; with no catalog the existing store key set
/// is the degraded fallback, so a sync can still refresh what it has.
pub async fn resolve_code_universe<S: RecordStore>(
    store: &S,
    catalog: Option<&[CatalogProduct]>,
) -> Vec<String> {
    if let Some(products) = catalog {
        if !products.is_empty() {
            return products.iter().map(|p| p.code.clone()).collect();
        }
    }

    tracing::warn!("no catalog snapshot available, syncing the cached key set instead");
    match store.list_product_codes().await {
        Ok(codes) => codes,
        Err(err) => {
            tracing::warn!(error = %err, "could not list cached product codes");
            Vec::new()
        }
    }
}

/// Decides which of `product_codes` need fetching.
///
/// Only a fresh record skips a product; stale and expired records are
/// refetched, and `force` refetches everything. A store read failure counts
/// the product as missing rather than failing the plan.
pub async fn build_sync_plan<S: RecordStore>(
    store: &S,
    product_codes: &[String],
    force: bool,
    policy: &FreshnessPolicy,
) -> SyncPlan {
    let total_considered = product_codes.len();

    if force {
        return SyncPlan {
            to_fetch: product_codes.to_vec(),
            skipped_fresh: 0,
            total_considered,
        };
    }

    let now = Utc::now();
    let mut to_fetch = Vec::new();
    let mut skipped_fresh = 0;
    for code in product_codes {
        let record = match store.get(code).await {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(product_code = %code, error = %err, "store read failed, planning a fetch");
                None
            }
        };
        match record {
            Some(record) if record.freshness(policy, now) == Freshness::Fresh => {
                skipped_fresh += 1;
            }
            _ => to_fetch.push(code.clone()),
        }
    }

    SyncPlan {
        to_fetch,
        skipped_fresh,
        total_considered,
    }
}

/// One gated fetch-and-persist. Returns the pickup count on success.
///
/// The last successful write for a product wins; re-running after an
/// interruption is safe.
///
/// # Errors
///
/// [`EngineError::Fetch`] after the client's retries are exhausted, or
/// [`EngineError::Store`] if the write fails.
pub async fn sync_product<S: RecordStore>(
    store: &S,
    client: &RezdyClient,
    product_code: &str,
) -> Result<usize, EngineError> {
    let pickups = client.get_pickups(product_code).await?;
    let count = pickups.len();
    let record = ProductPickupRecord::new(product_code, pickups, PickupSource::Api, Utc::now());
    store.put(&record).await?;
    Ok(count)
}
