//! The listing page's own region filter.
//!
//! The product listing page predates [`PickupFilter`](crate::PickupFilter)
//! and ships a deliberately simple filter: read whatever record exists, never
//! fetch, never write, fall back to keywords. It stays a separate
//! implementation on purpose; the consistency checker compares the two paths
//! to catch behavioral drift between them.

use pickupdb_core::{match_in_region, normalize_region, CatalogProduct, Region, RegionRegistry};

use crate::store::RecordStore;

/// Filters `products` to the codes serving the queried region.
///
/// Read-only: store hits are not counted as accesses and nothing is ever
/// fetched or persisted. A store read failure downgrades that product to
/// keyword matching. Input order is preserved; an `all` query (after
/// normalization) returns every code.
pub async fn listing_filter<S: RecordStore>(
    store: &S,
    registry: &RegionRegistry,
    region_input: &str,
    products: &[CatalogProduct],
) -> Vec<String> {
    let region = normalize_region(region_input);
    if region == Region::All {
        return products.iter().map(|p| p.code.clone()).collect();
    }

    let mut matched = Vec::new();
    for product in products {
        if product_in_region(store, registry, region, product).await {
            matched.push(product.code.clone());
        }
    }
    matched
}

async fn product_in_region<S: RecordStore>(
    store: &S,
    registry: &RegionRegistry,
    region: Region,
    product: &CatalogProduct,
) -> bool {
    match store.get(&product.code).await {
        Ok(Some(record)) if record.has_structured_pickups() => record
            .pickup_ids()
            .any(|pickup_id| registry.is_in_region(pickup_id, region)),
        Ok(_) => match_in_region(&product.search_text(), region).is_some(),
        Err(err) => {
            tracing::debug!(
                product_code = %product.code,
                error = %err,
                "listing filter store read failed, using keywords"
            );
            match_in_region(&product.search_text(), region).is_some()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pickupdb_core::{PickupLocation, PickupSource, ProductPickupRecord};

    use crate::store::MemoryStore;

    fn product(code: &str, name: &str) -> CatalogProduct {
        CatalogProduct {
            code: code.to_string(),
            name: name.to_string(),
            category: None,
            description: None,
        }
    }

    fn stop(pickup_id: &str) -> PickupLocation {
        PickupLocation {
            name: pickup_id.to_string(),
            pickup_id: pickup_id.to_string(),
            address: None,
            latitude: None,
            longitude: None,
            minutes_prior: 0,
            instructions: None,
        }
    }

    #[tokio::test]
    async fn structured_records_beat_catalog_text() {
        let store = MemoryStore::new();
        let record = ProductPickupRecord::new(
            "P1",
            vec![stop("gc-broadbeach-mall")],
            PickupSource::Api,
            Utc::now(),
        );
        store.put(&record).await.unwrap();
        let registry = RegionRegistry::new();
        let products = vec![product("P1", "Brisbane River Cruise")];

        let gold_coast = listing_filter(&store, &registry, "gold-coast", &products).await;
        let brisbane = listing_filter(&store, &registry, "brisbane", &products).await;

        assert_eq!(gold_coast, vec!["P1"]);
        assert!(brisbane.is_empty());
    }

    #[tokio::test]
    async fn missing_records_fall_back_to_keywords() {
        let store = MemoryStore::new();
        let registry = RegionRegistry::new();
        let products = vec![
            product("P1", "Tamborine Mountain Wine Tour"),
            product("P2", "Harbour Jet Boat"),
        ];

        let matched = listing_filter(&store, &registry, "tamborine", &products).await;

        assert_eq!(matched, vec!["P1"]);
    }

    #[tokio::test]
    async fn all_region_returns_every_code_without_reads() {
        let store = MemoryStore::new();
        let registry = RegionRegistry::new();
        let products = vec![product("P1", "A"), product("P2", "B")];

        let matched = listing_filter(&store, &registry, "Anywhere!", &products).await;

        assert_eq!(matched, vec!["P1", "P2"]);
    }
}
