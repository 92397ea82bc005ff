//! Cross-path agreement checks over mixed store fixtures.

use std::sync::Arc;

use chrono::Utc;

use pickupdb_core::{CatalogProduct, PickupLocation, PickupSource, ProductPickupRecord, Region};
use pickupdb_engine::{
    check_all_regions, check_region, listing_filter, Analytics, FilterConfig, MemoryStore,
    PickupFilter, RecordStore,
};

fn product(code: &str, name: &str, description: Option<&str>) -> CatalogProduct {
    CatalogProduct {
        code: code.to_string(),
        name: name.to_string(),
        category: None,
        description: description.map(str::to_string),
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

fn offline_filter() -> PickupFilter<MemoryStore> {
    let config = FilterConfig {
        offline: true,
        ..FilterConfig::default()
    };
    PickupFilter::new(MemoryStore::new(), None, config, Arc::new(Analytics::new(1000)))
}

/// Store and catalog covering every resolution shape: structured
/// single-region, structured multi-region, confirmed-empty with keyword
/// text, keyword-only, and no signal at all.
async fn mixed_fixture(filter: &PickupFilter<MemoryStore>) -> Vec<CatalogProduct> {
    let store = filter.store();
    store
        .put(&ProductPickupRecord::new(
            "PBNE01",
            vec![stop("bne-anzac-square"), stop("bne-roma-st-station")],
            PickupSource::Api,
            Utc::now(),
        ))
        .await
        .unwrap();
    store
        .put(&ProductPickupRecord::new(
            "PGC02",
            vec![stop("gc-broadbeach-mall"), stop("tam-gallery-walk")],
            PickupSource::Api,
            Utc::now(),
        ))
        .await
        .unwrap();
    store
        .put(&ProductPickupRecord::new(
            "PSUN03",
            Vec::new(),
            PickupSource::Api,
            Utc::now(),
        ))
        .await
        .unwrap();

    vec![
        product("PBNE01", "Brisbane Highlights", None),
        product("PGC02", "Coast and Mountain Combo", None),
        product(
            "PSUN03",
            "Beach Day",
            Some("Mooloolaba on the Sunshine Coast."),
        ),
        product("PTAM04", "Mount Tamborine Wine Tour", None),
        product("PMYS05", "Mystery Flight", None),
    ]
}

#[tokio::test]
async fn both_paths_agree_across_every_canonical_region() {
    let filter = offline_filter();
    let products = mixed_fixture(&filter).await;

    let summary = check_all_regions(&filter, &products).await;

    assert_eq!(summary.total_regions, Region::canonical().len());
    assert_eq!(summary.failed, 0, "drift: {:?}", summary.reports);
    assert_eq!(summary.passed, summary.total_regions);
    assert!((summary.average_percentage - 100.0).abs() < f64::EPSILON);
    for report in &summary.reports {
        assert!(report.only_in_a.is_empty() && report.only_in_b.is_empty());
    }
}

#[tokio::test]
async fn multi_region_structured_product_matches_both_its_regions_on_both_paths() {
    let filter = offline_filter();
    let products = mixed_fixture(&filter).await;

    for region in ["gold-coast", "tamborine"] {
        let outcome = filter.filter_products(region, &products).await;
        let codes: Vec<&str> = outcome.products.iter().map(|p| p.code.as_str()).collect();
        assert!(codes.contains(&"PGC02"), "{region}: {codes:?}");

        let listing =
            listing_filter(filter.store(), filter.registry(), region, &products).await;
        assert!(listing.contains(&"PGC02".to_string()), "{region}: {listing:?}");
    }
}

#[tokio::test]
async fn keyword_only_snapshot_is_fully_consistent() {
    let filter = offline_filter();
    let products = vec![
        product("PTAM04", "Mount Tamborine Wine Tour", None),
        product("PSUN03", "Beach Day", Some("Sunshine Coast sampler.")),
        product("PMYS05", "Mystery Flight", None),
    ];

    let summary = check_all_regions(&filter, &products).await;

    assert_eq!(summary.failed, 0, "drift: {:?}", summary.reports);
}

#[tokio::test]
async fn summary_counts_drifted_regions() {
    let filter = offline_filter();
    let products = vec![product("P1", "Tamborine Mountain Wine Tour", None)];

    // Memoize the keyword resolution, then flip the stored truth to the Gold
    // Coast so the two paths disagree in exactly two regions.
    filter.resolve(&products[0]).await;
    filter
        .store()
        .put(&ProductPickupRecord::new(
            "P1",
            vec![stop("gc-broadbeach-mall")],
            PickupSource::Api,
            Utc::now(),
        ))
        .await
        .unwrap();

    let summary = check_all_regions(&filter, &products).await;

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.passed, summary.total_regions - 2);
    let expected_average =
        f64::from(u32::try_from(summary.passed).unwrap()) * 100.0 / 7.0;
    assert!((summary.average_percentage - expected_average).abs() < 1e-9);

    let gold_coast = summary
        .reports
        .iter()
        .find(|r| r.region == Region::GoldCoast)
        .unwrap();
    assert_eq!(gold_coast.only_in_b, vec!["P1"]);
    let tamborine = summary
        .reports
        .iter()
        .find(|r| r.region == Region::Tamborine)
        .unwrap();
    assert_eq!(tamborine.only_in_a, vec!["P1"]);
}

#[tokio::test]
async fn single_region_report_carries_the_normalized_region() {
    let filter = offline_filter();
    let products = mixed_fixture(&filter).await;

    let report = check_region(&filter, "Surfers Paradise", &products).await;

    assert_eq!(report.region, Region::GoldCoast);
    assert!(report.passed);
}
