//! Drift detection between the two region-filter implementations.
//!
//! The interactive search path ([`PickupFilter`]) and the listing page path
//! ([`listing_filter`](crate::listing_filter)) are separate implementations
//! of the same question. This module runs both against one product set and
//! reports exactly which product codes drifted, not just a score. Anything
//! below 100% agreement is a correctness regression, not a warning.

use std::collections::BTreeSet;

use serde::Serialize;

use pickupdb_core::{CatalogProduct, Region};

use crate::paths::listing_filter;
use crate::resolver::PickupFilter;
use crate::store::RecordStore;

/// Agreement between the two filter paths for one region query.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub region: Region,
    /// `|A ∩ B| / |A ∪ B| × 100`; an empty union counts as full agreement.
    pub percentage: f64,
    /// Product codes only the interactive path returned, sorted.
    pub only_in_a: Vec<String>,
    /// Product codes only the listing path returned, sorted.
    pub only_in_b: Vec<String>,
    /// Set equality. Anything but `true` names a drifted product above.
    pub passed: bool,
}

/// Aggregate over a batch of region queries.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencySummary {
    pub total_regions: usize,
    pub passed: usize,
    pub failed: usize,
    pub average_percentage: f64,
    pub reports: Vec<ConsistencyReport>,
}

/// Runs both filter paths for one region query and diffs the result sets.
pub async fn check_region<S: RecordStore>(
    filter: &PickupFilter<S>,
    region_input: &str,
    products: &[CatalogProduct],
) -> ConsistencyReport {
    let outcome = filter.filter_products(region_input, products).await;
    let path_a: BTreeSet<String> = outcome.products.into_iter().map(|p| p.code).collect();

    let path_b: BTreeSet<String> =
        listing_filter(filter.store(), filter.registry(), region_input, products)
            .await
            .into_iter()
            .collect();

    let intersection = path_a.intersection(&path_b).count();
    let union = path_a.union(&path_b).count();
    let only_in_a: Vec<String> = path_a.difference(&path_b).cloned().collect();
    let only_in_b: Vec<String> = path_b.difference(&path_a).cloned().collect();
    let passed = only_in_a.is_empty() && only_in_b.is_empty();

    let report = ConsistencyReport {
        region: outcome.stats.region,
        percentage: agreement_percentage(intersection, union),
        only_in_a,
        only_in_b,
        passed,
    };

    if !report.passed {
        tracing::warn!(
            region = %report.region,
            only_in_a = ?report.only_in_a,
            only_in_b = ?report.only_in_b,
            "filter paths disagree"
        );
    }
    report
}

/// Runs [`check_region`] across every canonical region, wildcard included.
pub async fn check_all_regions<S: RecordStore>(
    filter: &PickupFilter<S>,
    products: &[CatalogProduct],
) -> ConsistencySummary {
    let mut reports = Vec::new();
    for region in Region::canonical() {
        reports.push(check_region(filter, region.as_slug(), products).await);
    }

    let passed = reports.iter().filter(|r| r.passed).count();
    let average_percentage = average(&reports);

    ConsistencySummary {
        total_regions: reports.len(),
        passed,
        failed: reports.len() - passed,
        average_percentage,
        reports,
    }
}

#[allow(clippy::cast_precision_loss)]
fn agreement_percentage(intersection: usize, union: usize) -> f64 {
    if union == 0 {
        // Both paths agree there is nothing to return.
        100.0
    } else {
        intersection as f64 / union as f64 * 100.0
    }
}

#[allow(clippy::cast_precision_loss)]
fn average(reports: &[ConsistencyReport]) -> f64 {
    if reports.is_empty() {
        return 100.0;
    }
    reports.iter().map(|r| r.percentage).sum::<f64>() / reports.len() as f64
}
