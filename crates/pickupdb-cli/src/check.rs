//! Consistency check command handler.
//!
//! Runs both filter paths over the catalog snapshot and diffs them. The
//! filter is built offline so both paths read the same stored records and
//! the check never triggers fetches; drift here means the paths disagree
//! about the data as cached, which is exactly the bug this exists to catch.

use std::sync::Arc;

use pickupdb_db::PickupStore;
use pickupdb_engine::{
    check_all_regions, check_region, Analytics, ConsistencyReport, FilterConfig, PickupFilter,
};

/// Compare the two filter paths and exit non-zero on drift.
///
/// With `--region` only that query is checked; otherwise every canonical
/// region is.
///
/// # Errors
///
/// Returns an error if the catalog snapshot cannot be loaded or if any
/// checked region drifted.
pub(crate) async fn run_check(
    pool: &sqlx::PgPool,
    config: &pickupdb_core::AppConfig,
    region: Option<&str>,
) -> anyhow::Result<()> {
    let catalog = pickupdb_core::load_catalog(&config.catalog_path)?;

    let filter_config = FilterConfig {
        offline: true,
        ..FilterConfig::from_app_config(config)
    };
    let analytics = Arc::new(Analytics::new(config.analytics_capacity));
    let filter = PickupFilter::new(PickupStore::new(pool.clone()), None, filter_config, analytics);

    if let Some(query) = region {
        let report = check_region(&filter, query, &catalog.products).await;
        print_report(&report);
        if !report.passed {
            anyhow::bail!("filter paths disagree for region '{}'", report.region);
        }
        return Ok(());
    }

    let summary = check_all_regions(&filter, &catalog.products).await;

    println!("{:<16}{:>8}  {:>7}  {:>7}", "REGION", "AGREE", "ONLY A", "ONLY B");
    for report in &summary.reports {
        println!(
            "{:<16}{:>7.1}%  {:>7}  {:>7}",
            report.region.to_string(),
            report.percentage,
            report.only_in_a.len(),
            report.only_in_b.len()
        );
    }
    println!();
    println!(
        "{} of {} regions consistent, average agreement {:.1}%",
        summary.passed, summary.total_regions, summary.average_percentage
    );

    if summary.failed > 0 {
        anyhow::bail!("{} of {} regions drifted", summary.failed, summary.total_regions);
    }
    Ok(())
}

fn print_report(report: &ConsistencyReport) {
    println!("region: {}", report.region);
    println!("agreement: {:.1}%", report.percentage);
    if !report.only_in_a.is_empty() {
        println!("only in interactive path: {}", report.only_in_a.join(", "));
    }
    if !report.only_in_b.is_empty() {
        println!("only in listing path: {}", report.only_in_b.join(", "));
    }
    if report.passed {
        println!("paths agree");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
