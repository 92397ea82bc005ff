//! Catalog snapshot command handlers.

use clap::Subcommand;

/// Sub-commands available under `catalog`.
#[derive(Debug, Subcommand)]
pub enum CatalogCommands {
    /// Validate the snapshot file and print its products
    List,
}

/// Dispatch a `catalog` sub-command.
///
/// # Errors
///
/// Returns an error if the snapshot cannot be read, parsed, or validated.
pub(crate) fn run_catalog(
    config: &pickupdb_core::AppConfig,
    command: &CatalogCommands,
) -> anyhow::Result<()> {
    match command {
        CatalogCommands::List => run_catalog_list(config),
    }
}

/// Load, validate, and print the catalog snapshot.
fn run_catalog_list(config: &pickupdb_core::AppConfig) -> anyhow::Result<()> {
    let catalog = pickupdb_core::load_catalog(&config.catalog_path)?;

    println!(
        "{} products in {}",
        catalog.products.len(),
        config.catalog_path.display()
    );
    println!();
    println!("{:<10}{}", "CODE", "NAME");
    for product in &catalog.products {
        println!("{:<10}{}", product.code, product.name);
    }
    Ok(())
}
