//! Shared reference data and types for the pickup-region subsystem.
//!
//! Everything here is plain data: the [`Region`] enum and its registry of
//! upstream pickup identifiers, the versioned region→keyword table used for
//! heuristic matching, the cached-record types, the catalog snapshot loader,
//! and the environment-driven [`AppConfig`].

mod app_config;
mod catalog;
mod config;
pub mod keywords;
mod pickup;
mod region;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use catalog::{load_catalog, CatalogFile, CatalogProduct};
pub use config::{load_app_config, load_app_config_from_env};
pub use keywords::{
    match_in_region, match_region, match_regions, KeywordMatch, KEYWORD_TABLE_VERSION,
};
pub use pickup::{
    CacheEntry, Freshness, FreshnessPolicy, PickupLocation, PickupSource, ProductPickupRecord,
};
pub use region::{normalize_region, Region, RegionRegistry};

/// Errors raised while loading configuration or the catalog snapshot.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    MissingEnvVar(String),

    #[error("environment variable {var} has an invalid value: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogFileParse(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),
}
