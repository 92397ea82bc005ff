//! Pool-owning handle over the pickup record operations.

use pickupdb_core::ProductPickupRecord;
use sqlx::PgPool;

use crate::{
    records::{self, FreshnessCounts, LocationHit},
    DbError,
};

/// Cloneable handle bundling the `pickup_records` operations with a pool.
///
/// `PgPool` is reference-counted internally, so clones share the same
/// connections. Server handlers, the scheduler, and the CLI each hold one.
#[derive(Debug, Clone)]
pub struct PickupStore {
    pool: PgPool,
}

impl PickupStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Loads a record by product code; decode failures read as misses.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn get(&self, product_code: &str) -> Result<Option<ProductPickupRecord>, DbError> {
        records::get_record(&self.pool, product_code).await
    }

    /// Writes (or refreshes) a record; see [`records::upsert_record`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the upsert fails.
    pub async fn put(&self, record: &ProductPickupRecord) -> Result<(), DbError> {
        records::upsert_record(&self.pool, record).await
    }

    /// Bumps access bookkeeping after a hit.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the update fails.
    pub async fn touch(&self, product_code: &str) -> Result<bool, DbError> {
        records::touch_record(&self.pool, product_code).await
    }

    /// Removes one record, or all of them when `product_code` is `None`.
    /// Returns the number of rows removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the delete fails.
    pub async fn invalidate(&self, product_code: Option<&str>) -> Result<u64, DbError> {
        records::delete_records(&self.pool, product_code).await
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn list_product_codes(&self) -> Result<Vec<String>, DbError> {
        records::list_product_codes(&self.pool).await
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn count(&self) -> Result<i64, DbError> {
        records::count_records(&self.pool).await
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn source_counts(&self) -> Result<Vec<(String, i64)>, DbError> {
        records::source_counts(&self.pool).await
    }

    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn freshness_counts(
        &self,
        ttl_secs: u64,
        stale_after_secs: u64,
    ) -> Result<FreshnessCounts, DbError> {
        records::freshness_counts(&self.pool, ttl_secs, stale_after_secs).await
    }

    /// Case-insensitive exact lookup of a pickup location by name.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Sqlx`] if the query fails.
    pub async fn find_location_by_name(&self, name: &str) -> Result<Option<LocationHit>, DbError> {
        records::find_location_by_name(&self.pool, name).await
    }
}
