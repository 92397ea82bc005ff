//! Database operations for the `pickup_records` table.
//!
//! Rows store the pickup list as JSONB. Reads decode back into
//! [`ProductPickupRecord`]; a row that fails to decode (unparseable JSON,
//! unknown source tag) is logged and reported as a miss so the caller
//! refetches instead of crashing on bad data.

use chrono::{DateTime, Utc};
use pickupdb_core::{PickupLocation, PickupSource, ProductPickupRecord};
use sqlx::PgPool;

use crate::{cache_key::cache_key, DbError};

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `pickup_records` table, pickups still encoded as JSONB.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PickupRecordRow {
    pub id: i64,
    pub product_code: String,
    pub cache_key: String,
    pub pickups: serde_json::Value,
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub access_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PickupRecordRow {
    /// Decodes the row into a domain record.
    ///
    /// Returns `None` (after logging) when the JSONB payload or the source
    /// tag cannot be decoded; callers treat that as a cache miss.
    #[must_use]
    pub fn into_record(self) -> Option<ProductPickupRecord> {
        let pickups = match serde_json::from_value::<Vec<PickupLocation>>(self.pickups) {
            Ok(pickups) => pickups,
            Err(err) => {
                tracing::warn!(
                    product_code = %self.product_code,
                    error = %err,
                    "pickup record has unreadable JSONB payload, treating as miss"
                );
                return None;
            }
        };
        let Some(source) = PickupSource::from_tag(&self.source) else {
            tracing::warn!(
                product_code = %self.product_code,
                source = %self.source,
                "pickup record has unknown source tag, treating as miss"
            );
            return None;
        };
        Some(ProductPickupRecord {
            product_code: self.product_code,
            pickups,
            source,
            fetched_at: self.fetched_at,
            last_accessed: self.last_accessed,
            access_count: self.access_count,
        })
    }
}

/// A single pickup location found by name, with the product it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationHit {
    pub product_code: String,
    pub location: PickupLocation,
}

/// Record counts bucketed by age at query time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct FreshnessCounts {
    pub fresh: i64,
    pub stale: i64,
    pub expired: i64,
}

// ---------------------------------------------------------------------------
// pickup_records operations
// ---------------------------------------------------------------------------

/// Upserts a pickup record keyed by product code.
///
/// On first write the row starts with `access_count` 1 and `last_accessed`
/// taken from the record. A conflicting write (refresh) replaces `pickups`,
/// `source`, and `fetched_at` but preserves the existing access bookkeeping,
/// so usage statistics survive refreshes.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn upsert_record(pool: &PgPool, record: &ProductPickupRecord) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO pickup_records \
             (product_code, cache_key, pickups, source, fetched_at, last_accessed, access_count) \
         VALUES ($1, $2, $3, $4, $5, $6, 1) \
         ON CONFLICT (product_code) DO UPDATE SET \
             pickups    = EXCLUDED.pickups, \
             source     = EXCLUDED.source, \
             fetched_at = EXCLUDED.fetched_at, \
             updated_at = NOW()",
    )
    .bind(&record.product_code)
    .bind(cache_key(&record.product_code))
    .bind(sqlx::types::Json(&record.pickups))
    .bind(record.source.as_tag())
    .bind(record.fetched_at)
    .bind(record.last_accessed)
    .execute(pool)
    .await?;

    Ok(())
}

/// Loads the record for a product code, if one exists and decodes cleanly.
///
/// A row that fails to decode is treated as a miss (see [`PickupRecordRow::into_record`]).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_record(
    pool: &PgPool,
    product_code: &str,
) -> Result<Option<ProductPickupRecord>, DbError> {
    let row = sqlx::query_as::<_, PickupRecordRow>(
        "SELECT id, product_code, cache_key, pickups, source, \
                fetched_at, last_accessed, access_count, created_at, updated_at \
         FROM pickup_records \
         WHERE product_code = $1",
    )
    .bind(product_code)
    .fetch_optional(pool)
    .await?;

    Ok(row.and_then(PickupRecordRow::into_record))
}

/// Bumps `access_count` and `last_accessed` for a product's record.
///
/// Returns `true` if a row was updated, `false` if no record exists (for
/// example because it was invalidated between the read and the touch).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn touch_record(pool: &PgPool, product_code: &str) -> Result<bool, DbError> {
    let rows_affected = sqlx::query(
        "UPDATE pickup_records \
         SET access_count = access_count + 1, \
             last_accessed = NOW(), \
             updated_at = NOW() \
         WHERE product_code = $1",
    )
    .bind(product_code)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(rows_affected > 0)
}

/// Deletes the record for one product, or every record when `product_code`
/// is `None`.
///
/// Returns the number of rows removed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the delete fails.
pub async fn delete_records(pool: &PgPool, product_code: Option<&str>) -> Result<u64, DbError> {
    let rows_affected = match product_code {
        Some(code) => {
            sqlx::query("DELETE FROM pickup_records WHERE product_code = $1")
                .bind(code)
                .execute(pool)
                .await?
                .rows_affected()
        }
        None => {
            sqlx::query("DELETE FROM pickup_records")
                .execute(pool)
                .await?
                .rows_affected()
        }
    };

    Ok(rows_affected)
}

/// All product codes with a cached record, ordered for stable output.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_product_codes(pool: &PgPool) -> Result<Vec<String>, DbError> {
    let codes = sqlx::query_scalar::<_, String>(
        "SELECT product_code FROM pickup_records ORDER BY product_code",
    )
    .fetch_all(pool)
    .await?;

    Ok(codes)
}

/// Total number of cached records.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_records(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM pickup_records")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

/// Record counts grouped by source tag (`api`, `heuristic`, `none`).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn source_counts(pool: &PgPool) -> Result<Vec<(String, i64)>, DbError> {
    let counts = sqlx::query_as::<_, (String, i64)>(
        "SELECT source, COUNT(*) FROM pickup_records GROUP BY source ORDER BY source",
    )
    .fetch_all(pool)
    .await?;

    Ok(counts)
}

/// Record counts bucketed into fresh / stale / expired using the supplied
/// thresholds, evaluated against `NOW()` in the database.
///
/// The boundaries match [`pickupdb_core::FreshnessPolicy::classify`]: a
/// record is fresh while strictly younger than `ttl_secs`, stale from
/// `ttl_secs` up to (but not including) `stale_after_secs`, expired after.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
#[allow(clippy::cast_precision_loss)]
pub async fn freshness_counts(
    pool: &PgPool,
    ttl_secs: u64,
    stale_after_secs: u64,
) -> Result<FreshnessCounts, DbError> {
    let counts = sqlx::query_as::<_, FreshnessCounts>(
        "SELECT \
             COUNT(*) FILTER (WHERE fetched_at > NOW() - make_interval(secs => $1)) AS fresh, \
             COUNT(*) FILTER (WHERE fetched_at <= NOW() - make_interval(secs => $1) \
                                AND fetched_at > NOW() - make_interval(secs => $2)) AS stale, \
             COUNT(*) FILTER (WHERE fetched_at <= NOW() - make_interval(secs => $2)) AS expired \
         FROM pickup_records",
    )
    .bind(ttl_secs as f64)
    .bind(stale_after_secs as f64)
    .fetch_one(pool)
    .await?;

    Ok(counts)
}

/// Finds a pickup location by name, case-insensitive exact match, across
/// every cached record.
///
/// When the same location name appears under multiple products the hit from
/// the lowest product code wins, so repeated lookups are deterministic.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn find_location_by_name(
    pool: &PgPool,
    name: &str,
) -> Result<Option<LocationHit>, DbError> {
    let row = sqlx::query_as::<_, (String, serde_json::Value)>(
        "SELECT pr.product_code, loc.value \
         FROM pickup_records pr, \
              LATERAL jsonb_array_elements(pr.pickups) AS loc(value) \
         WHERE LOWER(loc.value->>'name') = LOWER($1) \
         ORDER BY pr.product_code \
         LIMIT 1",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    let Some((product_code, value)) = row else {
        return Ok(None);
    };
    match serde_json::from_value::<PickupLocation>(value) {
        Ok(location) => Ok(Some(LocationHit {
            product_code,
            location,
        })),
        Err(err) => {
            tracing::warn!(
                product_code = %product_code,
                error = %err,
                "matched pickup location failed to decode, treating as not found"
            );
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn row(pickups: serde_json::Value, source: &str) -> PickupRecordRow {
        let now = Utc::now();
        PickupRecordRow {
            id: 1,
            product_code: "PBNE01".to_string(),
            cache_key: cache_key("PBNE01"),
            pickups,
            source: source.to_string(),
            fetched_at: now,
            last_accessed: now,
            access_count: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn well_formed_row_decodes_into_a_record() {
        let pickups = json!([{
            "name": "Anzac Square",
            "pickupId": "bne-anzac-square",
            "minutesPrior": 15
        }]);
        let record = row(pickups, "api").into_record().unwrap();

        assert_eq!(record.product_code, "PBNE01");
        assert_eq!(record.source, PickupSource::Api);
        assert_eq!(record.pickups.len(), 1);
        assert_eq!(record.pickups[0].pickup_id, "bne-anzac-square");
    }

    #[test]
    fn unreadable_payload_is_a_miss() {
        assert!(row(json!("not an array"), "api").into_record().is_none());
        assert!(row(json!([{"pickupId": 42}]), "api").into_record().is_none());
    }

    #[test]
    fn unknown_source_tag_is_a_miss() {
        assert!(row(json!([]), "apii").into_record().is_none());
    }
}
