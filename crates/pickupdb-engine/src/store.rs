//! Storage seam for pickup records.
//!
//! The resolver, sync planner, and consistency checker all speak
//! [`RecordStore`] instead of a concrete backend, so the whole resolution
//! logic runs against [`MemoryStore`] in tests and against Postgres
//! ([`pickupdb_db::PickupStore`]) in production.
//!
//! Methods return `impl Future + Send` rather than plain `async fn` so that
//! generic callers stay usable inside `tokio::spawn` and axum handlers.

use std::collections::HashMap;
use std::future::Future;

use pickupdb_core::ProductPickupRecord;
use pickupdb_db::{DbError, LocationHit, PickupStore};
use tokio::sync::Mutex;

/// The persistence operations the resolution engine needs.
///
/// Semantics match the Postgres implementation: `put` keeps existing access
/// bookkeeping when refreshing a record, `touch` returns `false` for a
/// missing record, `invalidate(None)` clears everything.
pub trait RecordStore: Send + Sync {
    fn get(
        &self,
        product_code: &str,
    ) -> impl Future<Output = Result<Option<ProductPickupRecord>, DbError>> + Send;

    fn put(
        &self,
        record: &ProductPickupRecord,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    fn touch(&self, product_code: &str) -> impl Future<Output = Result<bool, DbError>> + Send;

    fn invalidate(
        &self,
        product_code: Option<&str>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    fn list_product_codes(&self) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    fn count(&self) -> impl Future<Output = Result<i64, DbError>> + Send;

    fn source_counts(&self) -> impl Future<Output = Result<Vec<(String, i64)>, DbError>> + Send;

    fn find_location_by_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<LocationHit>, DbError>> + Send;
}

impl RecordStore for PickupStore {
    async fn get(&self, product_code: &str) -> Result<Option<ProductPickupRecord>, DbError> {
        PickupStore::get(self, product_code).await
    }

    async fn put(&self, record: &ProductPickupRecord) -> Result<(), DbError> {
        PickupStore::put(self, record).await
    }

    async fn touch(&self, product_code: &str) -> Result<bool, DbError> {
        PickupStore::touch(self, product_code).await
    }

    async fn invalidate(&self, product_code: Option<&str>) -> Result<u64, DbError> {
        PickupStore::invalidate(self, product_code).await
    }

    async fn list_product_codes(&self) -> Result<Vec<String>, DbError> {
        PickupStore::list_product_codes(self).await
    }

    async fn count(&self) -> Result<i64, DbError> {
        PickupStore::count(self).await
    }

    async fn source_counts(&self) -> Result<Vec<(String, i64)>, DbError> {
        PickupStore::source_counts(self).await
    }

    async fn find_location_by_name(&self, name: &str) -> Result<Option<LocationHit>, DbError> {
        PickupStore::find_location_by_name(self, name).await
    }
}

/// In-memory [`RecordStore`] with the same observable semantics as the
/// Postgres store. Used by the engine tests and handy for demos; not meant
/// to survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<String, ProductPickupRecord>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryStore {
    async fn get(&self, product_code: &str) -> Result<Option<ProductPickupRecord>, DbError> {
        let records = self.records.lock().await;
        Ok(records.get(product_code).cloned())
    }

    async fn put(&self, record: &ProductPickupRecord) -> Result<(), DbError> {
        let mut records = self.records.lock().await;
        match records.get_mut(&record.product_code) {
            Some(existing) => {
                // Refresh: replace the payload, keep the access bookkeeping.
                existing.pickups = record.pickups.clone();
                existing.source = record.source;
                existing.fetched_at = record.fetched_at;
            }
            None => {
                let mut fresh = record.clone();
                fresh.access_count = 1;
                records.insert(record.product_code.clone(), fresh);
            }
        }
        Ok(())
    }

    async fn touch(&self, product_code: &str) -> Result<bool, DbError> {
        let mut records = self.records.lock().await;
        match records.get_mut(product_code) {
            Some(record) => {
                record.access_count += 1;
                record.last_accessed = chrono::Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn invalidate(&self, product_code: Option<&str>) -> Result<u64, DbError> {
        let mut records = self.records.lock().await;
        match product_code {
            Some(code) => Ok(u64::from(records.remove(code).is_some())),
            None => {
                let removed = records.len() as u64;
                records.clear();
                Ok(removed)
            }
        }
    }

    async fn list_product_codes(&self) -> Result<Vec<String>, DbError> {
        let records = self.records.lock().await;
        let mut codes: Vec<String> = records.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    async fn count(&self) -> Result<i64, DbError> {
        let records = self.records.lock().await;
        Ok(records.len() as i64)
    }

    async fn source_counts(&self) -> Result<Vec<(String, i64)>, DbError> {
        let records = self.records.lock().await;
        let mut counts: HashMap<&'static str, i64> = HashMap::new();
        for record in records.values() {
            *counts.entry(record.source.as_tag()).or_insert(0) += 1;
        }
        let mut counts: Vec<(String, i64)> = counts
            .into_iter()
            .map(|(tag, n)| (tag.to_string(), n))
            .collect();
        counts.sort();
        Ok(counts)
    }

    async fn find_location_by_name(&self, name: &str) -> Result<Option<LocationHit>, DbError> {
        let records = self.records.lock().await;
        let mut codes: Vec<&String> = records.keys().collect();
        codes.sort();
        for code in codes {
            if let Some(record) = records.get(code) {
                if let Some(location) = record
                    .pickups
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(name))
                {
                    return Ok(Some(LocationHit {
                        product_code: code.clone(),
                        location: location.clone(),
                    }));
                }
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pickupdb_core::{PickupLocation, PickupSource};

    fn location(name: &str, pickup_id: &str) -> PickupLocation {
        PickupLocation {
            name: name.to_string(),
            pickup_id: pickup_id.to_string(),
            address: None,
            latitude: None,
            longitude: None,
            minutes_prior: 0,
            instructions: None,
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        let record = ProductPickupRecord::new(
            "PBNE01",
            vec![location("Anzac Square", "bne-anzac-square")],
            PickupSource::Api,
            Utc::now(),
        );

        store.put(&record).await.unwrap();
        let fetched = store.get("PBNE01").await.unwrap().unwrap();

        assert_eq!(fetched, record);
        assert!(store.get("OTHER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn refresh_keeps_access_count() {
        let store = MemoryStore::new();
        let first = ProductPickupRecord::new("P1", Vec::new(), PickupSource::Api, Utc::now());
        store.put(&first).await.unwrap();
        assert!(store.touch("P1").await.unwrap());

        let refreshed = ProductPickupRecord::new(
            "P1",
            vec![location("Gallery Walk", "tam-gallery-walk")],
            PickupSource::Api,
            Utc::now(),
        );
        store.put(&refreshed).await.unwrap();

        let fetched = store.get("P1").await.unwrap().unwrap();
        assert_eq!(fetched.access_count, 2);
        assert_eq!(fetched.pickups.len(), 1);
    }

    #[tokio::test]
    async fn touch_on_missing_record_reports_false() {
        let store = MemoryStore::new();
        assert!(!store.touch("NOPE").await.unwrap());
    }

    #[tokio::test]
    async fn invalidate_one_and_all() {
        let store = MemoryStore::new();
        for code in ["PA", "PB"] {
            let record = ProductPickupRecord::new(code, Vec::new(), PickupSource::Api, Utc::now());
            store.put(&record).await.unwrap();
        }

        assert_eq!(store.invalidate(Some("PA")).await.unwrap(), 1);
        assert_eq!(store.invalidate(Some("PA")).await.unwrap(), 0);
        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(store.invalidate(None).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn location_lookup_is_case_insensitive_and_stable() {
        let store = MemoryStore::new();
        for code in ["PB02", "PA01"] {
            let record = ProductPickupRecord::new(
                code,
                vec![location("Shared Stop", "shared-stop")],
                PickupSource::Api,
                Utc::now(),
            );
            store.put(&record).await.unwrap();
        }

        let hit = store
            .find_location_by_name("SHARED STOP")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.product_code, "PA01");
    }
}
