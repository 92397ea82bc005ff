//! Per-process memoization of resolution results.
//!
//! Sits in front of the record store so repeated filter passes over the same
//! catalog page do not re-run classification (or hit Postgres) for every
//! product. Entries expire on their own TTL and are dropped lazily on read.

use std::collections::HashMap;

use chrono::Duration;
use pickupdb_core::CacheEntry;
use tokio::sync::Mutex;

/// Expiring keyed cache over [`CacheEntry`].
///
/// Keys are product codes. The cache never serves an expired entry: `get`
/// removes it and reports a miss.
#[derive(Debug)]
pub struct MemoCache<T> {
    ttl: Duration,
    entries: Mutex<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> MemoCache<T> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_valid() => Some(entry.data().clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub async fn insert(&self, key: &str, value: T) {
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), CacheEntry::new(value, self.ttl));
    }

    /// Drops one key, or every key when `key` is `None`. Returns how many
    /// entries were removed.
    pub async fn clear(&self, key: Option<&str>) -> usize {
        let mut entries = self.entries.lock().await;
        match key {
            Some(key) => usize::from(entries.remove(key).is_some()),
            None => {
                let removed = entries.len();
                entries.clear();
                removed
            }
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
