//! Bounded, TTL-aware store backing one cached field.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use serde_json::Value;
use tracing::debug;

/// Result of a cache lookup. A hit may hold an absent value (negative caching).
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Option<Value>),
    Miss,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Option<Value>,
    expires_at: Instant,
}

/// Key/value store shared by every run of an action.
///
/// Holds at most `max_keys` entries. A write into a full store first purges
/// expired entries, then evicts the entry closest to expiry. Clones share the
/// same entries.
#[derive(Debug, Clone)]
pub struct CacheStore {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    time_to_live: Duration,
    max_keys: usize,
}

impl CacheStore {
    pub fn new(time_to_live: Duration, max_keys: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            time_to_live,
            max_keys: max_keys.max(1),
        }
    }

    pub fn time_to_live(&self) -> Duration {
        self.time_to_live
    }

    pub fn get(&self, key: &str) -> CacheLookup {
        let now = Instant::now();
        let mut entries = self.lock();
        let found = entries.get(key).map(|entry| (entry.expires_at > now, entry.value.clone()));
        match found {
            Some((true, value)) => CacheLookup::Hit(value),
            Some((false, _)) => {
                entries.remove(key);
                CacheLookup::Miss
            }
            None => CacheLookup::Miss,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: Option<Value>) {
        let key = key.into();
        let now = Instant::now();
        let mut entries = self.lock();
        if !entries.contains_key(&key) && entries.len() >= self.max_keys {
            entries.retain(|_, entry| entry.expires_at > now);
            if entries.len() >= self.max_keys
                && let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone())
            {
                debug!(evicted = %oldest, max_keys = self.max_keys, "cache full; evicting entry closest to expiry");
                entries.remove(&oldest);
            }
        }
        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now + self.time_to_live,
            },
        );
    }

    /// Number of stored entries, expired ones included until they are purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::thread::sleep;

    #[test]
    fn stores_present_and_absent_values() {
        let cache = CacheStore::new(Duration::from_secs(60), 10);
        cache.set("org:acme", Some(json!(42)));
        cache.set("org:none", None);

        assert_eq!(cache.get("org:acme"), CacheLookup::Hit(Some(json!(42))));
        assert_eq!(cache.get("org:none"), CacheLookup::Hit(None));
        assert_eq!(cache.get("org:other"), CacheLookup::Miss);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = CacheStore::new(Duration::from_millis(20), 10);
        cache.set("token", Some(json!("t")));

        sleep(Duration::from_millis(40));

        assert_eq!(cache.get("token"), CacheLookup::Miss);
        assert!(cache.is_empty());
    }

    #[test]
    fn full_store_evicts_entry_closest_to_expiry() {
        let cache = CacheStore::new(Duration::from_secs(60), 2);
        cache.set("a", Some(json!(1)));
        sleep(Duration::from_millis(2));
        cache.set("b", Some(json!(2)));
        sleep(Duration::from_millis(2));
        cache.set("c", Some(json!(3)));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a"), CacheLookup::Miss);
        assert_eq!(cache.get("c"), CacheLookup::Hit(Some(json!(3))));
    }

    #[test]
    fn overwriting_existing_key_does_not_evict() {
        let cache = CacheStore::new(Duration::from_secs(60), 1);
        cache.set("a", Some(json!(1)));
        cache.set("a", Some(json!(2)));

        assert_eq!(cache.get("a"), CacheLookup::Hit(Some(json!(2))));
    }

    #[test]
    fn clones_share_entries_across_threads() {
        let cache = CacheStore::new(Duration::from_secs(60), 100);
        let handles: Vec<_> = (0..8)
            .map(|index| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.set(format!("key-{index}"), Some(json!(index))))
            })
            .collect();
        for handle in handles {
            handle.join().expect("writer thread");
        }

        assert_eq!(cache.len(), 8);
    }
}
