//! Bounded, thread-safe cache of shared handles.
//!
//! Eviction is reference-count aware: when the cache is full, entries are
//! scanned in key order and the first ones nobody outside the cache holds
//! are dropped. If every entry is in use, the last one is dropped anyway;
//! outstanding handles keep their value alive until released.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::config::DEFAULT_CACHE_SIZE;
use crate::types::CacheStats;

/// Map from key to shared handle, bounded to `max_entries`.
#[derive(Debug)]
pub struct ThreadSafeCache<T: ?Sized> {
    entries: Mutex<BTreeMap<String, Arc<T>>>,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<T: ?Sized> Default for ThreadSafeCache<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}

impl<T: ?Sized> ThreadSafeCache<T> {
    /// Create a cache holding at most `max_entries` (at least one).
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            max_entries: max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, Arc<T>>> {
        // The map is left consistent by every critical section
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Arc<T>> {
        let found = self.lock().get(key).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        found
    }

    /// Insert `value` under `key` and return the handle to use.
    ///
    /// If the key is already present, `value` is discarded and the existing
    /// handle returned, so racing constructors converge on one value.
    pub fn put(&self, key: &str, value: Arc<T>) -> Arc<T> {
        let mut evicted = Vec::new();
        let result = {
            let mut entries = self.lock();
            if let Some(existing) = entries.get(key) {
                let existing = Arc::clone(existing);
                drop(entries);
                debug!(key, "Cache entry already present, discarding new value");
                drop(value);
                return existing;
            }

            if entries.len() >= self.max_entries {
                let keys: Vec<String> = entries.keys().cloned().collect();
                let last = keys.len() - 1;
                for (i, candidate) in keys.iter().enumerate() {
                    if entries.len() < self.max_entries {
                        break;
                    }
                    let unreferenced = entries
                        .get(candidate)
                        .is_some_and(|v| Arc::strong_count(v) == 1);
                    if unreferenced || i == last {
                        if let Some(v) = entries.remove(candidate) {
                            debug!(key = %candidate, in_use = !unreferenced, "Evicting cache entry");
                            evicted.push(v);
                        }
                    }
                }
            }

            entries.insert(key.to_string(), Arc::clone(&value));
            value
        };

        self.evictions
            .fetch_add(evicted.len() as u64, Ordering::Relaxed);
        // Evicted values are released outside the lock
        drop(evicted);
        result
    }

    /// Remove and return the entry for `key`.
    pub fn remove(&self, key: &str) -> Option<Arc<T>> {
        self.lock().remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Keys in iteration (eviction scan) order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Clear all entries from the cache.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.lock());
        drop(drained);
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_put_and_get() {
        let cache: ThreadSafeCache<String> = ThreadSafeCache::new(4);
        assert!(cache.get("a").is_none());
        let stored = cache.put("a", Arc::new("alpha".to_string()));
        assert_eq!(*stored, "alpha");
        assert_eq!(*cache.get("a").unwrap(), "alpha");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_put_existing_key_keeps_first_value() {
        let cache: ThreadSafeCache<u32> = ThreadSafeCache::new(4);
        let first = cache.put("k", Arc::new(1));
        let second = cache.put("k", Arc::new(2));
        assert_eq!(*second, 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_evicts_unreferenced_entry() {
        let cache: ThreadSafeCache<u32> = ThreadSafeCache::new(3);
        let a = cache.put("a", Arc::new(1));
        cache.put("b", Arc::new(2)); // not held outside the cache
        let c = cache.put("c", Arc::new(3));

        let d = cache.put("d", Arc::new(4));
        assert_eq!(cache.len(), 3);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
        assert!(cache.contains("d"));
        assert_eq!(cache.stats().evictions, 1);
        drop((a, c, d));
    }

    #[test]
    fn test_evicts_last_when_all_referenced() {
        let cache: ThreadSafeCache<u32> = ThreadSafeCache::new(2);
        let a = cache.put("a", Arc::new(1));
        let b = cache.put("b", Arc::new(2));
        let _c = cache.put("c", Arc::new(3));

        assert_eq!(cache.keys(), vec!["a".to_string(), "c".to_string()]);
        // The evicted handle is still valid
        assert_eq!(*b, 2);
        assert_eq!(Arc::strong_count(&b), 1);
        drop(a);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache: ThreadSafeCache<u32> = ThreadSafeCache::default();
        assert_eq!(cache.max_entries(), 12);
        cache.put("a", Arc::new(1));
        cache.put("b", Arc::new(2));
        assert_eq!(cache.remove("a").map(|v| *v), Some(1));
        assert!(cache.remove("a").is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
