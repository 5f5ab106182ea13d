// Bounded per-process memoization of upstream responses

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Insertion-ordered cache with a soft capacity.
///
/// Every entry records a monotonic insertion index. When an insert pushes the
/// cache above `capacity`, the entries with the oldest indices are evicted.
/// Reads never reorder entries. Values are cloned out whole, so a reader
/// never observes a partially written entry.
pub struct ResponseCache<K, V> {
    inner: Arc<Mutex<CacheInner<K, V>>>,
    capacity: usize,
}

struct CacheInner<K, V> {
    entries: HashMap<K, (u64, V)>,
    order: BTreeMap<u64, K>,
    next_index: u64,
}

impl<K, V> ResponseCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                order: BTreeMap::new(),
                next_index: 0,
            })),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &K) -> Option<V> {
        let inner = self.lock();
        inner.entries.get(key).map(|(_, value)| value.clone())
    }

    /// Insert or replace `key`. Replacing gives the entry a fresh index.
    /// Returns how many entries were evicted.
    pub fn insert(&self, key: K, value: V) -> usize {
        let mut inner = self.lock();

        let index = inner.next_index;
        inner.next_index += 1;

        if let Some((old_index, _)) = inner.entries.insert(key.clone(), (index, value)) {
            inner.order.remove(&old_index);
        }
        inner.order.insert(index, key);

        let mut evicted = 0;
        while inner.entries.len() > self.capacity {
            let Some((_, oldest)) = inner.order.pop_first() else {
                break;
            };
            inner.entries.remove(&oldest);
            evicted += 1;
        }

        if evicted > 0 {
            tracing::debug!(evicted, capacity = self.capacity, "Cache full, evicted oldest entries");
        }

        evicted
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.entries.clear();
        inner.order.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner<K, V>> {
        // Entries are replaced whole, so a poisoned map is still consistent
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<K, V> Clone for ResponseCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_after_insert() {
        let cache = ResponseCache::new(4);
        cache.insert("a", 1);
        assert_eq!(cache.get(&"a"), Some(1));
        assert_eq!(cache.get(&"b"), None);
    }

    #[test]
    fn test_evicts_oldest_insertion() {
        let cache = ResponseCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        // Reading does not refresh insertion order
        assert_eq!(cache.get(&"a"), Some(1));

        let evicted = cache.insert("c", 3);
        assert_eq!(evicted, 1);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.get(&"b"), Some(2));
        assert_eq!(cache.get(&"c"), Some(3));
    }

    #[test]
    fn test_reinsert_refreshes_index() {
        let cache = ResponseCache::new(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);

        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), None);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let cache = ResponseCache::new(0);
        assert_eq!(cache.capacity(), 1);
        cache.insert("a", 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new(8);
        cache.insert(1, "x");
        cache.insert(2, "y");
        cache.clear();
        assert!(cache.is_empty());
        cache.insert(3, "z");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_shared_between_clones() {
        let cache = ResponseCache::new(8);
        let other = cache.clone();
        cache.insert("k", 7);
        assert_eq!(other.get(&"k"), Some(7));
    }
}
