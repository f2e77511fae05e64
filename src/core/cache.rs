use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Shared in-process cache without expiry.
///
/// Entries live until the owner calls [`Cache::invalidate`] or [`Cache::clear`];
/// clones share the same storage.
#[derive(Clone)]
pub struct Cache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, V>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn get(&self, key: &K) -> Option<V> {
        let cache = self.inner.lock().await;
        let value = cache.get(key).cloned();
        if value.is_some() {
            debug!("Cache HIT for key: {:?}", key);
        } else {
            debug!("Cache MISS for key: {:?}", key);
        }
        value
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT for key: {:?}", key);
        cache.insert(key, value);
    }

    /// Drops a single entry. Returns whether it was present.
    pub async fn invalidate(&self, key: &K) -> bool {
        let mut cache = self.inner.lock().await;
        debug!("Cache INVALIDATE for key: {:?}", key);
        cache.remove(key).is_some()
    }

    pub async fn clear(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
        debug!("Cache CLEAR");
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Send + Sync + Debug,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_get_put() {
        let cache = Cache::<String, i32>::new();

        // Initially, cache is empty
        assert!(cache.get(&"2024-03-01".to_string()).await.is_none());
        assert!(cache.is_empty().await);

        cache.put("2024-03-01".to_string(), 123).await;

        assert_eq!(cache.get(&"2024-03-01".to_string()).await, Some(123));
        assert!(cache.get(&"2024-04-01".to_string()).await.is_none());
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_cache_invalidate_and_clear() {
        let cache = Cache::<String, i32>::new();
        cache.put("a".to_string(), 1).await;
        cache.put("b".to_string(), 2).await;

        assert!(cache.invalidate(&"a".to_string()).await);
        assert!(!cache.invalidate(&"a".to_string()).await);
        assert!(cache.get(&"a".to_string()).await.is_none());
        assert_eq!(cache.get(&"b".to_string()).await, Some(2));

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_cache_clones_share_storage() {
        let cache = Cache::<String, i32>::new();
        let other = cache.clone();
        cache.put("a".to_string(), 1).await;
        assert_eq!(other.get(&"a".to_string()).await, Some(1));

        // Separately constructed caches never see each other's entries
        let fresh = Cache::<String, i32>::new();
        assert!(fresh.get(&"a".to_string()).await.is_none());
    }
}
