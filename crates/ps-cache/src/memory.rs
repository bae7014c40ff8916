//! In-memory descriptor cache
//!
//! Lists are stored behind `Arc` so a `get` only clones a pointer while
//! holding the lock, and a `set` only swaps one.

use crate::{CacheKey, DescriptorStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ps_core::Descriptor;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone)]
struct CacheEntry {
    descriptors: Arc<Vec<Descriptor>>,
    updated_at: DateTime<Utc>,
}

/// Cache statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub writes: u64,
}

#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    stats: RwLock<CacheStats>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn stats(&self) -> CacheStats {
        self.stats.read().await.clone()
    }
}

#[async_trait]
impl DescriptorStore for MemoryCache {
    async fn get(&self, key: CacheKey) -> Option<Arc<Vec<Descriptor>>> {
        let found = self
            .entries
            .read()
            .await
            .get(&key)
            .map(|entry| entry.descriptors.clone());

        let mut stats = self.stats.write().await;
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        found
    }

    async fn set(&self, key: CacheKey, descriptors: Vec<Descriptor>) {
        let count = descriptors.len();
        let entry = CacheEntry {
            descriptors: Arc::new(descriptors),
            updated_at: Utc::now(),
        };

        self.entries.write().await.insert(key, entry);
        self.stats.write().await.writes += 1;
        debug!("Cache entry '{}' replaced with {} descriptors", key, count);
    }

    async fn updated_at(&self, key: CacheKey) -> Option<DateTime<Utc>> {
        self.entries
            .read()
            .await
            .get(&key)
            .map(|entry| entry.updated_at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(user: &str) -> Descriptor {
        Descriptor::parse(&format!("vless://{}@1.2.3.4:443?security=tls#{}", user, user)).unwrap()
    }

    #[tokio::test]
    async fn test_get_unset_key() {
        let cache = MemoryCache::new();
        assert!(cache.get(CacheKey::All).await.is_none());
        assert!(cache.updated_at(CacheKey::All).await.is_none());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let cache = MemoryCache::new();
        cache.set(CacheKey::All, vec![descriptor("a"), descriptor("b")]).await;
        cache.set(CacheKey::Available, vec![descriptor("a")]).await;

        assert_eq!(cache.get(CacheKey::All).await.unwrap().len(), 2);
        assert_eq!(cache.get(CacheKey::Available).await.unwrap().len(), 1);
        assert!(cache.updated_at(CacheKey::Available).await.is_some());
    }

    #[tokio::test]
    async fn test_set_replaces_wholesale() {
        let cache = MemoryCache::new();
        cache.set(CacheKey::All, vec![descriptor("a"), descriptor("b")]).await;

        let before = cache.get(CacheKey::All).await.unwrap();
        cache.set(CacheKey::All, vec![descriptor("c")]).await;
        let after = cache.get(CacheKey::All).await.unwrap();

        // Earlier snapshots stay intact
        assert_eq!(before.len(), 2);
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].label().text(), "c");
    }

    #[tokio::test]
    async fn test_concurrent_readers_see_whole_lists() {
        let cache = Arc::new(MemoryCache::new());
        let sizes = [1usize, 5, 10];

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move {
                for round in 0..50 {
                    let n = sizes[round % sizes.len()];
                    let list = (0..n).map(|i| descriptor(&format!("u{}", i))).collect();
                    cache.set(CacheKey::Available, list).await;
                }
            })
        };

        for _ in 0..50 {
            if let Some(list) = cache.get(CacheKey::Available).await {
                assert!(sizes.contains(&list.len()));
            }
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_stats() {
        let cache = MemoryCache::new();
        cache.get(CacheKey::All).await;
        cache.set(CacheKey::All, vec![]).await;
        cache.get(CacheKey::All).await;

        let stats = cache.stats().await;
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.writes, 1);
    }
}
