//! Read-through LRU caching layer over any versioned store.
//!
//! Resolution traffic is read-heavy against a small working set of groups
//! and version sets, so a bounded LRU in front of the file store removes
//! almost all disk reads. Writes go straight through to the inner store and
//! then fix up the cache, so a cached read never returns stale data written
//! through this same handle. An optional TTL bounds staleness for
//! deployments where several processes share one backing directory.

use crate::error::Result;
use crate::VersionedStore;
use async_trait::async_trait;
use lru::LruCache;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use stratum_core::{Version, VersionedEntity};
use tokio::sync::RwLock;

struct CacheEntry<E> {
    value: E,
    inserted: Instant,
}

impl<E: Clone> CacheEntry<E> {
    fn new(value: E) -> Self {
        Self {
            value,
            inserted: Instant::now(),
        }
    }

    fn live(&self, ttl: Option<Duration>) -> Option<E> {
        match ttl {
            Some(ttl) if self.inserted.elapsed() >= ttl => None,
            _ => Some(self.value.clone()),
        }
    }
}

/// A bounded read-through cache wrapping another [`VersionedStore`].
pub struct CachedStore<E, S> {
    inner: S,
    // Latest-by-name and exact-revision entries are cached separately; a
    // "latest" answer cannot serve a specific-version request or vice versa.
    by_name: RwLock<LruCache<String, CacheEntry<E>>>,
    by_revision: RwLock<LruCache<(String, Version), CacheEntry<E>>>,
    ttl: Option<Duration>,
}

impl<E: VersionedEntity, S: VersionedStore<E>> CachedStore<E, S> {
    /// Wrap `inner` with caches holding up to `capacity` entries each.
    pub fn new(inner: S, capacity: NonZeroUsize) -> Self {
        Self {
            inner,
            by_name: RwLock::new(LruCache::new(capacity)),
            by_revision: RwLock::new(LruCache::new(capacity)),
            ttl: None,
        }
    }

    /// As [`CachedStore::new`], with entries expiring after `ttl`.
    pub fn with_ttl(inner: S, capacity: NonZeroUsize, ttl: Duration) -> Self {
        Self {
            ttl: Some(ttl),
            ..Self::new(inner, capacity)
        }
    }

    async fn remember(&self, entity: &E) {
        self.by_name
            .write()
            .await
            .put(entity.name().to_string(), CacheEntry::new(entity.clone()));
        self.by_revision.write().await.put(
            (entity.name().to_string(), entity.version().clone()),
            CacheEntry::new(entity.clone()),
        );
    }

    async fn forget_name(&self, name: &str) {
        self.by_name.write().await.pop(name);
        let mut by_revision = self.by_revision.write().await;
        let stale: Vec<(String, Version)> = by_revision
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            by_revision.pop(&key);
        }
    }
}

#[async_trait]
impl<E: VersionedEntity, S: VersionedStore<E>> VersionedStore<E> for CachedStore<E, S> {
    async fn create(&self, entity: E) -> Result<E> {
        let stored = self.inner.create(entity).await?;
        self.remember(&stored).await;
        Ok(stored)
    }

    async fn read(&self, name: &str) -> Result<Option<E>> {
        if let Some(entry) = self.by_name.write().await.get(name) {
            if let Some(value) = entry.live(self.ttl) {
                return Ok(Some(value));
            }
        }
        let loaded = self.inner.read(name).await?;
        if let Some(entity) = &loaded {
            self.by_name
                .write()
                .await
                .put(name.to_string(), CacheEntry::new(entity.clone()));
        }
        Ok(loaded)
    }

    async fn read_version(&self, name: &str, version: &Version) -> Result<Option<E>> {
        let key = (name.to_string(), version.clone());
        if let Some(entry) = self.by_revision.write().await.get(&key) {
            if let Some(value) = entry.live(self.ttl) {
                return Ok(Some(value));
            }
        }
        let loaded = self.inner.read_version(name, version).await?;
        if let Some(entity) = &loaded {
            self.by_revision
                .write()
                .await
                .put(key, CacheEntry::new(entity.clone()));
        }
        Ok(loaded)
    }

    async fn update(&self, entity: E) -> Result<Option<E>> {
        let stored = self.inner.update(entity).await?;
        if let Some(entity) = &stored {
            // The updated revision is strictly newer, so it is the latest.
            self.remember(entity).await;
        }
        Ok(stored)
    }

    async fn delete(&self, name: &str) -> Result<E> {
        let removed = self.inner.delete(name).await?;
        self.forget_name(name).await;
        Ok(removed)
    }

    async fn delete_version(&self, name: &str, version: &Version) -> Result<E> {
        let removed = self.inner.delete_version(name, version).await?;
        // Dropping a revision may change which version is latest.
        self.forget_name(name).await;
        Ok(removed)
    }

    async fn versions(&self, name: &str) -> Result<Option<BTreeSet<Version>>> {
        self.inner.versions(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use stratum_core::{GroupType, PropertyGroup};

    fn group(name: &str, version: &str) -> PropertyGroup {
        PropertyGroup::new(name, GroupType::App).with_version(version.parse().unwrap())
    }

    fn cap(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_read_is_served_from_cache_after_backing_delete() {
        let inner = MemoryStore::new();
        let cached = CachedStore::new(inner.clone(), cap(8));

        cached.create(group("pet-store", "1.0.0")).await.unwrap();
        inner.delete("pet-store").await.unwrap();

        // Still cached; the backing store no longer has it.
        let read = cached.read("pet-store").await.unwrap().unwrap();
        assert_eq!(read.version, "1.0.0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_update_through_cache_is_immediately_visible() {
        let cached = CachedStore::new(MemoryStore::new(), cap(8));
        cached.create(group("pet-store", "1.0.0")).await.unwrap();
        cached.update(group("pet-store", "2.0.0")).await.unwrap();

        let read = cached.read("pet-store").await.unwrap().unwrap();
        assert_eq!(read.version, "2.0.0".parse().unwrap());
        let v1 = cached
            .read_version("pet-store", &"1.0.0".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v1.version, "1.0.0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_delete_evicts_all_entries_for_name() {
        let cached = CachedStore::new(MemoryStore::new(), cap(8));
        cached.create(group("pet-store", "1.0.0")).await.unwrap();
        cached.update(group("pet-store", "2.0.0")).await.unwrap();

        cached.delete("pet-store").await.unwrap();
        assert!(cached.read("pet-store").await.unwrap().is_none());
        assert!(cached
            .read_version("pet-store", &"1.0.0".parse().unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_delete_version_refreshes_latest() {
        let cached = CachedStore::new(MemoryStore::new(), cap(8));
        cached.create(group("pet-store", "1.0.0")).await.unwrap();
        cached.update(group("pet-store", "2.0.0")).await.unwrap();

        cached
            .delete_version("pet-store", &"2.0.0".parse().unwrap())
            .await
            .unwrap();
        let latest = cached.read("pet-store").await.unwrap().unwrap();
        assert_eq!(latest.version, "1.0.0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_fall_through_to_inner() {
        let inner = MemoryStore::new();
        // Zero TTL: every entry is expired on arrival.
        let cached = CachedStore::with_ttl(inner.clone(), cap(8), Duration::ZERO);

        cached.create(group("pet-store", "1.0.0")).await.unwrap();
        inner.delete("pet-store").await.unwrap();
        inner.create(group("pet-store", "3.0.0")).await.unwrap();

        let read = cached.read("pet-store").await.unwrap().unwrap();
        assert_eq!(read.version, "3.0.0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_capacity_bounds_the_cache() {
        let inner = MemoryStore::new();
        let cached = CachedStore::new(inner.clone(), cap(1));

        cached.create(group("a", "1.0.0")).await.unwrap();
        cached.create(group("b", "1.0.0")).await.unwrap();
        inner.delete("a").await.unwrap();

        // "a" was evicted by "b", so the read goes to the inner store.
        assert!(cached.read("a").await.unwrap().is_none());
    }
}
