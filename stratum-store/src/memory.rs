//! In-memory storage backends, used in tests and for ephemeral deployments.

use crate::error::{Result, StoreError};
use crate::{MappingStore, MappingTable, VersionedStore};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use stratum_core::{Version, VersionedEntity};

/// In-memory multi-version entity store.
///
/// Cheap to clone; clones share the same underlying map.
pub struct MemoryStore<E> {
    entities: Arc<RwLock<HashMap<String, BTreeMap<Version, E>>>>,
}

impl<E> MemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entities: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<E> Default for MemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for MemoryStore<E> {
    fn clone(&self) -> Self {
        Self {
            entities: Arc::clone(&self.entities),
        }
    }
}

impl<E> std::fmt::Debug for MemoryStore<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entities = self.entities.read();
        f.debug_struct("MemoryStore")
            .field("names", &entities.len())
            .finish()
    }
}

#[async_trait]
impl<E: VersionedEntity> VersionedStore<E> for MemoryStore<E> {
    async fn create(&self, mut entity: E) -> Result<E> {
        let mut entities = self.entities.write();
        if entities.contains_key(entity.name()) {
            return Err(StoreError::conflict(format!(
                "entity '{}' already exists; use update to add a version",
                entity.name()
            )));
        }
        entity.mark_created(Utc::now());
        entities
            .entry(entity.name().to_string())
            .or_default()
            .insert(entity.version().clone(), entity.clone());
        Ok(entity)
    }

    async fn read(&self, name: &str) -> Result<Option<E>> {
        let entities = self.entities.read();
        Ok(entities
            .get(name)
            .and_then(|versions| versions.values().next_back().cloned()))
    }

    async fn read_version(&self, name: &str, version: &Version) -> Result<Option<E>> {
        let entities = self.entities.read();
        Ok(entities
            .get(name)
            .and_then(|versions| versions.get(version).cloned()))
    }

    async fn update(&self, mut entity: E) -> Result<Option<E>> {
        let mut entities = self.entities.write();
        let versions = match entities.get_mut(entity.name()) {
            Some(versions) => versions,
            None => return Ok(None),
        };
        if let Some(current) = versions.keys().next_back() {
            if entity.version() <= current {
                return Err(StoreError::conflict(format!(
                    "version {} of entity '{}' does not exceed current version {}",
                    entity.version(),
                    entity.name(),
                    current
                )));
            }
        }
        entity.mark_created(Utc::now());
        versions.insert(entity.version().clone(), entity.clone());
        Ok(Some(entity))
    }

    async fn delete(&self, name: &str) -> Result<E> {
        let mut entities = self.entities.write();
        let versions = entities
            .remove(name)
            .ok_or_else(|| StoreError::not_found(format!("entity '{}' does not exist", name)))?;
        versions
            .into_values()
            .next_back()
            .ok_or_else(|| StoreError::not_found(format!("entity '{}' has no versions", name)))
    }

    async fn delete_version(&self, name: &str, version: &Version) -> Result<E> {
        let mut entities = self.entities.write();
        let versions = entities
            .get_mut(name)
            .ok_or_else(|| StoreError::not_found(format!("entity '{}' does not exist", name)))?;
        let removed = versions.remove(version).ok_or_else(|| {
            StoreError::not_found(format!("version {} of entity '{}' does not exist", version, name))
        })?;
        if versions.is_empty() {
            entities.remove(name);
        }
        Ok(removed)
    }

    async fn versions(&self, name: &str) -> Result<Option<BTreeSet<Version>>> {
        let entities = self.entities.read();
        Ok(entities
            .get(name)
            .map(|versions| versions.keys().cloned().collect()))
    }
}

/// In-memory mapping-table store.
#[derive(Clone, Default)]
pub struct MemoryMappingStore {
    table: Arc<RwLock<MappingTable>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryMappingStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("MemoryMappingStore")
            .field("entries", &table.len())
            .finish()
    }
}

#[async_trait]
impl MappingStore for MemoryMappingStore {
    async fn load(&self) -> Result<MappingTable> {
        Ok(self.table.read().clone())
    }

    async fn save(&self, table: &MappingTable) -> Result<()> {
        *self.table.write() = table.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::{GroupType, PropertyGroup, ScopeSet, VersionSetRef};

    fn group(name: &str, version: &str) -> PropertyGroup {
        PropertyGroup::new(name, GroupType::App).with_version(version.parse().unwrap())
    }

    #[tokio::test]
    async fn test_create_then_read_latest() {
        let store = MemoryStore::new();
        let stored = store.create(group("pet-store", "1.0.0")).await.unwrap();
        assert!(stored.created_date.is_some());

        let read = store.read("pet-store").await.unwrap().unwrap();
        assert_eq!(read.version, "1.0.0".parse().unwrap());
        assert!(store.read("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_create_existing_name_conflicts() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();
        let err = store.create(group("pet-store", "2.0.0")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_update_requires_strictly_greater_version() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();

        let err = store.update(group("pet-store", "1.0.0")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = store.update(group("pet-store", "0.9")).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        store.update(group("pet-store", "1.0.1")).await.unwrap();
        let latest = store.read("pet-store").await.unwrap().unwrap();
        assert_eq!(latest.version, "1.0.1".parse().unwrap());
    }

    #[tokio::test]
    async fn test_update_unknown_name_is_none() {
        let store = MemoryStore::new();
        assert!(store.update(group("ghost", "1.0.0")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_is_by_numeric_version_not_write_order() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.2")).await.unwrap();
        store.update(group("pet-store", "1.0.10")).await.unwrap();
        let latest = store.read("pet-store").await.unwrap().unwrap();
        assert_eq!(latest.version, "1.0.10".parse().unwrap());
    }

    #[tokio::test]
    async fn test_read_and_delete_specific_version() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();
        store.update(group("pet-store", "2.0.0")).await.unwrap();

        let v1 = store
            .read_version("pet-store", &"1.0.0".parse().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(v1.version, "1.0.0".parse().unwrap());

        store
            .delete_version("pet-store", &"2.0.0".parse().unwrap())
            .await
            .unwrap();
        let latest = store.read("pet-store").await.unwrap().unwrap();
        assert_eq!(latest.version, "1.0.0".parse().unwrap());
    }

    #[tokio::test]
    async fn test_delete_removes_all_versions() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();
        store.update(group("pet-store", "2.0.0")).await.unwrap();

        let removed = store.delete("pet-store").await.unwrap();
        assert_eq!(removed.version, "2.0.0".parse().unwrap());
        assert!(store.read("pet-store").await.unwrap().is_none());

        let err = store.delete("pet-store").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_deleting_last_version_removes_name() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();
        store
            .delete_version("pet-store", &"1.0.0".parse().unwrap())
            .await
            .unwrap();
        assert!(store.versions("pet-store").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_versions_listing() {
        let store = MemoryStore::new();
        store.create(group("pet-store", "1.0.0")).await.unwrap();
        store.update(group("pet-store", "1.1.0")).await.unwrap();

        let versions = store.versions("pet-store").await.unwrap().unwrap();
        let listed: Vec<String> = versions.iter().map(|v| v.to_string()).collect();
        assert_eq!(listed, vec!["1.0.0", "1.1.0"]);
        assert!(store.versions("unknown").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mapping_store_round_trip() {
        let store = MemoryMappingStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let mut table = MappingTable::new();
        table.insert(
            ScopeSet::parse("application=pet-store,env=dev").unwrap(),
            VersionSetRef::new("pet-store-set", "1.0.0".parse().unwrap()),
        );
        store.save(&table).await.unwrap();
        assert_eq!(store.load().await.unwrap(), table);
    }
}
