//! Persistence backends for Stratum.
//!
//! Two storage contracts live here:
//!
//! - [`VersionedStore`]: keyed, multi-version CRUD over any
//!   [`VersionedEntity`] (property groups, version sets). Every write of an
//!   existing name must carry a strictly greater version; history is kept
//!   and individually addressable.
//! - [`MappingStore`]: whole-table persistence for the scope-to-version-set
//!   mapping. The table is small and read-mostly, so it is loaded and saved
//!   as one document.
//!
//! Implementations: [`MemoryStore`] / [`MemoryMappingStore`] for tests and
//! ephemeral deployments, [`FileStore`] / [`FileMappingStore`] for flat-file
//! persistence, and [`CachedStore`] as a read-through LRU layer over any
//! versioned store.

pub mod cache;
pub mod error;
pub mod file;
pub mod memory;

pub use cache::CachedStore;
pub use error::{Result, StoreError};
pub use file::{FileMappingStore, FileStore};
pub use memory::{MemoryMappingStore, MemoryStore};

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use stratum_core::{ScopeSet, Version, VersionSetRef, VersionedEntity};

/// The scope-to-version-set mapping table.
///
/// Keys are exact scope sets; values point at the version-set bundle served
/// for that scope combination.
pub type MappingTable = BTreeMap<ScopeSet, VersionSetRef>;

/// Multi-version CRUD over named entities.
///
/// "Latest" always means highest version by numeric comparison, never most
/// recently written.
#[async_trait]
pub trait VersionedStore<E: VersionedEntity>: Send + Sync {
    /// Persist a new entity. Fails with [`StoreError::Conflict`] when any
    /// version of the name already exists. Stamps the creation timestamp
    /// and returns the stored entity.
    async fn create(&self, entity: E) -> Result<E>;

    /// The latest version of the named entity, or `None` if the name is
    /// unknown.
    async fn read(&self, name: &str) -> Result<Option<E>>;

    /// One specific version of the named entity.
    async fn read_version(&self, name: &str, version: &Version) -> Result<Option<E>>;

    /// Persist a new version of an existing entity.
    ///
    /// Returns `Ok(None)` when the name is unknown. Fails with
    /// [`StoreError::Conflict`] unless the entity's version is strictly
    /// greater than the current latest. On success returns the stored
    /// entity.
    async fn update(&self, entity: E) -> Result<Option<E>>;

    /// Remove all versions of the named entity, returning the latest that
    /// was removed. Fails with [`StoreError::NotFound`] when the name is
    /// unknown.
    async fn delete(&self, name: &str) -> Result<E>;

    /// Remove one specific version, returning it. Fails with
    /// [`StoreError::NotFound`] when absent.
    async fn delete_version(&self, name: &str, version: &Version) -> Result<E>;

    /// All stored versions of the named entity in ascending order, or
    /// `None` if the name is unknown.
    async fn versions(&self, name: &str) -> Result<Option<BTreeSet<Version>>>;
}

/// Whole-table persistence for the mapping.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Load the table. A backend with no saved table yet returns an empty
    /// one, not an error.
    async fn load(&self) -> Result<MappingTable>;

    /// Replace the saved table.
    async fn save(&self, table: &MappingTable) -> Result<()>;
}
