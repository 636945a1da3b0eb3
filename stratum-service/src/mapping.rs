//! The scope-to-version-set mapping service.
//!
//! Holds the mapping table in memory for lock-free-ish reads and persists
//! every mutation whole through a [`MappingStore`]. Mutations are
//! serialized behind a single async mutex: the table is small and written
//! rarely, so a single-writer model is simpler and strictly safer than
//! merging concurrent read-modify-write cycles.

use crate::error::{Result, ServiceError};
use parking_lot::RwLock;
use stratum_core::{resolve_with, PrecedenceConfiguration, Scope, ScopeSet, VersionSetRef};
use stratum_store::{MappingStore, MappingTable};
use tokio::sync::Mutex;
use tracing::debug;

/// The synthetic scope key carrying the application name in mapping keys
/// and queries.
pub const APPLICATION_SCOPE_KEY: &str = "application";

/// Resolves and maintains scope-to-version-set bindings.
pub struct MappingService<M> {
    store: M,
    precedence: PrecedenceConfiguration,
    table: RwLock<MappingTable>,
    write_lock: Mutex<()>,
}

impl<M> std::fmt::Debug for MappingService<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappingService")
            .field("entries", &self.table.read().len())
            .finish()
    }
}

impl<M: MappingStore> MappingService<M> {
    /// Load the persisted table and start serving from it.
    pub async fn load(store: M, precedence: PrecedenceConfiguration) -> Result<Self> {
        let table = store.load().await?;
        debug!(entries = table.len(), "loaded mapping table");
        Ok(Self {
            store,
            precedence,
            table: RwLock::new(table),
            write_lock: Mutex::new(()),
        })
    }

    /// The precedence configuration this service resolves against.
    pub fn precedence(&self) -> &PrecedenceConfiguration {
        &self.precedence
    }

    /// Build a mapping key: the given scopes plus, when present, the
    /// synthetic application scope.
    fn mapping_key(application: Option<&str>, scopes: &ScopeSet) -> Result<ScopeSet> {
        match application {
            Some(application) => {
                Ok(scopes.with(Scope::new(APPLICATION_SCOPE_KEY, application)?))
            }
            None => Ok(scopes.clone()),
        }
    }

    /// The version-set bound to the most specific matching scope
    /// combination for this application, if any.
    ///
    /// The query is the caller's scopes plus the synthetic application
    /// scope; an entry stored under exactly that full set short-circuits
    /// tier iteration.
    pub fn find_match(&self, application: &str, scopes: &ScopeSet) -> Result<Option<VersionSetRef>> {
        let query = Self::mapping_key(Some(application), scopes)?;
        let table = self.table.read();

        if let Some(target) = table.get(&query) {
            return Ok(Some(target.clone()));
        }

        Ok(resolve_with(&query, &self.precedence, |key| table.get(key))
            .map(|m| m.value.clone()))
    }

    /// Bind a scope combination to a version-set, replacing any existing
    /// binding for that exact combination, and persist the whole table.
    pub async fn set_mapping(
        &self,
        application: Option<&str>,
        scopes: &ScopeSet,
        target: VersionSetRef,
    ) -> Result<()> {
        let key = Self::mapping_key(application, scopes)?;
        let _writer = self.write_lock.lock().await;

        let mut next = self.table.read().clone();
        next.insert(key.clone(), target.clone());
        self.store.save(&next).await?;
        // The in-memory table only changes once the save has succeeded.
        *self.table.write() = next;
        debug!(key = %key, target = %target, "mapping set");
        Ok(())
    }

    /// Remove the binding for an exact scope combination, returning the
    /// removed target. Absence is an error here: the caller addressed a
    /// specific entry.
    pub async fn delete_mapping(
        &self,
        application: Option<&str>,
        scopes: &ScopeSet,
    ) -> Result<VersionSetRef> {
        let key = Self::mapping_key(application, scopes)?;
        let _writer = self.write_lock.lock().await;

        let mut next = self.table.read().clone();
        let removed = next.remove(&key).ok_or_else(|| {
            ServiceError::not_found(format!("no mapping exists for scope set '{}'", key))
        })?;
        self.store.save(&next).await?;
        *self.table.write() = next;
        debug!(key = %key, "mapping deleted");
        Ok(removed)
    }

    /// The raw, unresolved table.
    pub fn all_mappings(&self) -> MappingTable {
        self.table.read().clone()
    }
}
