//! Flat-file storage backends.
//!
//! Entities live under `{base}/{kind}/{name}@{version}.json`, one file per
//! revision, so the full version history of an entity is visible with `ls`.
//! The mapping table is one pretty-printed JSON document at
//! `{base}/mapping.json`.

use crate::error::{Result, StoreError};
use crate::{MappingStore, MappingTable, VersionedStore};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeSet;
use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use stratum_core::{Version, VersionedEntity};
use tracing::warn;

const FILE_EXTENSION: &str = "json";
const VERSION_SEPARATOR: char = '@';
const MAPPING_FILE: &str = "mapping.json";

/// Flat-file multi-version entity store.
#[derive(Debug)]
pub struct FileStore<E> {
    dir: PathBuf,
    _entity: PhantomData<fn() -> E>,
}

impl<E: VersionedEntity> FileStore<E> {
    /// Create a store rooted at `base`, ensuring the entity-kind directory
    /// exists.
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        let dir = base.as_ref().join(E::KIND);
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            _entity: PhantomData,
        })
    }

    fn entity_path(&self, name: &str, version: &Version) -> PathBuf {
        self.dir
            .join(format!("{}{}{}.{}", name, VERSION_SEPARATOR, version, FILE_EXTENSION))
    }

    /// All versions present on disk for the name, from the file listing.
    ///
    /// Files whose names do not parse as `{name}@{version}.json` are warned
    /// about and skipped, never treated as fatal.
    fn versions_on_disk(&self, name: &str) -> Result<BTreeSet<Version>> {
        let mut versions = BTreeSet::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let file_name = match file_name.to_str() {
                Some(s) => s,
                None => continue,
            };
            let stem = match file_name.strip_suffix(&format!(".{}", FILE_EXTENSION)) {
                Some(s) => s,
                None => continue,
            };
            let (entry_name, version_str) = match stem.rsplit_once(VERSION_SEPARATOR) {
                Some(parts) => parts,
                None => {
                    warn!(file = %file_name, "skipping file without a version separator");
                    continue;
                }
            };
            if entry_name != name {
                continue;
            }
            match version_str.parse::<Version>() {
                Ok(version) => {
                    versions.insert(version);
                }
                Err(_) => {
                    warn!(file = %file_name, "skipping file with unparsable version");
                }
            }
        }
        Ok(versions)
    }

    fn read_file(&self, name: &str, version: &Version) -> Result<E> {
        let path = self.entity_path(name, version);
        let payload = fs::read_to_string(&path)?;
        serde_json::from_str(&payload).map_err(|e| {
            StoreError::malformed(
                format!("cannot decode '{}': {}", path.display(), e),
                payload,
            )
        })
    }

    fn write_file(&self, entity: &E) -> Result<()> {
        let path = self.entity_path(entity.name(), entity.version());
        let payload = serde_json::to_string(entity)?;
        fs::write(path, payload)?;
        Ok(())
    }

    /// Entity names may not contain the version separator or path
    /// separators since they become file-name components.
    fn check_name(name: &str) -> Result<()> {
        if name.is_empty() || name.contains(VERSION_SEPARATOR) || name.contains(['/', '\\']) {
            return Err(StoreError::conflict(format!(
                "entity name '{}' is not storable; names may not be empty or contain '@', '/' or '\\'",
                name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: VersionedEntity> VersionedStore<E> for FileStore<E> {
    async fn create(&self, mut entity: E) -> Result<E> {
        Self::check_name(entity.name())?;
        if !self.versions_on_disk(entity.name())?.is_empty() {
            return Err(StoreError::conflict(format!(
                "entity '{}' already exists; use update to add a version",
                entity.name()
            )));
        }
        entity.mark_created(Utc::now());
        self.write_file(&entity)?;
        Ok(entity)
    }

    async fn read(&self, name: &str) -> Result<Option<E>> {
        let versions = self.versions_on_disk(name)?;
        match versions.iter().next_back() {
            Some(latest) => Ok(Some(self.read_file(name, latest)?)),
            None => Ok(None),
        }
    }

    async fn read_version(&self, name: &str, version: &Version) -> Result<Option<E>> {
        if !self.versions_on_disk(name)?.contains(version) {
            return Ok(None);
        }
        Ok(Some(self.read_file(name, version)?))
    }

    async fn update(&self, mut entity: E) -> Result<Option<E>> {
        Self::check_name(entity.name())?;
        let versions = self.versions_on_disk(entity.name())?;
        let current = match versions.iter().next_back() {
            Some(current) => current,
            None => return Ok(None),
        };
        if entity.version() <= current {
            return Err(StoreError::conflict(format!(
                "version {} of entity '{}' does not exceed current version {}",
                entity.version(),
                entity.name(),
                current
            )));
        }
        entity.mark_created(Utc::now());
        self.write_file(&entity)?;
        Ok(Some(entity))
    }

    async fn delete(&self, name: &str) -> Result<E> {
        let versions = self.versions_on_disk(name)?;
        let latest = versions
            .iter()
            .next_back()
            .ok_or_else(|| StoreError::not_found(format!("entity '{}' does not exist", name)))?;
        let removed = self.read_file(name, latest)?;
        for version in &versions {
            fs::remove_file(self.entity_path(name, version))?;
        }
        Ok(removed)
    }

    async fn delete_version(&self, name: &str, version: &Version) -> Result<E> {
        if !self.versions_on_disk(name)?.contains(version) {
            return Err(StoreError::not_found(format!(
                "version {} of entity '{}' does not exist",
                version, name
            )));
        }
        let removed = self.read_file(name, version)?;
        fs::remove_file(self.entity_path(name, version))?;
        Ok(removed)
    }

    async fn versions(&self, name: &str) -> Result<Option<BTreeSet<Version>>> {
        let versions = self.versions_on_disk(name)?;
        if versions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(versions))
        }
    }
}

/// Flat-file mapping-table store.
#[derive(Debug)]
pub struct FileMappingStore {
    path: PathBuf,
}

impl FileMappingStore {
    /// Create a store persisting to `{base}/mapping.json`.
    pub fn new(base: impl AsRef<Path>) -> Result<Self> {
        fs::create_dir_all(base.as_ref())?;
        Ok(Self {
            path: base.as_ref().join(MAPPING_FILE),
        })
    }
}

#[async_trait]
impl MappingStore for FileMappingStore {
    async fn load(&self) -> Result<MappingTable> {
        let payload = match fs::read_to_string(&self.path) {
            Ok(payload) => payload,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(MappingTable::new());
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&payload).map_err(|e| {
            StoreError::malformed(
                format!("cannot decode '{}': {}", self.path.display(), e),
                payload,
            )
        })
    }

    async fn save(&self, table: &MappingTable) -> Result<()> {
        // Pretty-printed so operators can read and diff the table directly.
        let payload = serde_json::to_string_pretty(table)?;
        fs::write(&self.path, payload)?;
        Ok(())
    }
}
