//! Effective-configuration search: from (application, scopes) to a rendered
//! properties document.
//!
//! The pipeline is mapping lookup, version-set load, property-group loads,
//! then per-property scope resolution. Output is the line-oriented
//! `key=value` format with a `#` comment block per property naming the
//! contributing group and the matched scope, plus a leading block naming
//! the version-set itself.

use crate::error::{Result, ServiceError};
use crate::mapping::MappingService;
use std::sync::Arc;
use stratum_core::{
    resolve, GroupType, PrecedenceConfiguration, PropertyGroup, ScopeSet, Version, VersionSet,
};
use stratum_store::{MappingStore, VersionedStore};
use tracing::warn;

/// Diagnostic scope label for a property served from its default value.
const DEFAULT_SCOPE_LABEL: &str = "default";

/// One resolved property in the effective configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectiveProperty {
    pub name: String,
    /// Resolved scoped value, or the default; `None` when the property has
    /// neither for this query.
    pub value: Option<String>,
    /// The matched scope label (`env=dev&region=r1`) or `default`.
    pub scope_label: String,
    pub group_name: String,
    pub group_description: Option<String>,
    pub group_type: GroupType,
}

/// The structured result of a search, before text rendering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConfiguration {
    pub version_set_name: String,
    pub version_set_version: Version,
    pub version_set_description: Option<String>,
    /// First-seen order: application groups before library groups, groups
    /// in reference order, properties in declaration order.
    pub properties: Vec<EffectiveProperty>,
}

/// Searches the mapping and renders effective configuration documents.
pub struct SearchService<G, V, M> {
    groups: G,
    version_sets: V,
    mapping: Arc<MappingService<M>>,
    precedence: PrecedenceConfiguration,
}

impl<G, V, M> SearchService<G, V, M>
where
    G: VersionedStore<PropertyGroup>,
    V: VersionedStore<VersionSet>,
    M: MappingStore,
{
    pub fn new(groups: G, version_sets: V, mapping: Arc<MappingService<M>>) -> Self {
        let precedence = mapping.precedence().clone();
        Self {
            groups,
            version_sets,
            mapping,
            precedence,
        }
    }

    /// Find and render the effective configuration for an application under
    /// the given scope string.
    ///
    /// `libs` is a comma-separated allow-list of library group names; when
    /// absent, no library groups are included. Returns `Ok(None)` when no
    /// mapping matches the query.
    pub async fn find_properties(
        &self,
        application: &str,
        scope_string: &str,
        libs: Option<&str>,
    ) -> Result<Option<String>> {
        let scopes = ScopeSet::parse(scope_string)?;
        let libs: Vec<String> = libs
            .map(|l| {
                l.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        match self.resolve_configuration(application, &scopes, &libs).await? {
            Some(config) => Ok(Some(render(&config))),
            None => Ok(None),
        }
    }

    /// Structured variant of [`SearchService::find_properties`].
    pub async fn resolve_configuration(
        &self,
        application: &str,
        scopes: &ScopeSet,
        libs: &[String],
    ) -> Result<Option<ResolvedConfiguration>> {
        let target = match self.mapping.find_match(application, scopes)? {
            Some(target) => target,
            None => return Ok(None),
        };

        let version_set = match self
            .version_sets
            .read_version(&target.name, &target.version)
            .await?
        {
            Some(version_set) => version_set,
            None => {
                // A mapping pointing at a deleted bundle is an operator
                // problem, not a caller problem; answer "no configuration".
                warn!(target = %target, "mapping references a missing version set");
                return Ok(None);
            }
        };

        let groups = self.load_groups(&version_set, libs).await?;
        let properties = self.resolve_properties(&groups, scopes);

        Ok(Some(ResolvedConfiguration {
            version_set_name: version_set.name,
            version_set_version: version_set.version,
            version_set_description: version_set.description,
            properties,
        }))
    }

    /// Load the referenced groups: active application groups in reference
    /// order, then active library groups passing the allow-list.
    async fn load_groups(
        &self,
        version_set: &VersionSet,
        libs: &[String],
    ) -> Result<Vec<PropertyGroup>> {
        let mut loaded = Vec::with_capacity(version_set.property_group_refs.len());
        for group_ref in &version_set.property_group_refs {
            let group = self
                .groups
                .read_version(&group_ref.name, &group_ref.version)
                .await?
                .ok_or_else(|| {
                    ServiceError::not_found(format!(
                        "property group '{}' referenced by version set '{}' does not exist",
                        group_ref, version_set.name
                    ))
                })?;
            loaded.push(group);
        }

        let mut groups = Vec::with_capacity(loaded.len());
        groups.extend(
            loaded
                .iter()
                .filter(|g| g.is_active && g.group_type == GroupType::App)
                .cloned(),
        );
        groups.extend(
            loaded
                .iter()
                .filter(|g| {
                    g.is_active
                        && g.group_type == GroupType::Lib
                        && libs.iter().any(|l| l == &g.name)
                })
                .cloned(),
        );
        Ok(groups)
    }

    /// Resolve every property across the groups, first-seen-wins by name.
    fn resolve_properties(
        &self,
        groups: &[PropertyGroup],
        scopes: &ScopeSet,
    ) -> Vec<EffectiveProperty> {
        let mut seen: Vec<&str> = Vec::new();
        let mut effective = Vec::new();

        for group in groups {
            for property in &group.properties {
                if seen.contains(&property.name.as_str()) {
                    continue;
                }
                seen.push(&property.name);

                let (scope_label, value) =
                    match resolve(scopes, &property.scoped_values, &self.precedence) {
                        Some(m) => (m.scope_set.label(), Some(m.value.clone())),
                        None => (DEFAULT_SCOPE_LABEL.to_string(), property.default_value.clone()),
                    };

                effective.push(EffectiveProperty {
                    name: property.name.clone(),
                    value,
                    scope_label,
                    group_name: group.name.clone(),
                    group_description: group.description.clone(),
                    group_type: group.group_type,
                });
            }
        }
        effective
    }
}

/// Render a resolved configuration into the flat properties text format.
fn render(config: &ResolvedConfiguration) -> String {
    let mut out = String::new();
    out.push_str(&format!("# version-set name: {}\n", config.version_set_name));
    out.push_str(&format!("# version:{}\n", config.version_set_version));
    out.push_str(&format!("# name:{}\n", config.version_set_name));
    out.push_str(&format!(
        "# description:{}\n",
        config.version_set_description.as_deref().unwrap_or("")
    ));
    out.push('\n');

    for property in &config.properties {
        out.push_str(&format!("# property group name: {}\n", property.group_name));
        out.push_str(&format!(
            "# property group description: {}\n",
            property.group_description.as_deref().unwrap_or("")
        ));
        out.push_str(&format!("# scope: {}\n", property.scope_label));
        out.push_str(&format!("# type: {}\n", property.group_type));
        out.push_str(&format!(
            "{}={}\n",
            property.name,
            property.value.as_deref().unwrap_or("")
        ));
        out.push('\n');
    }
    out
}
