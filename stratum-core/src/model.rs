//! Domain model: properties, property groups, version sets, and the
//! versioned-entity trait shared by everything the stores persist.

use crate::error::{Error, Result};
use crate::resolve::ScopedValue;
use crate::scope::ScopeSet;
use crate::version::Version;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The declared value type of a property.
///
/// Scoped override values and the default value must all parse as this
/// type; validation happens at model-construction time so stored groups
/// are well-typed by construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PropertyType {
    String,
    Boolean,
    Integer,
    Long,
    Double,
    Float,
}

impl PropertyType {
    /// Whether the given textual value is a valid instance of this type.
    pub fn validates(&self, value: &str) -> bool {
        match self {
            PropertyType::String => true,
            PropertyType::Boolean => {
                value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("false")
            }
            PropertyType::Integer => value.parse::<i32>().is_ok(),
            PropertyType::Long => value.parse::<i64>().is_ok(),
            PropertyType::Double => value.parse::<f64>().is_ok(),
            PropertyType::Float => value.parse::<f32>().is_ok(),
        }
    }
}

/// Whether a property group describes an application or a shared library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GroupType {
    App,
    Lib,
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupType::App => f.write_str("APP"),
            GroupType::Lib => f.write_str("LIB"),
        }
    }
}

/// A named configuration property with an optional default and any number
/// of scoped override values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    pub property_type: PropertyType,
    #[serde(default)]
    pub scoped_values: Vec<ScopedValue<String>>,
}

impl Property {
    /// Create a property with no default and no scoped values.
    pub fn new(name: impl Into<String>, property_type: PropertyType) -> Self {
        Self {
            name: name.into(),
            description: None,
            default_value: None,
            property_type,
            scoped_values: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the default value, validating it against the property type.
    pub fn with_default_value(mut self, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        self.check_typed(&value)?;
        self.default_value = Some(value);
        Ok(self)
    }

    /// Add a scoped override value.
    ///
    /// Fails when the value does not parse as the property type or when a
    /// value is already bound to the same scope set.
    pub fn with_scoped_value(mut self, scope_set: ScopeSet, value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        self.check_typed(&value)?;
        if self.scoped_values.iter().any(|sv| sv.scope_set == scope_set) {
            return Err(Error::validation(format!(
                "property '{}' already has a value for scope set '{}'",
                self.name, scope_set
            )));
        }
        self.scoped_values.push(ScopedValue::new(scope_set, value));
        Ok(self)
    }

    fn check_typed(&self, value: &str) -> Result<()> {
        if self.property_type.validates(value) {
            Ok(())
        } else {
            Err(Error::validation(format!(
                "value '{}' for property '{}' is not a valid {:?}",
                value, self.name, self.property_type
            )))
        }
    }
}

/// A named, versioned collection of properties.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGroup {
    pub name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub group_type: GroupType,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub properties: Vec<Property>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

fn default_active() -> bool {
    true
}

impl PropertyGroup {
    /// Create an active group at the initial version with no properties.
    pub fn new(name: impl Into<String>, group_type: GroupType) -> Self {
        Self {
            name: name.into(),
            version: Version::initial(),
            description: None,
            group_type,
            is_active: true,
            properties: Vec::new(),
            created_by: None,
            created_date: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Add a property, rejecting duplicate property names within the group.
    pub fn with_property(mut self, property: Property) -> Result<Self> {
        if self.properties.iter().any(|p| p.name == property.name) {
            return Err(Error::validation(format!(
                "property group '{}' already contains a property named '{}'",
                self.name, property.name
            )));
        }
        self.properties.push(property);
        Ok(self)
    }

    /// A reference to this group at its current version.
    pub fn to_ref(&self) -> PropertyGroupRef {
        PropertyGroupRef {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// A (name, version) pointer to a property group.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyGroupRef {
    pub name: String,
    pub version: Version,
}

impl PropertyGroupRef {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PropertyGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A named, versioned bundle of property-group references.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSet {
    pub name: String,
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub property_group_refs: Vec<PropertyGroupRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

impl VersionSet {
    /// Create a version set at the initial version with no references.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Version::initial(),
            description: None,
            property_group_refs: Vec::new(),
            created_by: None,
            created_date: None,
        }
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    /// Add a group reference, rejecting a second reference to the same
    /// group name.
    pub fn with_group_ref(mut self, group_ref: PropertyGroupRef) -> Result<Self> {
        if self
            .property_group_refs
            .iter()
            .any(|r| r.name == group_ref.name)
        {
            return Err(Error::validation(format!(
                "version set '{}' already references property group '{}'",
                self.name, group_ref.name
            )));
        }
        self.property_group_refs.push(group_ref);
        Ok(self)
    }

    /// A reference to this version set at its current version.
    pub fn to_ref(&self) -> VersionSetRef {
        VersionSetRef {
            name: self.name.clone(),
            version: self.version.clone(),
        }
    }
}

/// A (name, version) pointer to a version set, the value side of the
/// scope-to-bundle mapping table.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionSetRef {
    pub name: String,
    pub version: Version,
}

impl VersionSetRef {
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for VersionSetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Common shape of everything the versioned stores persist.
pub trait VersionedEntity:
    Clone + Serialize + for<'de> Deserialize<'de> + Send + Sync + 'static
{
    /// Storage namespace for this entity kind (a directory name in the
    /// file store).
    const KIND: &'static str;

    fn name(&self) -> &str;

    fn version(&self) -> &Version;

    /// Stamp the creation timestamp if not already set. Called by stores
    /// when an entity is first persisted.
    fn mark_created(&mut self, now: DateTime<Utc>);
}

impl VersionedEntity for PropertyGroup {
    const KIND: &'static str = "property-group";

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        if self.created_date.is_none() {
            self.created_date = Some(now);
        }
    }
}

impl VersionedEntity for VersionSet {
    const KIND: &'static str = "version-set";

    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &Version {
        &self.version
    }

    fn mark_created(&mut self, now: DateTime<Utc>) {
        if self.created_date.is_none() {
            self.created_date = Some(now);
        }
    }
}
