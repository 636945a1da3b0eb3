//! Dotted numeric version identifiers.
//!
//! Versions compare numerically component-by-component, with missing
//! trailing components treated as zero: `1.0 == 1.0.0` and
//! `1.0.2 < 1.0.10`. The original text is preserved for display and
//! persistence, so `1.0` round-trips as `1.0` even though it equals
//! `1.0.0`.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted numeric version such as `1.0.0` or `2.13`.
#[derive(Clone, Debug)]
pub struct Version {
    raw: String,
    parts: Vec<u64>,
}

impl Version {
    /// The default version assigned to newly created entities.
    pub fn initial() -> Self {
        Self {
            raw: "1.0.0".to_string(),
            parts: vec![1, 0, 0],
        }
    }

    /// The version exactly as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Numeric components, most significant first
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    /// Components with trailing zeros stripped, the canonical form that
    /// equality and hashing are defined over.
    fn significant_parts(&self) -> &[u64] {
        let mut end = self.parts.len();
        while end > 0 && self.parts[end - 1] == 0 {
            end -= 1;
        }
        &self.parts[..end]
    }
}

impl FromStr for Version {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_version("version string is empty"));
        }
        let mut parts = Vec::new();
        for component in trimmed.split('.') {
            let n: u64 = component.parse().map_err(|_| {
                Error::invalid_version(format!(
                    "version '{}' has non-numeric component '{}'",
                    trimmed, component
                ))
            })?;
            parts.push(n);
        }
        Ok(Self {
            raw: trimmed.to_string(),
            parts,
        })
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        for i in 0..len {
            let a = self.parts.get(i).copied().unwrap_or(0);
            let b = other.parts.get(i).copied().unwrap_or(0);
            match a.cmp(&b) {
                Ordering::Equal => continue,
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Must agree with Eq: 1.0 and 1.0.0 hash identically.
        self.significant_parts().hash(state);
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct VersionVisitor;

        impl Visitor<'_> for VersionVisitor {
            type Value = Version;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dotted numeric version string like '1.0.0'")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Version, E> {
                Version::from_str(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(VersionVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    #[test]
    fn test_numeric_component_ordering() {
        assert!(v("1.0.2") < v("1.0.10"));
        assert!(v("2.0") > v("1.99.99"));
        assert!(v("1.1") > v("1.0.5"));
    }

    #[test]
    fn test_missing_components_compare_as_zero() {
        assert_eq!(v("1.0"), v("1.0.0"));
        assert_eq!(v("1"), v("1.0.0.0"));
        assert!(v("1.0") < v("1.0.1"));
    }

    #[test]
    fn test_equal_versions_hash_identically() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(v("1.0"));
        assert!(set.contains(&v("1.0.0")));
    }

    #[test]
    fn test_display_preserves_raw_form() {
        assert_eq!(v("1.0").to_string(), "1.0");
        assert_eq!(v("01.2").to_string(), "01.2");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("".parse::<Version>().is_err());
        assert!("1.0-beta".parse::<Version>().is_err());
        assert!("1..0".parse::<Version>().is_err());
        assert!("a.b".parse::<Version>().is_err());
    }

    #[test]
    fn test_initial_version() {
        assert_eq!(Version::initial(), v("1.0.0"));
        assert_eq!(Version::initial().to_string(), "1.0.0");
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&v("1.0.1")).unwrap();
        assert_eq!(json, "\"1.0.1\"");
        let back: Version = serde_json::from_str(&json).unwrap();
        assert_eq!(back, v("1.0.1"));
    }
}
