//! Scope and scope-set model plus scope-string parsing.
//!
//! A scope is one contextual dimension of a deployment, expressed as a
//! key/value pair (e.g. `env=prod`). A scope set holds at most one scope per
//! key; its key set is what precedence matching operates on.
//!
//! Scope strings use the `key1=value1,key2=value2` wire syntax. Parsing is
//! centralized here so every caller applies the same charset and delimiter
//! rules.

use crate::error::{Error, Result};
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Default delimiter between scopes in a scope string.
pub const SCOPE_DELIMITER: char = ',';

/// Separator between a scope key and its value.
pub const SCOPE_EQUALS: char = '=';

/// One contextual dimension/value pair (e.g. `env=prod`).
///
/// Keys and values are non-empty and restricted to `[A-Za-z0-9_.-]`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Scope {
    key: String,
    value: String,
}

impl Scope {
    /// Create a scope, validating the key and value charset.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        let key = key.into();
        let value = value.into();
        validate_token(&key).map_err(|_| {
            Error::invalid_scope(format!("scope key '{}' is empty or contains invalid characters", key))
        })?;
        validate_token(&value).map_err(|_| {
            Error::invalid_scope(format!(
                "scope value '{}' for key '{}' is empty or contains invalid characters",
                value, key
            ))
        })?;
        Ok(Self { key, value })
    }

    /// The scope key (dimension name)
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The scope value
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.key, SCOPE_EQUALS, self.value)
    }
}

/// A set of scopes with unique keys.
///
/// Backed by an ordered map so that equality, hashing, and the serialized
/// form are all independent of insertion order. Serializes as its canonical
/// scope string (`k1=v1,k2=v2`, keys sorted), which keeps persisted mapping
/// tables readable as plain JSON objects.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeSet {
    entries: BTreeMap<String, String>,
}

impl ScopeSet {
    /// Create an empty scope set
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a scope set from individual scopes.
    ///
    /// Fails if two scopes share a key.
    pub fn from_scopes(scopes: impl IntoIterator<Item = Scope>) -> Result<Self> {
        let mut set = Self::new();
        for scope in scopes {
            set.insert(scope)?;
        }
        Ok(set)
    }

    /// Parse a scope string using the default `,` delimiter.
    ///
    /// An empty or all-whitespace input yields an empty set.
    pub fn parse(scope_string: &str) -> Result<Self> {
        Self::parse_with_delimiter(scope_string, SCOPE_DELIMITER)
    }

    /// Parse a scope string with an explicit delimiter.
    ///
    /// Each segment must be exactly `key=value`; a malformed segment fails
    /// with a parse error naming that segment.
    pub fn parse_with_delimiter(scope_string: &str, delimiter: char) -> Result<Self> {
        let trimmed = scope_string.trim();
        if trimmed.is_empty() {
            return Ok(Self::new());
        }

        let mut set = Self::new();
        for segment in trimmed.split(delimiter) {
            let mut parts = segment.split(SCOPE_EQUALS);
            let scope = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => Scope::new(key, value).map_err(|_| {
                    Error::parse(format!(
                        "incorrect format of scope string segment '{}'; expected key=value with keys and values matching [A-Za-z0-9_.-]+",
                        segment
                    ))
                })?,
                _ => {
                    return Err(Error::parse(format!(
                        "incorrect format of scope string segment '{}'; expected exactly one '=' per segment",
                        segment
                    )))
                }
            };
            set.insert(scope)?;
        }
        Ok(set)
    }

    /// Insert a scope, failing if its key is already present.
    pub fn insert(&mut self, scope: Scope) -> Result<()> {
        if self.entries.contains_key(&scope.key) {
            return Err(Error::invalid_scope(format!(
                "duplicate scope key '{}' in scope set",
                scope.key
            )));
        }
        self.entries.insert(scope.key, scope.value);
        Ok(())
    }

    /// Return a copy with the given scope inserted, replacing any existing
    /// scope under the same key.
    ///
    /// Used to union synthetic scopes (the `application` scope) into a query
    /// set; a caller-supplied scope under the same key is overridden.
    pub fn with(&self, scope: Scope) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(scope.key, scope.value);
        Self { entries }
    }

    /// Number of scopes in the set
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for a key, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether the set contains a scope with the given key
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Whether the set contains scopes for all of the given keys
    pub fn contains_all_keys<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> bool {
        keys.into_iter().all(|k| self.entries.contains_key(k))
    }

    /// The set of keys present
    pub fn key_set(&self) -> BTreeSet<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterate over (key, value) pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// The sub-set of this scope set restricted to exactly the given keys.
    pub fn restrict(&self, keys: &BTreeSet<String>) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(k, _)| keys.contains(*k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self { entries }
    }

    /// Canonical scope string (`k1=v1,k2=v2`, keys sorted).
    pub fn to_scope_string(&self) -> String {
        self.join(SCOPE_DELIMITER)
    }

    /// Diagnostic label (`k1=v1&k2=v2`), as emitted in rendered properties
    /// output.
    pub fn label(&self) -> String {
        self.join('&')
    }

    fn join(&self, separator: char) -> String {
        let mut out = String::new();
        for (i, (k, v)) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(separator);
            }
            out.push_str(k);
            out.push(SCOPE_EQUALS);
            out.push_str(v);
        }
        out
    }
}

impl fmt::Display for ScopeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_scope_string())
    }
}

impl Serialize for ScopeSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_scope_string())
    }
}

impl<'de> Deserialize<'de> for ScopeSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ScopeSetVisitor;

        impl Visitor<'_> for ScopeSetVisitor {
            type Value = ScopeSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a scope string like 'env=dev,region=r1'")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<ScopeSet, E> {
                ScopeSet::parse(v).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(ScopeSetVisitor)
    }
}

/// Validate a scope key or value token: non-empty, `[A-Za-z0-9_.-]` only.
fn validate_token(token: &str) -> std::result::Result<(), ()> {
    if token.is_empty() {
        return Err(());
    }
    if token
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        Ok(())
    } else {
        Err(())
    }
}
