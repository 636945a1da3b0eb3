//! Scope precedence configuration.
//!
//! Orders combinations of scope keys from most generic to most specific.
//! Resolution walks the tiers in declared order; a later tier's exact match
//! always overrides an earlier one's, so declaration order, not tier
//! cardinality, is the single source of truth for specificity.
//!
//! The configuration is parsed once at startup from a string like
//! `env;env+region;env+region+stack;hostname;application` and is immutable
//! for the process lifetime.

use crate::error::{Error, Result};
use std::collections::BTreeSet;

/// Delimiter between tiers in a precedence configuration string.
pub const TIER_DELIMITER: char = ';';

/// Aggregator between keys inside one tier.
pub const KEY_AGGREGATOR: char = '+';

/// Ordered list of precedence tiers, each a set of scope dimension keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecedenceConfiguration {
    tiers: Vec<BTreeSet<String>>,
}

impl PrecedenceConfiguration {
    /// Parse a configuration string.
    ///
    /// Example: `env;env+region;hostname` yields tiers
    /// `[{env}, {env, region}, {hostname}]`. Keys must match
    /// `[A-Za-z0-9_.-]+`; empty tiers or keys are rejected.
    pub fn parse(config: &str) -> Result<Self> {
        let trimmed = config.trim();
        if trimmed.is_empty() {
            return Err(Error::invalid_precedence(
                "precedence configuration string is empty",
            ));
        }

        let mut tiers = Vec::new();
        for tier_str in trimmed.split(TIER_DELIMITER) {
            if tier_str.is_empty() {
                return Err(Error::invalid_precedence(format!(
                    "empty tier in precedence configuration '{}'",
                    config
                )));
            }
            let mut tier = BTreeSet::new();
            for key in tier_str.split(KEY_AGGREGATOR) {
                if key.is_empty()
                    || !key
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
                {
                    return Err(Error::invalid_precedence(format!(
                        "invalid scope key '{}' in precedence tier '{}'",
                        key, tier_str
                    )));
                }
                tier.insert(key.to_string());
            }
            tiers.push(tier);
        }

        Ok(Self { tiers })
    }

    /// Iterate tiers in declared order, least specific first.
    pub fn tiers(&self) -> impl Iterator<Item = &BTreeSet<String>> {
        self.tiers.iter()
    }

    /// Number of tiers
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Whether the configuration has no tiers
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Position of the tier whose key set equals the given keys, if any.
    pub fn index_of_keys(&self, keys: &BTreeSet<String>) -> Option<usize> {
        self.tiers.iter().position(|tier| tier == keys)
    }
}
