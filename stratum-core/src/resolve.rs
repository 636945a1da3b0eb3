//! The scope-precedence resolution engine.
//!
//! Given a query scope set and a collection of candidate scoped values, pick
//! the single best match under a [`PrecedenceConfiguration`]:
//!
//! - tiers are evaluated in declared order, least specific first;
//! - a tier applies only when the query carries *all* of the tier's keys;
//!   otherwise the tier is skipped entirely, which is how fallback to a
//!   coarser tier happens;
//! - within an applicable tier, a candidate matches only when its scope set
//!   equals the query's restriction to the tier's keys *exactly*, never by
//!   subset or superset;
//! - a later tier's match overrides an earlier one's, even when the later
//!   tier's matched scope set is literally smaller.
//!
//! A candidate bound to a key combination that no tier declares (e.g.
//! `{env, hostname}` spanning two tiers) is permanently unreachable by this
//! exact-tier matching. Such entries are tolerated, never matched, and never
//! repaired.

use crate::precedence::PrecedenceConfiguration;
use crate::scope::ScopeSet;

/// A value bound to one exact scope combination.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ScopedValue<V> {
    /// The exact scope set this value is bound to
    pub scope_set: ScopeSet,
    /// The bound value
    pub value: V,
}

impl<V> ScopedValue<V> {
    /// Create a scoped value
    pub fn new(scope_set: ScopeSet, value: V) -> Self {
        Self { scope_set, value }
    }
}

/// A successful resolution: the winning value and the scope set it matched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match<'a, V> {
    /// The scope set the winning candidate was bound to (the query's
    /// restriction to the winning tier's keys).
    pub scope_set: ScopeSet,
    /// The winning value
    pub value: &'a V,
}

/// Resolve against an arbitrary exact-match lookup.
///
/// `lookup` is called once per applicable tier with the query's restriction
/// to that tier's keys and must return the candidate bound to *exactly* that
/// scope set, if one exists. This form serves callers that keep candidates
/// in an associative table (the version-set mapping); slice-shaped callers
/// use [`resolve`].
///
/// Resolution is pure: the same inputs always yield the same match.
pub fn resolve_with<'a, V, F>(
    query: &ScopeSet,
    precedence: &PrecedenceConfiguration,
    mut lookup: F,
) -> Option<Match<'a, V>>
where
    F: FnMut(&ScopeSet) -> Option<&'a V>,
{
    let mut result: Option<Match<'a, V>> = None;
    let mut matched_sets: Vec<ScopeSet> = Vec::new();

    for tier in precedence.tiers() {
        // The query lacks context for this tier; not applicable rather than
        // "no match".
        if !query.contains_all_keys(tier) {
            continue;
        }

        let intersection = query.restrict(tier);

        // Duplicate tiers reduce to the same intersection and must not
        // re-produce the current result.
        if matched_sets.contains(&intersection) {
            continue;
        }

        if let Some(value) = lookup(&intersection) {
            matched_sets.push(intersection.clone());
            result = Some(Match {
                scope_set: intersection,
                value,
            });
            // Keep going: a later (more specific) tier may still override.
        }
    }

    result
}

/// Resolve over a slice of candidates.
///
/// Convenience wrapper over [`resolve_with`] for callers that hold
/// candidates as a flat collection (per-property scoped values).
pub fn resolve<'a, V>(
    query: &ScopeSet,
    candidates: &'a [ScopedValue<V>],
    precedence: &PrecedenceConfiguration,
) -> Option<Match<'a, V>> {
    resolve_with(query, precedence, |intersection| {
        candidates
            .iter()
            .find(|c| &c.scope_set == intersection)
            .map(|c| &c.value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn precedence(s: &str) -> PrecedenceConfiguration {
        PrecedenceConfiguration::parse(s).unwrap()
    }

    fn scopes(s: &str) -> ScopeSet {
        ScopeSet::parse(s).unwrap()
    }

    fn candidates(entries: &[(&str, &str)]) -> Vec<ScopedValue<String>> {
        entries
            .iter()
            .map(|(scope, value)| ScopedValue::new(scopes(scope), value.to_string()))
            .collect()
    }

    #[test]
    fn test_more_specific_tier_overrides() {
        let prec = precedence("env;env+region");
        let cands = candidates(&[("env=dev", "A"), ("env=dev,region=r1", "B")]);

        let m = resolve(&scopes("env=dev,region=r1"), &cands, &prec).unwrap();
        assert_eq!(m.value, "B");
        assert_eq!(m.scope_set, scopes("env=dev,region=r1"));
    }

    #[test]
    fn test_fallback_when_specific_tier_has_no_candidate() {
        let prec = precedence("env;env+region");
        let cands = candidates(&[("env=dev", "A"), ("env=dev,region=r1", "B")]);

        // Tier 2 applies but has no exact candidate for region=r2; tier 1 wins.
        let m = resolve(&scopes("env=dev,region=r2"), &cands, &prec).unwrap();
        assert_eq!(m.value, "A");
        assert_eq!(m.scope_set, scopes("env=dev"));
    }

    #[test]
    fn test_tier_skipped_when_query_lacks_keys() {
        let prec = precedence("env;env+region");
        let cands = candidates(&[("env=dev,region=r1", "B")]);

        // Query has no region, so tier 2 is inapplicable; tier 1 has no
        // exact candidate either.
        assert!(resolve(&scopes("env=dev"), &cands, &prec).is_none());
    }

    #[test]
    fn test_exact_match_only_never_subset_or_superset() {
        let prec = precedence("env");
        // Candidate bound to a superset of the tier intersection.
        let cands = candidates(&[("env=dev,region=r1", "B")]);
        assert!(resolve(&scopes("env=dev,region=r1"), &cands, &prec).is_none());

        let prec = precedence("env+region");
        // Candidate bound to a subset of the tier intersection.
        let cands = candidates(&[("env=dev", "A")]);
        assert!(resolve(&scopes("env=dev,region=r1"), &cands, &prec).is_none());
    }

    #[test]
    fn test_later_smaller_tier_overrides_earlier_larger_one() {
        let prec = precedence("env;env+region;hostname");
        let cands = candidates(&[("env=dev,region=r1", "B"), ("hostname=h1", "H")]);

        // The hostname tier is declared after env+region, so it wins even
        // though its matched scope set is smaller.
        let m = resolve(&scopes("env=dev,region=r1,hostname=h1"), &cands, &prec).unwrap();
        assert_eq!(m.value, "H");
    }

    #[test]
    fn test_cross_tier_entry_is_unreachable() {
        let prec = precedence("env;env+region;hostname");
        // No tier declares exactly {env, hostname}.
        let cands = candidates(&[("env=dev,hostname=h1", "X")]);

        assert!(resolve(&scopes("env=dev,hostname=h1"), &cands, &prec).is_none());
        assert!(resolve(&scopes("env=dev,region=r1,hostname=h1"), &cands, &prec).is_none());
    }

    #[test]
    fn test_duplicate_tier_does_not_reproduce_result() {
        let prec = precedence("env;env");
        let cands = candidates(&[("env=dev", "A")]);

        let m = resolve(&scopes("env=dev"), &cands, &prec).unwrap();
        assert_eq!(m.value, "A");
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let prec = precedence("env;env+region");
        let cands = candidates(&[("env=dev", "A"), ("env=dev,region=r1", "B")]);
        let query = scopes("env=dev,region=r1");

        let first = resolve(&query, &cands, &prec).unwrap();
        let second = resolve(&query, &cands, &prec).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let prec = precedence("env;env+region");
        let cands = candidates(&[("env=dev", "A")]);
        assert!(resolve(&ScopeSet::new(), &cands, &prec).is_none());
    }

    #[test]
    fn test_resolve_with_table_lookup() {
        use std::collections::BTreeMap;

        let prec = precedence("env;env+region");
        let mut table = BTreeMap::new();
        table.insert(scopes("env=dev"), "A".to_string());
        table.insert(scopes("env=dev,region=r1"), "B".to_string());

        let m = resolve_with(&scopes("env=dev,region=r2"), &prec, |k| table.get(k)).unwrap();
        assert_eq!(m.value, "A");
    }
}
