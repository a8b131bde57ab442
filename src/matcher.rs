// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Key-based matching of desired resources against actual resources.
//!
//! [`match_by_key`] partitions two sequences into matched pairs, desired-only
//! and actual-only items by a resource-identifying key (e.g., listener port).
//! It has no side effects and its output is ordered by key.
//!
//! Keys must be unique within each input; callers deduplicate beforehand.

use std::collections::BTreeMap;

/// Result of matching desired against actual resources.
#[derive(Debug, PartialEq, Eq)]
pub struct MatchResult<D, A> {
    /// Items present on both sides, ordered by key
    pub matched: Vec<(D, A)>,
    /// Items only desired (to create), ordered by key
    pub desired_only: Vec<D>,
    /// Items only present in the cloud (to delete), ordered by key
    pub actual_only: Vec<A>,
}

/// Match `desired` against `actual` by key.
///
/// # Example
///
/// ```rust
/// use lbsync::matcher::match_by_key;
///
/// let result = match_by_key(vec![443_i64, 8443], vec![80_i64, 443], |d| *d, |a| *a);
/// assert_eq!(result.matched, vec![(443, 443)]);
/// assert_eq!(result.desired_only, vec![8443]);
/// assert_eq!(result.actual_only, vec![80]);
/// ```
pub fn match_by_key<D, A, K>(
    desired: Vec<D>,
    actual: Vec<A>,
    desired_key: impl Fn(&D) -> K,
    actual_key: impl Fn(&A) -> K,
) -> MatchResult<D, A>
where
    K: Ord,
{
    let mut desired_by_key: BTreeMap<K, D> = desired
        .into_iter()
        .map(|d| (desired_key(&d), d))
        .collect();

    let mut matched = Vec::new();
    let mut actual_only = BTreeMap::new();
    for a in actual {
        let key = actual_key(&a);
        match desired_by_key.remove(&key) {
            Some(d) => {
                matched.push((key, d, a));
            }
            None => {
                actual_only.insert(key, a);
            }
        }
    }
    matched.sort_by(|x, y| x.0.cmp(&y.0));

    MatchResult {
        matched: matched.into_iter().map(|(_, d, a)| (d, a)).collect(),
        desired_only: desired_by_key.into_values().collect(),
        actual_only: actual_only.into_values().collect(),
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod matcher_tests;
