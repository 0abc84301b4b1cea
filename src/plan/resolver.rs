// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Dependency resolution: from an ordered rule collection to generations.
//!
//! Dependency tokens are resolved against a provider map (every rule
//! implicitly provides its own name), then a generation-based topological
//! sweep schedules each rule as soon as all of its providers sit in earlier
//! generations. A pass that schedules nothing while rules remain means a
//! cycle. Input order is preserved within a generation, so output is
//! deterministic for a fixed input order.
//!
//! Complexity is O(V²) in the worst case, which is acceptable: resolution
//! runs once at engine construction, never per item.

use std::collections::HashMap;

use crate::errors::DependencyError;
use crate::plan::Generation;
use crate::rules::RuleMeta;

/// Resolve one rule collection into its generation sequence.
///
/// Fails on an empty rule name, a dependency token with no provider, or a
/// dependency cycle. Failure is fatal to engine construction; no partial
/// plan is produced.
pub fn resolve<M>(rules: &[&M]) -> Result<Vec<Generation>, DependencyError>
where
    M: RuleMeta + ?Sized,
{
    for (position, rule) in rules.iter().enumerate() {
        if rule.name().is_empty() {
            return Err(DependencyError::EmptyRuleName { position });
        }
    }

    // provider token -> indices of the rules providing it; the identity
    // token (the rule's name) is always included
    let mut providers: HashMap<String, Vec<usize>> = HashMap::new();
    for (index, rule) in rules.iter().enumerate() {
        providers
            .entry(rule.name().to_string())
            .or_default()
            .push(index);
        for token in rule.provides() {
            providers.entry(token).or_default().push(index);
        }
    }

    // Replace each rule's dependency tokens with concrete provider indices.
    // A token with several providers makes the rule wait on all of them.
    let mut dependency_indices: Vec<Vec<usize>> = Vec::with_capacity(rules.len());
    for rule in rules {
        let mut indices = Vec::new();
        for token in rule.dependencies() {
            let found = providers
                .get(&token)
                .ok_or_else(|| DependencyError::UnresolvedDependency {
                    rule: rule.name().to_string(),
                    token: token.clone(),
                })?;
            indices.extend_from_slice(found);
        }
        indices.sort_unstable();
        indices.dedup();
        dependency_indices.push(indices);
    }

    let mut scheduled = vec![false; rules.len()];
    let mut placed = 0usize;
    let mut generations = Vec::new();

    while placed < rules.len() {
        // Candidates are judged against generations already closed, so every
        // member of this pass is independent of its peers.
        let ready: Vec<usize> = (0..rules.len())
            .filter(|&index| {
                !scheduled[index]
                    && dependency_indices[index]
                        .iter()
                        .all(|&provider| scheduled[provider])
            })
            .collect();

        if ready.is_empty() {
            let stuck = (0..rules.len())
                .filter(|&index| !scheduled[index])
                .map(|index| rules[index].name().to_string())
                .collect();
            return Err(DependencyError::CyclicDependency { rules: stuck });
        }

        for &index in &ready {
            scheduled[index] = true;
        }
        placed += ready.len();
        generations.push(Generation(ready));
    }

    Ok(generations)
}
