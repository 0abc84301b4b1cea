// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors raised while resolving a rule collection into generations.
///
/// Resolution runs once, at engine construction. Any of these is fatal:
/// no partial or degraded engine is ever produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyError {
    /// A rule names a dependency token that no rule in the collection provides.
    #[error("rule '{rule}' depends on '{token}' which no rule provides")]
    UnresolvedDependency { rule: String, token: String },

    /// A dependency cycle (direct or indirect) exists among the named rules.
    #[error("cyclic dependency among rules: {}", rules.join(", "))]
    CyclicDependency { rules: Vec<String> },

    /// A rule was supplied with an empty name.
    #[error("rule at position {position} has an empty name")]
    EmptyRuleName { position: usize },
}
