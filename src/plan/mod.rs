// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Execution plans: the resolver's output.
//!
//! Rules are kept in per-phase arenas (plain vectors) and a plan refers to
//! them by index, so generations carry no object references of their own.

mod resolver;

pub use resolver::resolve;

/// A batch of mutually independent rules, identified by arena index.
///
/// Generations execute strictly in sequence. Rules within one generation have
/// no relative-order guarantee under parallel execution and keep input order
/// under serial execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation(pub Vec<usize>);

impl Generation {
    /// Arena indices of the member rules, in original input order.
    pub fn members(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The three generation sequences of a resolved engine, computed once at
/// construction.
///
/// Invariant: every supplied rule appears in exactly one generation of its
/// phase, never earlier than any rule it depends on. A single-type engine
/// simply leaves `pre` and `post` empty.
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub pre: Vec<Generation>,
    pub main: Vec<Generation>,
    pub post: Vec<Generation>,
}

impl ExecutionPlan {
    /// Total number of rules across all phases.
    pub fn rule_count(&self) -> usize {
        let count = |gens: &[Generation]| gens.iter().map(Generation::len).sum::<usize>();
        count(&self.pre) + count(&self.main) + count(&self.post)
    }
}
