// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! rulewright: an embeddable rule-execution engine.
//!
//! Rules declare a name, dependency/provider tags, a guard predicate, and an
//! action. At construction the engine resolves the rule collection into a
//! deterministic plan of "generations" (batches of mutually independent rules)
//! and rejects cycles and unresolved tags outright. Each `apply` call then
//! walks the plan across pre/main/post phases for one or many input items
//! against a shared output, serially or in parallel on both the rule and item
//! axes, with cooperative cancellation, predicate-result caching, and
//! pluggable fault handling.

pub mod context;
pub mod engine;
pub mod errors;
pub mod handler;
pub mod observability;
pub mod plan;
pub mod rules;

pub use context::{EngineContext, Halt, HaltScope};
pub use engine::{Engine, EngineOptions, ItemState, RunState};
pub use errors::{DependencyError, EngineError};
pub use handler::{Disposition, FaultContext, FaultHandler};
pub use rules::{
    CachePolicy, CacheScope, PostRule, PostRuleFn, Rule, RuleFault, RuleFn, RuleMeta, RuleResult,
};
