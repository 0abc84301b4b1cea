// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Rule capability traits and the outcomes a rule body can produce.
//!
//! A rule is metadata ([`RuleMeta`]) plus behavior: a guard predicate
//! (`applies`) and an action (`apply`). Per-item rules ([`Rule`]) run in the
//! pre and main phases against each input item and the shared output;
//! run-scoped rules ([`PostRule`]) run once per apply call against the shared
//! output only.
//!
//! Halts are modeled as tagged outcomes rather than unwinding: a rule body
//! returns [`RuleFault::HaltItem`] or [`RuleFault::HaltEngine`] to signal
//! control flow, or [`RuleFault::Failed`] for an application error that the
//! configured fault handler will classify.

pub mod lambda;

use async_trait::async_trait;

use crate::context::EngineContext;

pub use lambda::{PostRuleFn, RuleFn};

/// Result type returned by rule predicates and actions.
pub type RuleResult<T> = Result<T, RuleFault>;

/// Outcome of a rule predicate or action that did not complete normally.
///
/// The halt variants are control-flow signals, not application errors: they
/// bypass the fault handler, get stamped into a [`Halt`](crate::Halt) record
/// on the context, and scope how much of the run is abandoned.
#[derive(Debug, thiserror::Error)]
pub enum RuleFault {
    /// Abandon the current item; remaining items and post-processing proceed.
    #[error("item halted: {0}")]
    HaltItem(String),

    /// Abandon the entire run, including post-processing.
    #[error("engine halted: {0}")]
    HaltEngine(String),

    /// Application error, routed through the configured fault handler.
    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl RuleFault {
    /// Halt the current item with the given reason.
    pub fn halt_item(reason: impl Into<String>) -> Self {
        RuleFault::HaltItem(reason.into())
    }

    /// Halt the whole run with the given reason.
    pub fn halt_engine(reason: impl Into<String>) -> Self {
        RuleFault::HaltEngine(reason.into())
    }
}

/// Granularity of predicate-result caching for a rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheScope {
    /// Evaluate the predicate on every invocation.
    #[default]
    None,
    /// Evaluate at most once per (cache key, item) within a run.
    PerInput,
    /// Evaluate at most once per cache key within a run.
    PerExecution,
}

/// Predicate caching policy: a scope plus an optional cache key.
///
/// The key defaults to the rule's own name, so distinct rules cache
/// independently unless they opt into a shared key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CachePolicy {
    pub scope: CacheScope,
    pub key: Option<String>,
}

impl CachePolicy {
    /// No caching; the predicate runs every time.
    pub fn none() -> Self {
        Self::default()
    }

    /// Cache once per item within a run.
    pub fn per_input() -> Self {
        Self {
            scope: CacheScope::PerInput,
            key: None,
        }
    }

    /// Cache once per run.
    pub fn per_execution() -> Self {
        Self {
            scope: CacheScope::PerExecution,
            key: None,
        }
    }

    /// Override the cache key, allowing several rules to share one entry.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// The effective key for a rule named `name`.
    pub(crate) fn key_for(&self, name: &str) -> String {
        self.key.clone().unwrap_or_else(|| name.to_string())
    }
}

/// Metadata shared by every rule flavor.
///
/// `provides` need not list anything: the resolver always adds the rule's
/// identity token (its name), so any rule can be depended on by name alone.
pub trait RuleMeta: Send + Sync {
    /// Rule name; must be non-empty and doubles as the identity token.
    fn name(&self) -> &str;

    /// Tokens this rule requires before it may run.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Tokens this rule provides, beyond its identity token.
    fn provides(&self) -> Vec<String> {
        Vec::new()
    }

    /// Predicate caching policy; defaults to no caching.
    fn cache_policy(&self) -> CachePolicy {
        CachePolicy::default()
    }
}

/// A per-item rule, executed in the pre and main phases.
#[async_trait]
pub trait Rule<I, O = ()>: RuleMeta
where
    I: Send + Sync,
    O: Send + Sync,
{
    /// Guard predicate; the action only runs when this returns `Ok(true)`.
    async fn applies(
        &self,
        _ctx: &EngineContext,
        _input: &I,
        _output: &O,
    ) -> RuleResult<bool> {
        Ok(true)
    }

    /// The rule's action.
    async fn apply(&self, ctx: &EngineContext, input: &I, output: &O) -> RuleResult<()>;
}

/// A run-scoped rule, executed once per apply call in the post phase.
#[async_trait]
pub trait PostRule<O>: RuleMeta
where
    O: Send + Sync,
{
    /// Guard predicate; the action only runs when this returns `Ok(true)`.
    async fn applies(&self, _ctx: &EngineContext, _output: &O) -> RuleResult<bool> {
        Ok(true)
    }

    /// The rule's action, applied to the shared output.
    async fn apply(&self, ctx: &EngineContext, output: &O) -> RuleResult<()>;
}
