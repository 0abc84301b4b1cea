// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Closure-backed rules.
//!
//! [`RuleFn`] and [`PostRuleFn`] hold the predicate and action as function
//! values plus plain metadata, replacing the inheritance-based rule variants
//! of classic rule engines. Synchronous closures are wrapped into immediately
//! ready futures; asynchronous closures return a boxed future borrowing the
//! invocation arguments.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::context::EngineContext;
use crate::rules::{CachePolicy, PostRule, Rule, RuleMeta, RuleResult};

/// Boxed future returned by asynchronous rule closures.
pub type BoxRuleFuture<'a, T> = Pin<Box<dyn Future<Output = RuleResult<T>> + Send + 'a>>;

type ItemPredicate<I, O> =
    dyn for<'a> Fn(&'a EngineContext, &'a I, &'a O) -> BoxRuleFuture<'a, bool> + Send + Sync;
type ItemAction<I, O> =
    dyn for<'a> Fn(&'a EngineContext, &'a I, &'a O) -> BoxRuleFuture<'a, ()> + Send + Sync;
type OutputPredicate<O> =
    dyn for<'a> Fn(&'a EngineContext, &'a O) -> BoxRuleFuture<'a, bool> + Send + Sync;
type OutputAction<O> =
    dyn for<'a> Fn(&'a EngineContext, &'a O) -> BoxRuleFuture<'a, ()> + Send + Sync;

/// A per-item rule assembled from closures.
pub struct RuleFn<I, O = ()> {
    name: String,
    dependencies: Vec<String>,
    provides: Vec<String>,
    cache: CachePolicy,
    predicate: Option<Box<ItemPredicate<I, O>>>,
    action: Box<ItemAction<I, O>>,
}

impl<I, O> RuleFn<I, O>
where
    I: Send + Sync,
    O: Send + Sync,
{
    /// A rule with a synchronous action and no predicate (always applies).
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&EngineContext, &I, &O) -> RuleResult<()> + Send + Sync + 'static,
    {
        let action: Box<ItemAction<I, O>> = Box::new(move |ctx, input, output| {
            Box::pin(std::future::ready(action(ctx, input, output)))
        });
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            provides: Vec::new(),
            cache: CachePolicy::default(),
            predicate: None,
            action,
        }
    }

    /// A rule with an asynchronous action and no predicate.
    ///
    /// The closure returns a [`BoxRuleFuture`], typically
    /// `|ctx, input, output| Box::pin(async move { ... })`.
    pub fn new_async<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a EngineContext, &'a I, &'a O) -> BoxRuleFuture<'a, ()>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            provides: Vec::new(),
            cache: CachePolicy::default(),
            predicate: None,
            action: Box::new(action),
        }
    }

    /// Set a synchronous guard predicate.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EngineContext, &I, &O) -> RuleResult<bool> + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(move |ctx, input, output| {
            Box::pin(std::future::ready(predicate(ctx, input, output)))
        }));
        self
    }

    /// Set an asynchronous guard predicate.
    pub fn with_predicate_async<F>(mut self, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a EngineContext, &'a I, &'a O) -> BoxRuleFuture<'a, bool>
            + Send
            + Sync
            + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Declare the tokens this rule depends on.
    pub fn with_dependencies<S: Into<String>>(
        mut self,
        tokens: impl IntoIterator<Item = S>,
    ) -> Self {
        self.dependencies = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the tokens this rule provides, beyond its identity token.
    pub fn with_provides<S: Into<String>>(mut self, tokens: impl IntoIterator<Item = S>) -> Self {
        self.provides = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set the predicate caching policy.
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }
}

impl<I, O> RuleMeta for RuleFn<I, O>
where
    I: Send + Sync,
    O: Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn provides(&self) -> Vec<String> {
        self.provides.clone()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.cache.clone()
    }
}

#[async_trait]
impl<I, O> Rule<I, O> for RuleFn<I, O>
where
    I: Send + Sync,
    O: Send + Sync,
{
    async fn applies(&self, ctx: &EngineContext, input: &I, output: &O) -> RuleResult<bool> {
        match &self.predicate {
            Some(predicate) => predicate(ctx, input, output).await,
            None => Ok(true),
        }
    }

    async fn apply(&self, ctx: &EngineContext, input: &I, output: &O) -> RuleResult<()> {
        (self.action)(ctx, input, output).await
    }
}

/// A run-scoped post-processing rule assembled from closures.
pub struct PostRuleFn<O> {
    name: String,
    dependencies: Vec<String>,
    provides: Vec<String>,
    cache: CachePolicy,
    predicate: Option<Box<OutputPredicate<O>>>,
    action: Box<OutputAction<O>>,
}

impl<O> PostRuleFn<O>
where
    O: Send + Sync,
{
    /// A post rule with a synchronous action and no predicate.
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: Fn(&EngineContext, &O) -> RuleResult<()> + Send + Sync + 'static,
    {
        let action: Box<OutputAction<O>> = Box::new(move |ctx, output| {
            Box::pin(std::future::ready(action(ctx, output)))
        });
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            provides: Vec::new(),
            cache: CachePolicy::default(),
            predicate: None,
            action,
        }
    }

    /// A post rule with an asynchronous action and no predicate.
    pub fn new_async<F>(name: impl Into<String>, action: F) -> Self
    where
        F: for<'a> Fn(&'a EngineContext, &'a O) -> BoxRuleFuture<'a, ()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            provides: Vec::new(),
            cache: CachePolicy::default(),
            predicate: None,
            action: Box::new(action),
        }
    }

    /// Set a synchronous guard predicate.
    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&EngineContext, &O) -> RuleResult<bool> + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(move |ctx, output| {
            Box::pin(std::future::ready(predicate(ctx, output)))
        }));
        self
    }

    /// Declare the tokens this rule depends on.
    pub fn with_dependencies<S: Into<String>>(
        mut self,
        tokens: impl IntoIterator<Item = S>,
    ) -> Self {
        self.dependencies = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Declare the tokens this rule provides, beyond its identity token.
    pub fn with_provides<S: Into<String>>(mut self, tokens: impl IntoIterator<Item = S>) -> Self {
        self.provides = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set the predicate caching policy.
    pub fn with_cache(mut self, cache: CachePolicy) -> Self {
        self.cache = cache;
        self
    }
}

impl<O> RuleMeta for PostRuleFn<O>
where
    O: Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn provides(&self) -> Vec<String> {
        self.provides.clone()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.cache.clone()
    }
}

#[async_trait]
impl<O> PostRule<O> for PostRuleFn<O>
where
    O: Send + Sync,
{
    async fn applies(&self, ctx: &EngineContext, output: &O) -> RuleResult<bool> {
        match &self.predicate {
            Some(predicate) => predicate(ctx, output).await,
            None => Ok(true),
        }
    }

    async fn apply(&self, ctx: &EngineContext, output: &O) -> RuleResult<()> {
        (self.action)(ctx, output).await
    }
}
