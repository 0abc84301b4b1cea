// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The generic execution core.
//!
//! Per-item rules and run-scoped post rules are bound to their arguments as
//! [`Step`] objects, so the generation-walking logic — predicate caching,
//! fault routing, halt classification, serial and parallel execution,
//! cooperative cancellation — is written exactly once and shared by every
//! phase.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::context::{EngineContext, Halt, HaltScope};
use crate::errors::EngineError;
use crate::handler::{Disposition, FaultContext, FaultHandler};
use crate::observability::messages::rule::{
    RuleApplied, RuleFaultHandled, RuleFaulted, RuleSkipped,
};
use crate::observability::messages::StructuredLog;
use crate::plan::Generation;
use crate::rules::{CachePolicy, CacheScope, PostRule, Rule, RuleFault};

/// Control-flow outcome of a step, a generation, or a phase.
#[derive(Debug)]
pub(crate) enum Flow {
    Continue,
    HaltItem(Halt),
    HaltEngine(Halt),
}

/// A rule bound to the arguments of one invocation.
#[async_trait]
pub(crate) trait Step: Send + Sync {
    fn name(&self) -> &str;

    fn cache_policy(&self) -> CachePolicy;

    /// Ordinal of the bound item; `None` for run-scoped (post) steps.
    fn item(&self) -> Option<usize>;

    async fn applies(&self, ctx: &EngineContext) -> Result<bool, RuleFault>;

    async fn apply(&self, ctx: &EngineContext) -> Result<(), RuleFault>;
}

/// A per-item rule bound to one input item and the shared output.
pub(crate) struct ItemStep<I, O> {
    pub rule: Arc<dyn Rule<I, O>>,
    pub input: Arc<I>,
    pub output: Arc<O>,
    pub ordinal: usize,
}

#[async_trait]
impl<I, O> Step for ItemStep<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.rule.cache_policy()
    }

    fn item(&self) -> Option<usize> {
        Some(self.ordinal)
    }

    async fn applies(&self, ctx: &EngineContext) -> Result<bool, RuleFault> {
        self.rule.applies(ctx, &self.input, &self.output).await
    }

    async fn apply(&self, ctx: &EngineContext) -> Result<(), RuleFault> {
        self.rule.apply(ctx, &self.input, &self.output).await
    }
}

/// A post rule bound to the shared output.
pub(crate) struct OutputStep<O> {
    pub rule: Arc<dyn PostRule<O>>,
    pub output: Arc<O>,
}

#[async_trait]
impl<O> Step for OutputStep<O>
where
    O: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.rule.name()
    }

    fn cache_policy(&self) -> CachePolicy {
        self.rule.cache_policy()
    }

    fn item(&self) -> Option<usize> {
        None
    }

    async fn applies(&self, ctx: &EngineContext) -> Result<bool, RuleFault> {
        self.rule.applies(ctx, &self.output).await
    }

    async fn apply(&self, ctx: &EngineContext) -> Result<(), RuleFault> {
        self.rule.apply(ctx, &self.output).await
    }
}

/// Walks generation sequences over a set of bound steps.
///
/// `scope_token` bounds the work being walked (one item, or the post phase)
/// and is checked between steps and generations; `run_token` is the whole
/// run's signal and is cancelled here when a parallel sibling halts the
/// engine or fails unhandled, so in-flight work elsewhere stops
/// cooperatively.
pub(crate) struct Walker<'a> {
    pub ctx: &'a Arc<EngineContext>,
    pub handler: &'a Arc<dyn FaultHandler>,
    pub scope_token: CancellationToken,
    pub run_token: CancellationToken,
    pub parallel: bool,
    pub max_concurrency: usize,
}

impl Walker<'_> {
    /// Walk every generation in order. Generations are a barrier: all
    /// members of one complete (or the walk concludes) before the next
    /// starts. A halt from any member ends the walk; cancellation of the
    /// scope abandons it with `Flow::Continue`, the outcome being owned by
    /// whoever cancelled.
    pub(crate) async fn walk(
        &self,
        generations: &[Generation],
        steps: &[Arc<dyn Step>],
    ) -> Result<Flow, EngineError> {
        for generation in generations {
            if self.scope_token.is_cancelled() {
                return Ok(Flow::Continue);
            }
            let flow = if self.parallel && generation.len() > 1 {
                self.walk_parallel(generation, steps).await?
            } else {
                self.walk_serial(generation, steps).await?
            };
            match flow {
                Flow::Continue => {}
                halt => return Ok(halt),
            }
        }
        Ok(Flow::Continue)
    }

    /// Execute one generation's members in declared order.
    async fn walk_serial(
        &self,
        generation: &Generation,
        steps: &[Arc<dyn Step>],
    ) -> Result<Flow, EngineError> {
        for &index in generation.members() {
            if self.scope_token.is_cancelled() {
                return Ok(Flow::Continue);
            }
            match run_step(steps[index].as_ref(), self.ctx, self.handler.as_ref()).await? {
                Flow::Continue => {}
                halt => return Ok(halt),
            }
        }
        Ok(Flow::Continue)
    }

    /// Launch one generation's members concurrently and join them all.
    ///
    /// The first engine halt or unhandled fault cancels the run token so
    /// sibling tasks stop at their next suspension point; an item halt
    /// cancels only the scope token. Joining continues until every task has
    /// finished, preserving the generation barrier.
    async fn walk_parallel(
        &self,
        generation: &Generation,
        steps: &[Arc<dyn Step>],
    ) -> Result<Flow, EngineError> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<Result<Flow, EngineError>> = JoinSet::new();

        for &index in generation.members() {
            let step = steps[index].clone();
            let ctx = self.ctx.clone();
            let handler = self.handler.clone();
            let scope_token = self.scope_token.clone();
            let semaphore = semaphore.clone();
            tasks.spawn(async move {
                let _permit = semaphore.acquire().await.map_err(|e| EngineError::Internal {
                    message: format!("semaphore closed while scheduling rule: {e}"),
                })?;
                if scope_token.is_cancelled() {
                    return Ok(Flow::Continue);
                }
                run_step(step.as_ref(), &ctx, handler.as_ref()).await
            });
        }

        let mut flow = Flow::Continue;
        let mut failure: Option<EngineError> = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(Flow::Continue)) => {}
                Ok(Ok(Flow::HaltItem(halt))) => {
                    self.scope_token.cancel();
                    if matches!(flow, Flow::Continue) {
                        flow = Flow::HaltItem(halt);
                    }
                }
                Ok(Ok(Flow::HaltEngine(halt))) => {
                    self.run_token.cancel();
                    if !matches!(flow, Flow::HaltEngine(_)) {
                        flow = Flow::HaltEngine(halt);
                    }
                }
                Ok(Err(error)) => {
                    self.run_token.cancel();
                    if failure.is_none() {
                        failure = Some(error);
                    }
                }
                Err(join_error) => {
                    self.run_token.cancel();
                    if failure.is_none() {
                        failure = Some(EngineError::Internal {
                            message: format!("rule task panicked or was aborted: {join_error}"),
                        });
                    }
                }
            }
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(flow),
        }
    }
}

/// Evaluate one bound step: cache-or-compute the predicate, run the action,
/// classify whatever fault surfaces.
pub(crate) async fn run_step(
    step: &dyn Step,
    ctx: &EngineContext,
    handler: &dyn FaultHandler,
) -> Result<Flow, EngineError> {
    let policy = step.cache_policy();
    let verdict = match policy.scope {
        CacheScope::None => step.applies(ctx).await,
        CacheScope::PerInput => {
            let key = (policy.key_for(step.name()), step.item().unwrap_or(usize::MAX));
            ctx.per_input_cache()
                .get_or_try_compute(&key, || step.applies(ctx))
                .await
        }
        CacheScope::PerExecution => {
            let key = policy.key_for(step.name());
            ctx.per_run_cache()
                .get_or_try_compute(&key, || step.applies(ctx))
                .await
        }
    };

    let fault = match verdict {
        Ok(false) => {
            RuleSkipped {
                rule: step.name(),
                item: step.item(),
            }
            .log();
            return Ok(Flow::Continue);
        }
        Ok(true) => match step.apply(ctx).await {
            Ok(()) => {
                RuleApplied {
                    rule: step.name(),
                    item: step.item(),
                }
                .log();
                return Ok(Flow::Continue);
            }
            Err(fault) => fault,
        },
        Err(fault) => fault,
    };

    match fault {
        RuleFault::HaltItem(reason) => Ok(Flow::HaltItem(Halt {
            scope: HaltScope::Item,
            rule: step.name().to_string(),
            item: step.item(),
            reason,
            source: None,
        })),
        RuleFault::HaltEngine(reason) => Ok(Flow::HaltEngine(Halt {
            scope: HaltScope::Engine,
            rule: step.name().to_string(),
            item: step.item(),
            reason,
            source: None,
        })),
        RuleFault::Failed(error) => {
            let disposition = handler.handle(FaultContext {
                rule: step.name(),
                item: step.item(),
                error: &error,
                context: ctx,
            });
            match disposition {
                Disposition::Handled => {
                    RuleFaultHandled {
                        rule: step.name(),
                        item: step.item(),
                        error: error.as_ref(),
                    }
                    .log();
                    Ok(Flow::Continue)
                }
                Disposition::Propagate => {
                    RuleFaulted {
                        rule: step.name(),
                        item: step.item(),
                        error: error.as_ref(),
                    }
                    .log();
                    Err(EngineError::RuleFailed {
                        rule: step.name().to_string(),
                        source: error,
                    })
                }
                Disposition::HaltItem => Ok(Flow::HaltItem(Halt {
                    scope: HaltScope::Item,
                    rule: step.name().to_string(),
                    item: step.item(),
                    reason: format!("fault escalated to item halt: {error}"),
                    source: Some(Arc::new(error)),
                })),
                Disposition::HaltEngine => Ok(Flow::HaltEngine(Halt {
                    scope: HaltScope::Engine,
                    rule: step.name().to_string(),
                    item: step.item(),
                    reason: format!("fault escalated to engine halt: {error}"),
                    source: Some(Arc::new(error)),
                })),
            }
        }
    }
}
