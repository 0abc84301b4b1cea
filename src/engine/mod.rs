// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The execution engine.
//!
//! An [`Engine`] is built once from pre/main/post rule collections — the
//! dependency resolver turns each into a generation sequence at construction
//! — and is then reusable across any number of apply calls. Each call drives
//! the pre and main phases per input item and the post phase once against
//! the shared output, under the configured rule/item concurrency modes.

pub(crate) mod executor;
#[cfg(test)]
mod integration_tests;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::{pin_mut, Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::context::EngineContext;
use crate::engine::executor::{Flow, ItemStep, OutputStep, Step, Walker};
use crate::errors::{DependencyError, EngineError};
use crate::handler::{FaultHandler, Rethrow};
use crate::observability::messages::engine::{
    ItemStateChanged, RunCancelled, RunCompleted, RunFailed, RunHalted, RunStarted,
};
use crate::observability::messages::resolver::{PlanResolved, ResolutionFailed};
use crate::observability::messages::StructuredLog;
use crate::plan::{resolve, ExecutionPlan, Generation};
use crate::rules::{PostRule, Rule};

/// Per-item progress through a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    Pending,
    PreApplying,
    MainApplying,
    ItemHalted,
    /// Cut short mid-phase by a sibling's engine halt or cancellation.
    Abandoned,
    Completed,
}

impl ItemState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemState::Pending => "pending",
            ItemState::PreApplying => "pre_applying",
            ItemState::MainApplying => "main_applying",
            ItemState::ItemHalted => "item_halted",
            ItemState::Abandoned => "abandoned",
            ItemState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for ItemState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whole-run progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Pending,
    Processing,
    PostApplying,
    EngineHalted,
    Completed,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Pending => "pending",
            RunState::Processing => "processing",
            RunState::PostApplying => "post_applying",
            RunState::EngineHalted => "engine_halted",
            RunState::Completed => "completed",
        }
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Concurrency configuration for an engine.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Launch the members of a generation concurrently instead of in
    /// declared order.
    pub parallel_rules: bool,
    /// Process items concurrently instead of in submission order.
    pub parallel_items: bool,
    /// Upper bound on concurrently executing rule or item tasks.
    pub max_concurrency: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parallel_rules: false,
            parallel_items: false,
            max_concurrency: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl EngineOptions {
    /// Serial rules, serial items.
    pub fn serial() -> Self {
        Self::default()
    }

    /// Parallel rules within each generation.
    pub fn parallel_rules() -> Self {
        Self {
            parallel_rules: true,
            ..Self::default()
        }
    }

    /// Parallel items.
    pub fn parallel_items() -> Self {
        Self {
            parallel_items: true,
            ..Self::default()
        }
    }

    /// Parallel on both axes.
    pub fn fully_parallel() -> Self {
        Self {
            parallel_rules: true,
            parallel_items: true,
            ..Self::default()
        }
    }
}

struct RunSummary {
    items_processed: usize,
    engine_halted: bool,
}

/// A reusable rule-execution engine over input items of type `I` and a
/// shared output of type `O`.
///
/// A single-type engine is simply `Engine<T, ()>` with empty pre/post
/// collections.
pub struct Engine<I, O = ()> {
    pre: Vec<Arc<dyn Rule<I, O>>>,
    main: Vec<Arc<dyn Rule<I, O>>>,
    post: Vec<Arc<dyn PostRule<O>>>,
    plan: ExecutionPlan,
    handler: Arc<dyn FaultHandler>,
    options: EngineOptions,
}

impl<I, O> Engine<I, O>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    /// An engine with main-phase rules only and default (serial) options.
    pub fn new(main: Vec<Arc<dyn Rule<I, O>>>) -> Result<Self, DependencyError> {
        Self::with_phases(Vec::new(), main, Vec::new(), EngineOptions::default())
    }

    /// An engine with all three phases.
    ///
    /// Resolution runs here, once; any dependency failure prevents
    /// construction outright.
    pub fn with_phases(
        pre: Vec<Arc<dyn Rule<I, O>>>,
        main: Vec<Arc<dyn Rule<I, O>>>,
        post: Vec<Arc<dyn PostRule<O>>>,
        mut options: EngineOptions,
    ) -> Result<Self, DependencyError> {
        options.max_concurrency = options.max_concurrency.max(1);
        let plan = ExecutionPlan {
            pre: resolve_item_phase("pre", &pre)?,
            main: resolve_item_phase("main", &main)?,
            post: resolve_post_phase("post", &post)?,
        };
        Ok(Self {
            pre,
            main,
            post,
            plan,
            handler: Arc::new(Rethrow),
            options,
        })
    }

    /// Replace the fault handler (default: [`Rethrow`]).
    pub fn with_handler(mut self, handler: Arc<dyn FaultHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// The resolved plan, for inspection.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Apply the plan to a single item.
    pub async fn apply(
        &self,
        input: Arc<I>,
        output: Arc<O>,
        ctx: Option<Arc<EngineContext>>,
        cancel: Option<CancellationToken>,
    ) -> Result<Arc<EngineContext>, EngineError> {
        self.apply_many(vec![input], output, ctx, cancel).await
    }

    /// Apply the plan to a materialized batch of items sharing one output.
    pub async fn apply_many(
        &self,
        inputs: Vec<Arc<I>>,
        output: Arc<O>,
        ctx: Option<Arc<EngineContext>>,
        cancel: Option<CancellationToken>,
    ) -> Result<Arc<EngineContext>, EngineError> {
        self.apply_stream(futures::stream::iter(inputs), output, ctx, cancel)
            .await
    }

    /// Apply the plan to a streamed item source, consumed incrementally.
    ///
    /// The context used for the run is returned so the caller can inspect
    /// [`EngineContext::last_halt`]: `Ok` with no halt means the run
    /// completed cleanly, `Ok` with a halt means an item or engine halt
    /// concluded it, and `Err` covers cancellation and unhandled failures.
    pub async fn apply_stream<S>(
        &self,
        items: S,
        output: Arc<O>,
        ctx: Option<Arc<EngineContext>>,
        cancel: Option<CancellationToken>,
    ) -> Result<Arc<EngineContext>, EngineError>
    where
        S: Stream<Item = Arc<I>> + Send,
    {
        let external = cancel.unwrap_or_default();
        let run_token = external.child_token();
        let ctx = ctx.unwrap_or_else(|| Arc::new(EngineContext::new()));
        ctx.set_cancellation(run_token.clone());

        let started = Instant::now();
        RunStarted {
            trace_id: ctx.trace_id(),
            rule_count: self.plan.rule_count(),
            parallel_rules: self.options.parallel_rules,
            parallel_items: self.options.parallel_items,
        }
        .log();

        let outcome = self.run(items, &output, &ctx, &external, &run_token).await;

        match outcome {
            Ok(summary) => {
                if external.is_cancelled() {
                    RunCancelled {
                        trace_id: ctx.trace_id(),
                        items_processed: summary.items_processed,
                    }
                    .log();
                    return Err(EngineError::Cancelled);
                }
                // An engine-halted run already announced itself via RunHalted.
                if !summary.engine_halted {
                    RunCompleted {
                        trace_id: ctx.trace_id(),
                        items_processed: summary.items_processed,
                        duration: started.elapsed(),
                    }
                    .log();
                }
                Ok(ctx)
            }
            Err(EngineError::Cancelled) => {
                RunCancelled {
                    trace_id: ctx.trace_id(),
                    items_processed: 0,
                }
                .log();
                Err(EngineError::Cancelled)
            }
            Err(error) => {
                RunFailed {
                    trace_id: ctx.trace_id(),
                    error: &error,
                }
                .log();
                Err(error)
            }
        }
    }

    async fn run<S>(
        &self,
        items: S,
        output: &Arc<O>,
        ctx: &Arc<EngineContext>,
        external: &CancellationToken,
        run_token: &CancellationToken,
    ) -> Result<RunSummary, EngineError>
    where
        S: Stream<Item = Arc<I>> + Send,
    {
        tracing::debug!(
            trace_id = ctx.trace_id(),
            state = RunState::Processing.as_str(),
            "run state changed"
        );
        let summary = if self.options.parallel_items {
            self.run_items_parallel(items, output, ctx, run_token).await?
        } else {
            self.run_items_serial(items, output, ctx, external, run_token)
                .await?
        };

        if summary.engine_halted {
            tracing::debug!(
                trace_id = ctx.trace_id(),
                state = RunState::EngineHalted.as_str(),
                "run state changed"
            );
            return Ok(summary);
        }
        if external.is_cancelled() {
            return Err(EngineError::Cancelled);
        }

        self.run_post(output, ctx, run_token).await?;
        tracing::debug!(
            trace_id = ctx.trace_id(),
            state = RunState::Completed.as_str(),
            "run state changed"
        );
        Ok(summary)
    }

    async fn run_items_serial<S>(
        &self,
        items: S,
        output: &Arc<O>,
        ctx: &Arc<EngineContext>,
        external: &CancellationToken,
        run_token: &CancellationToken,
    ) -> Result<RunSummary, EngineError>
    where
        S: Stream<Item = Arc<I>> + Send,
    {
        pin_mut!(items);
        let mut ordinal = 0usize;
        loop {
            if external.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let next = tokio::select! {
                _ = run_token.cancelled() => None,
                item = items.next() => item,
            };
            let Some(item) = next else { break };

            match self.run_item(ordinal, item, output, ctx, run_token).await? {
                Flow::Continue | Flow::HaltItem(_) => {}
                Flow::HaltEngine(_) => {
                    run_token.cancel();
                    return Ok(RunSummary {
                        items_processed: ordinal + 1,
                        engine_halted: true,
                    });
                }
            }
            ordinal += 1;
        }
        if external.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        Ok(RunSummary {
            items_processed: ordinal,
            engine_halted: run_token.is_cancelled(),
        })
    }

    async fn run_items_parallel<S>(
        &self,
        items: S,
        output: &Arc<O>,
        ctx: &Arc<EngineContext>,
        run_token: &CancellationToken,
    ) -> Result<RunSummary, EngineError>
    where
        S: Stream<Item = Arc<I>> + Send,
    {
        pin_mut!(items);
        let mut in_flight = FuturesUnordered::new();
        let mut stream_open = true;
        let mut engine_halted = false;
        let mut failure: Option<EngineError> = None;
        let mut ordinal = 0usize;
        let mut processed = 0usize;

        loop {
            // Computed ahead of the select so neither guard touches the
            // in-flight set while it is being polled.
            let can_pull = stream_open
                && !engine_halted
                && failure.is_none()
                && !run_token.is_cancelled()
                && in_flight.len() < self.options.max_concurrency;

            tokio::select! {
                Some(result) = in_flight.next() => {
                    processed += 1;
                    match result {
                        Ok(Flow::HaltEngine(_)) => {
                            engine_halted = true;
                            run_token.cancel();
                        }
                        Ok(_) => {}
                        Err(error) => {
                            run_token.cancel();
                            if failure.is_none() {
                                failure = Some(error);
                            }
                        }
                    }
                }
                next = items.next(), if can_pull => {
                    match next {
                        Some(item) => {
                            in_flight.push(self.run_item(ordinal, item, output, ctx, run_token));
                            ordinal += 1;
                        }
                        None => stream_open = false,
                    }
                }
                else => break,
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }
        Ok(RunSummary {
            items_processed: processed,
            engine_halted,
        })
    }

    /// Drive one item through the pre and main phases.
    ///
    /// Halts surfacing here are stamped onto the context and both predicate
    /// caches are emptied; the caller decides how much of the run the halt
    /// abandons.
    async fn run_item(
        &self,
        ordinal: usize,
        item: Arc<I>,
        output: &Arc<O>,
        ctx: &Arc<EngineContext>,
        run_token: &CancellationToken,
    ) -> Result<Flow, EngineError> {
        let item_token = run_token.child_token();
        let walker = Walker {
            ctx,
            handler: &self.handler,
            scope_token: item_token.clone(),
            run_token: run_token.clone(),
            parallel: self.options.parallel_rules,
            max_concurrency: self.options.max_concurrency,
        };

        ItemStateChanged {
            trace_id: ctx.trace_id(),
            item: ordinal,
            state: ItemState::PreApplying.as_str(),
        }
        .log();
        let pre_steps = bind_item_steps(&self.pre, &item, output, ordinal);
        let mut flow = walker.walk(&self.plan.pre, &pre_steps).await?;

        if matches!(flow, Flow::Continue) && !item_token.is_cancelled() {
            ItemStateChanged {
                trace_id: ctx.trace_id(),
                item: ordinal,
                state: ItemState::MainApplying.as_str(),
            }
            .log();
            let main_steps = bind_item_steps(&self.main, &item, output, ordinal);
            flow = walker.walk(&self.plan.main, &main_steps).await?;
        }

        match &flow {
            Flow::Continue if item_token.is_cancelled() => {
                ItemStateChanged {
                    trace_id: ctx.trace_id(),
                    item: ordinal,
                    state: ItemState::Abandoned.as_str(),
                }
                .log();
            }
            Flow::Continue => {
                ItemStateChanged {
                    trace_id: ctx.trace_id(),
                    item: ordinal,
                    state: ItemState::Completed.as_str(),
                }
                .log();
            }
            Flow::HaltItem(halt) | Flow::HaltEngine(halt) => {
                ItemStateChanged {
                    trace_id: ctx.trace_id(),
                    item: ordinal,
                    state: ItemState::ItemHalted.as_str(),
                }
                .log();
                RunHalted {
                    trace_id: ctx.trace_id(),
                    scope: halt.scope.to_string().as_str(),
                    rule: &halt.rule,
                    reason: &halt.reason,
                }
                .log();
                ctx.record_halt(halt.clone());
                ctx.clear_caches();
                item_token.cancel();
            }
        }
        Ok(flow)
    }

    /// The post phase: run-scoped rules against the shared output, exactly
    /// once per apply call, skipped entirely when the run was engine-halted.
    async fn run_post(
        &self,
        output: &Arc<O>,
        ctx: &Arc<EngineContext>,
        run_token: &CancellationToken,
    ) -> Result<(), EngineError> {
        if self.post.is_empty() {
            return Ok(());
        }
        tracing::debug!(
            trace_id = ctx.trace_id(),
            state = RunState::PostApplying.as_str(),
            "run state changed"
        );

        let steps: Vec<Arc<dyn Step>> = self
            .post
            .iter()
            .map(|rule| {
                Arc::new(OutputStep {
                    rule: rule.clone(),
                    output: output.clone(),
                }) as Arc<dyn Step>
            })
            .collect();
        let walker = Walker {
            ctx,
            handler: &self.handler,
            scope_token: run_token.clone(),
            run_token: run_token.clone(),
            parallel: self.options.parallel_rules,
            max_concurrency: self.options.max_concurrency,
        };

        match walker.walk(&self.plan.post, &steps).await? {
            Flow::Continue => Ok(()),
            Flow::HaltItem(halt) | Flow::HaltEngine(halt) => {
                RunHalted {
                    trace_id: ctx.trace_id(),
                    scope: halt.scope.to_string().as_str(),
                    rule: &halt.rule,
                    reason: &halt.reason,
                }
                .log();
                ctx.record_halt(halt);
                ctx.clear_caches();
                Ok(())
            }
        }
    }
}

fn bind_item_steps<I, O>(
    rules: &[Arc<dyn Rule<I, O>>],
    input: &Arc<I>,
    output: &Arc<O>,
    ordinal: usize,
) -> Vec<Arc<dyn Step>>
where
    I: Send + Sync + 'static,
    O: Send + Sync + 'static,
{
    rules
        .iter()
        .map(|rule| {
            Arc::new(ItemStep {
                rule: rule.clone(),
                input: input.clone(),
                output: output.clone(),
                ordinal,
            }) as Arc<dyn Step>
        })
        .collect()
}

fn resolve_item_phase<I, O>(
    phase: &str,
    rules: &[Arc<dyn Rule<I, O>>],
) -> Result<Vec<Generation>, DependencyError>
where
    I: Send + Sync,
    O: Send + Sync,
{
    let metas: Vec<&dyn Rule<I, O>> = rules.iter().map(|rule| rule.as_ref()).collect();
    log_resolution(phase, rules.len(), resolve(&metas))
}

fn resolve_post_phase<O>(
    phase: &str,
    rules: &[Arc<dyn PostRule<O>>],
) -> Result<Vec<Generation>, DependencyError>
where
    O: Send + Sync,
{
    let metas: Vec<&dyn PostRule<O>> = rules.iter().map(|rule| rule.as_ref()).collect();
    log_resolution(phase, rules.len(), resolve(&metas))
}

fn log_resolution(
    phase: &str,
    rule_count: usize,
    outcome: Result<Vec<Generation>, DependencyError>,
) -> Result<Vec<Generation>, DependencyError> {
    match outcome {
        Ok(generations) => {
            PlanResolved {
                phase,
                rule_count,
                generation_count: generations.len(),
            }
            .log();
            Ok(generations)
        }
        Err(error) => {
            ResolutionFailed {
                phase,
                error: &error,
            }
            .log();
            Err(error)
        }
    }
}
