// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for run and item lifecycle events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A run started.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use rulewright::observability::messages::engine::RunStarted;
///
/// let msg = RunStarted {
///     trace_id: "0c6b4f",
///     rule_count: 5,
///     parallel_rules: false,
///     parallel_items: true,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct RunStarted<'a> {
    pub trace_id: &'a str,
    pub rule_count: usize,
    pub parallel_rules: bool,
    pub parallel_items: bool,
}

impl Display for RunStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Starting run {}: {} rules, parallel_rules={}, parallel_items={}",
            self.trace_id, self.rule_count, self.parallel_rules, self.parallel_items
        )
    }
}

impl StructuredLog for RunStarted<'_> {
    fn log(&self) {
        tracing::info!(
            trace_id = self.trace_id,
            rule_count = self.rule_count,
            parallel_rules = self.parallel_rules,
            parallel_items = self.parallel_items,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run",
            span_name = name,
            trace_id = self.trace_id,
            rule_count = self.rule_count,
            parallel_rules = self.parallel_rules,
            parallel_items = self.parallel_items,
        )
    }
}

/// A run finished without an engine halt or failure.
///
/// # Log Level
/// `info!` - Important operational event
pub struct RunCompleted<'a> {
    pub trace_id: &'a str,
    pub items_processed: usize,
    pub duration: std::time::Duration,
}

impl Display for RunCompleted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} completed: {} items in {:?}",
            self.trace_id, self.items_processed, self.duration
        )
    }
}

impl StructuredLog for RunCompleted<'_> {
    fn log(&self) {
        tracing::info!(
            trace_id = self.trace_id,
            items_processed = self.items_processed,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "run_completed",
            span_name = name,
            trace_id = self.trace_id,
            items_processed = self.items_processed,
            duration = ?self.duration,
        )
    }
}

/// A halt signal concluded part or all of a run.
///
/// # Log Level
/// `warn!` - Expected control flow, but worth surfacing
pub struct RunHalted<'a> {
    pub trace_id: &'a str,
    pub scope: &'a str,
    pub rule: &'a str,
    pub reason: &'a str,
}

impl Display for RunHalted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} {} halt from rule '{}': {}",
            self.trace_id, self.scope, self.rule, self.reason
        )
    }
}

impl StructuredLog for RunHalted<'_> {
    fn log(&self) {
        tracing::warn!(
            trace_id = self.trace_id,
            scope = self.scope,
            rule = self.rule,
            reason = self.reason,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "run_halted",
            span_name = name,
            trace_id = self.trace_id,
            scope = self.scope,
            rule = self.rule,
        )
    }
}

/// The caller's cancellation signal ended the run.
///
/// # Log Level
/// `warn!` - Expected, externally driven outcome
pub struct RunCancelled<'a> {
    pub trace_id: &'a str,
    pub items_processed: usize,
}

impl Display for RunCancelled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} cancelled by external signal after {} items",
            self.trace_id, self.items_processed
        )
    }
}

impl StructuredLog for RunCancelled<'_> {
    fn log(&self) {
        tracing::warn!(
            trace_id = self.trace_id,
            items_processed = self.items_processed,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "run_cancelled",
            span_name = name,
            trace_id = self.trace_id,
            items_processed = self.items_processed,
        )
    }
}

/// A run aborted with an unhandled failure.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RunFailed<'a> {
    pub trace_id: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for RunFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Run {} failed: {}", self.trace_id, self.error)
    }
}

impl StructuredLog for RunFailed<'_> {
    fn log(&self) {
        tracing::error!(
            trace_id = self.trace_id,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "run_failed",
            span_name = name,
            trace_id = self.trace_id,
            error = %self.error,
        )
    }
}

/// An item moved to a new state in the per-item state machine.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct ItemStateChanged<'a> {
    pub trace_id: &'a str,
    pub item: usize,
    pub state: &'a str,
}

impl Display for ItemStateChanged<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Run {} item {} entered state {}",
            self.trace_id, self.item, self.state
        )
    }
}

impl StructuredLog for ItemStateChanged<'_> {
    fn log(&self) {
        tracing::debug!(
            trace_id = self.trace_id,
            item = self.item,
            state = self.state,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "item_state",
            span_name = name,
            trace_id = self.trace_id,
            item = self.item,
            state = self.state,
        )
    }
}
