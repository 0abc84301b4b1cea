// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for per-rule evaluation events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A rule's predicate returned false and its action was skipped.
///
/// # Log Level
/// `debug!` - Diagnostic detail
pub struct RuleSkipped<'a> {
    pub rule: &'a str,
    pub item: Option<usize>,
}

impl Display for RuleSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.item {
            Some(item) => write!(f, "Rule '{}' skipped for item {}", self.rule, item),
            None => write!(f, "Rule '{}' skipped", self.rule),
        }
    }
}

impl StructuredLog for RuleSkipped<'_> {
    fn log(&self) {
        tracing::debug!(
            rule = self.rule,
            item = self.item,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "rule_skipped",
            span_name = name,
            rule = self.rule,
            item = self.item,
        )
    }
}

/// A rule's action completed.
///
/// # Log Level
/// `trace!` - High-volume diagnostic detail
pub struct RuleApplied<'a> {
    pub rule: &'a str,
    pub item: Option<usize>,
}

impl Display for RuleApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self.item {
            Some(item) => write!(f, "Rule '{}' applied to item {}", self.rule, item),
            None => write!(f, "Rule '{}' applied", self.rule),
        }
    }
}

impl StructuredLog for RuleApplied<'_> {
    fn log(&self) {
        tracing::trace!(
            rule = self.rule,
            item = self.item,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::trace_span!(
            "rule_applied",
            span_name = name,
            rule = self.rule,
            item = self.item,
        )
    }
}

/// A fault from a rule body was handled and execution continued.
///
/// # Log Level
/// `warn!` - Swallowed failure, worth surfacing
pub struct RuleFaultHandled<'a> {
    pub rule: &'a str,
    pub item: Option<usize>,
    pub error: &'a dyn std::error::Error,
}

impl Display for RuleFaultHandled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Rule '{}' fault handled, continuing: {}",
            self.rule, self.error
        )
    }
}

impl StructuredLog for RuleFaultHandled<'_> {
    fn log(&self) {
        tracing::warn!(
            rule = self.rule,
            item = self.item,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::warn_span!(
            "rule_fault_handled",
            span_name = name,
            rule = self.rule,
            error = %self.error,
        )
    }
}

/// A fault from a rule body will abort the run.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct RuleFaulted<'a> {
    pub rule: &'a str,
    pub item: Option<usize>,
    pub error: &'a dyn std::error::Error,
}

impl Display for RuleFaulted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Rule '{}' failed: {}", self.rule, self.error)
    }
}

impl StructuredLog for RuleFaulted<'_> {
    fn log(&self) {
        tracing::error!(
            rule = self.rule,
            item = self.item,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "rule_faulted",
            span_name = name,
            rule = self.rule,
            error = %self.error,
        )
    }
}
