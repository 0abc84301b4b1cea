// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for plan resolution events.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A phase's rule collection resolved into generations.
///
/// # Log Level
/// `debug!` - Construction-time diagnostic
///
/// # Example
/// ```
/// use rulewright::observability::messages::resolver::PlanResolved;
///
/// let msg = PlanResolved {
///     phase: "main",
///     rule_count: 7,
///     generation_count: 3,
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct PlanResolved<'a> {
    pub phase: &'a str,
    pub rule_count: usize,
    pub generation_count: usize,
}

impl Display for PlanResolved<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Resolved {} phase: {} rules into {} generations",
            self.phase, self.rule_count, self.generation_count
        )
    }
}

impl StructuredLog for PlanResolved<'_> {
    fn log(&self) {
        tracing::debug!(
            phase = self.phase,
            rule_count = self.rule_count,
            generation_count = self.generation_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::debug_span!(
            "plan_resolved",
            span_name = name,
            phase = self.phase,
            rule_count = self.rule_count,
            generation_count = self.generation_count,
        )
    }
}

/// A phase's rule collection could not be resolved.
///
/// # Log Level
/// `error!` - Fatal construction failure
pub struct ResolutionFailed<'a> {
    pub phase: &'a str,
    pub error: &'a dyn std::error::Error,
}

impl Display for ResolutionFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Resolution of {} phase failed: {}", self.phase, self.error)
    }
}

impl StructuredLog for ResolutionFailed<'_> {
    fn log(&self) {
        tracing::error!(
            phase = self.phase,
            error = %self.error,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::error_span!(
            "resolution_failed",
            span_name = name,
            phase = self.phase,
            error = %self.error,
        )
    }
}
