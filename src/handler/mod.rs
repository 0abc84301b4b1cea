// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Pluggable classification of application errors raised by rule bodies.
//!
//! Halt signals never reach a handler — they are already a definitive
//! decision. Everything else a predicate or action fails with is passed to
//! the configured [`FaultHandler`], whose [`Disposition`] tells the engine
//! to swallow, propagate, or escalate into a halt.
//!
//! The built-ins are stateless unit values; there is no process-wide handler
//! registry.

use crate::context::EngineContext;

/// Everything known about a fault at the moment it surfaced.
pub struct FaultContext<'a> {
    /// Name of the rule whose predicate or action failed.
    pub rule: &'a str,
    /// Ordinal of the item being processed, if the fault was item-bound.
    pub item: Option<usize>,
    pub error: &'a anyhow::Error,
    pub context: &'a EngineContext,
}

/// A handler's ruling on a fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Swallow the fault; the engine continues as if the rule's predicate
    /// had returned false.
    Handled,
    /// Propagate: the run aborts with
    /// [`EngineError::RuleFailed`](crate::EngineError::RuleFailed) and
    /// post-processing is skipped.
    Propagate,
    /// Escalate into an item halt.
    HaltItem,
    /// Escalate into an engine halt.
    HaltEngine,
}

/// Classifies application errors surfacing from rule predicates and actions.
pub trait FaultHandler: Send + Sync {
    fn handle(&self, fault: FaultContext<'_>) -> Disposition;
}

/// Never handles; every fault propagates. The engine default.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rethrow;

impl FaultHandler for Rethrow {
    fn handle(&self, _fault: FaultContext<'_>) -> Disposition {
        Disposition::Propagate
    }
}

/// Handles everything; faulting rules behave as if their predicate were
/// false.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ignore;

impl FaultHandler for Ignore {
    fn handle(&self, _fault: FaultContext<'_>) -> Disposition {
        Disposition::Handled
    }
}

/// Escalates every fault into an item halt.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaltItemOnFault;

impl FaultHandler for HaltItemOnFault {
    fn handle(&self, _fault: FaultContext<'_>) -> Disposition {
        Disposition::HaltItem
    }
}

/// Escalates every fault into an engine halt.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaltEngineOnFault;

impl FaultHandler for HaltEngineOnFault {
    fn handle(&self, _fault: FaultContext<'_>) -> Disposition {
        Disposition::HaltEngine
    }
}

impl<F> FaultHandler for F
where
    F: Fn(FaultContext<'_>) -> Disposition + Send + Sync,
{
    fn handle(&self, fault: FaultContext<'_>) -> Disposition {
        self(fault)
    }
}
