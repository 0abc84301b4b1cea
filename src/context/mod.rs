// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Per-run execution context.
//!
//! An [`EngineContext`] is created (or supplied) at the start of one apply
//! invocation, mutated throughout, and inspected afterwards. It carries a
//! trace id, an arbitrary key/value stash, the two predicate caches, the
//! run's cancellation signal, and the last halt recorded by the engine.

pub mod cache;

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub use cache::Cache;

/// Extent of a halt signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltScope {
    /// Only the current item is abandoned; the run continues.
    Item,
    /// The whole run is abandoned, post-processing included.
    Engine,
}

impl std::fmt::Display for HaltScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltScope::Item => write!(f, "item"),
            HaltScope::Engine => write!(f, "engine"),
        }
    }
}

/// A halt recorded on the context, stamped by the engine with the faulting
/// rule and item at the moment the signal surfaced.
#[derive(Debug, Clone)]
pub struct Halt {
    pub scope: HaltScope,
    /// Name of the rule that raised the halt.
    pub rule: String,
    /// Ordinal of the item being processed, if the halt was item-bound.
    pub item: Option<usize>,
    pub reason: String,
    /// The application error behind the halt, when a fault handler escalated
    /// one into a halt.
    pub source: Option<Arc<anyhow::Error>>,
}

impl std::fmt::Display for Halt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} halt from rule '{}': {}", self.scope, self.rule, self.reason)
    }
}

/// Per-run mutable state container.
///
/// The stash maps string keys to `Arc<dyn Any + Send + Sync>` values. Typed
/// access that misses, or hits a value of another type, is a programming
/// error and panics; use [`EngineContext::try_get`] where absence is
/// expected.
pub struct EngineContext {
    trace_id: String,
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    per_input: Cache<(String, usize), bool>,
    per_run: Cache<String, bool>,
    last_halt: RwLock<Option<Halt>>,
    cancellation: RwLock<Option<CancellationToken>>,
}

impl EngineContext {
    /// A fresh context with a random trace id.
    pub fn new() -> Self {
        Self::with_trace_id(Uuid::new_v4().to_string())
    }

    /// A fresh context with a caller-supplied trace id.
    pub fn with_trace_id(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            values: RwLock::new(HashMap::new()),
            per_input: Cache::new(),
            per_run: Cache::new(),
            last_halt: RwLock::new(None),
            cancellation: RwLock::new(None),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    /// Store a value under `name`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&self, name: impl Into<String>, value: T) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(value));
    }

    /// Typed read. Panics if the key is absent or holds a different type.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Arc<T> {
        match self.try_get::<T>(name) {
            Some(value) => value,
            None if self.contains(name) => panic!(
                "context key '{name}' does not hold a {}",
                std::any::type_name::<T>()
            ),
            None => panic!("context key '{name}' is not present"),
        }
    }

    /// Typed read returning `None` on a missing key or a type mismatch.
    pub fn try_get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let value = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)?
            .clone();
        value.downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Remove `name` from the stash, reporting whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    /// Atomic get-or-create: returns the existing value under `name` or
    /// inserts the one produced by `factory`. Panics if an existing value
    /// has a different type.
    pub fn get_or_insert_with<T: Any + Send + Sync>(
        &self,
        name: &str,
        factory: impl FnOnce() -> T,
    ) -> Arc<T> {
        let mut values = self.values.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = values.get(name) {
            return existing.clone().downcast::<T>().unwrap_or_else(|_| {
                panic!(
                    "context key '{name}' does not hold a {}",
                    std::any::type_name::<T>()
                )
            });
        }
        let value = Arc::new(factory());
        values.insert(name.to_string(), value.clone());
        value
    }

    /// The last halt recorded during a run on this context, if any.
    ///
    /// `None` after a run means it completed cleanly; unhandled application
    /// errors surface as an `Err` from the apply call instead.
    pub fn last_halt(&self) -> Option<Halt> {
        self.last_halt
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The current run's cancellation signal.
    ///
    /// Long-running rule bodies may `select!` on this to stop cooperatively
    /// when a sibling halts the engine or the caller cancels. Outside a run
    /// this returns a token that never fires.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancellation
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .unwrap_or_default()
    }

    pub(crate) fn set_cancellation(&self, token: CancellationToken) {
        *self
            .cancellation
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub(crate) fn record_halt(&self, halt: Halt) {
        *self
            .last_halt
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(halt);
    }

    pub(crate) fn per_input_cache(&self) -> &Cache<(String, usize), bool> {
        &self.per_input
    }

    pub(crate) fn per_run_cache(&self) -> &Cache<String, bool> {
        &self.per_run
    }

    /// Empty both predicate caches. Invoked by the engine whenever a run
    /// concludes via a halt signal.
    pub(crate) fn clear_caches(&self) {
        self.per_input.clear();
        self.per_run.clear();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EngineContext {
    /// Shallow copy: stash entries (Arc-cloned) and trace id carry over;
    /// caches, halt record, and cancellation signal are run-scoped and start
    /// fresh on the clone.
    fn clone(&self) -> Self {
        let values = self
            .values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        Self {
            trace_id: self.trace_id.clone(),
            values: RwLock::new(values),
            per_input: Cache::new(),
            per_run: Cache::new(),
            last_halt: RwLock::new(None),
            cancellation: RwLock::new(None),
        }
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("trace_id", &self.trace_id)
            .field(
                "keys",
                &self
                    .values
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .keys()
                    .collect::<Vec<_>>(),
            )
            .field("last_halt", &self.last_halt())
            .finish()
    }
}
