// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Predicate-result cache with an at-most-once-computation guarantee.
//!
//! Values live in per-key `OnceCell`s behind a keyed map. Once a value is
//! present the read path never blocks on a computation; first-time
//! computation for a key takes only that key's critical section, so
//! unrelated keys never contend and no lock is held across a computation.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock};

use tokio::sync::OnceCell;

/// Keyed cache whose entries are computed at most once.
pub struct Cache<K, V> {
    cells: RwLock<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: RwLock::new(HashMap::new()),
        }
    }

    /// Non-blocking read of an already-computed value.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .and_then(|cell| cell.get().cloned())
    }

    /// Return the cached value for `key`, computing it via `compute` if
    /// absent.
    ///
    /// For a given key the computation runs at most once across all
    /// concurrent callers; callers arriving while it is in flight await the
    /// same result. A computation that returns `Err` leaves the key
    /// uncomputed, so a later caller may try again.
    pub async fn get_or_try_compute<E, F, Fut>(&self, key: &K, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.peek(key) {
            return Ok(value);
        }

        let cell = {
            let mut cells = self.cells.write().unwrap_or_else(PoisonError::into_inner);
            cells.entry(key.clone()).or_default().clone()
        };

        cell.get_or_try_init(compute).await.cloned()
    }

    /// Drop every entry, computed or pending.
    pub fn clear(&self) {
        self.cells
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of keys with a computed or in-flight entry.
    pub fn len(&self) -> usize {
        self.cells
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
