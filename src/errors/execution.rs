// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Errors surfaced by an `apply` call.
///
/// Halts are not errors: a run concluded by an item or engine halt returns
/// `Ok` with the halt recorded on the [`EngineContext`](crate::EngineContext).
/// These variants cover the caller-facing failure modes only.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The caller-supplied cancellation signal fired before the run finished.
    #[error("run cancelled by external signal")]
    Cancelled,

    /// A rule predicate or action failed and the configured fault handler
    /// chose to propagate. Post-processing does not execute.
    #[error("rule '{rule}' failed: {source}")]
    RuleFailed {
        rule: String,
        #[source]
        source: anyhow::Error,
    },

    /// Engine invariant violation, such as a panicked rule task.
    #[error("internal engine error: {message}")]
    Internal { message: String },
}
