// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! # Usage Pattern
//!
//! ```rust
//! use rulewright::observability::messages::rule::RuleSkipped;
//! use rulewright::observability::messages::StructuredLog;
//!
//! let msg = RuleSkipped {
//!     rule: "discounts",
//!     item: Some(2),
//! };
//!
//! msg.log();
//! ```

pub mod engine;
pub mod resolver;
pub mod rule;

use tracing::Span;

/// Emit the message at its canonical level with structured fields, or open a
/// span carrying the same fields.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, name: &str) -> Span;
}
