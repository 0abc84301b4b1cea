// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Message types follow a struct-based pattern with a `Display`
//! implementation plus the [`messages::StructuredLog`] trait, keeping log
//! strings out of the execution code and the field names consistent.
//! Logging is purely observational: nothing here affects control flow.
//!
//! Messages are organized by subsystem:
//! * `messages::engine` - run and item lifecycle events
//! * `messages::rule` - per-rule evaluation events
//! * `messages::resolver` - plan resolution events

pub mod messages;
