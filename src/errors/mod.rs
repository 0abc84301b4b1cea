// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod dependency;
mod execution;

pub use dependency::DependencyError;
pub use execution::EngineError;
