// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache layer for the Mnemo memory engine.
//!
//! Backends implement [`mnemo_core::CacheAdapter`]; services talk to them
//! through [`BestEffortCache`], which turns every backend failure into a miss.

pub mod best_effort;
pub mod memory;
pub mod noop;

use std::sync::Arc;

use mnemo_config::model::CacheConfig;
use mnemo_core::CacheAdapter;

pub use best_effort::BestEffortCache;
pub use memory::InMemoryCache;
pub use noop::NoopCache;

/// Build the backend selected by `cache.backend`.
///
/// Unknown names are rejected by config validation; they fall back to no caching here.
pub fn backend_from_config(config: &CacheConfig) -> Arc<dyn CacheAdapter> {
    match config.backend.as_str() {
        "memory" => Arc::new(InMemoryCache::new(config.max_entries)),
        _ => Arc::new(NoopCache),
    }
}

/// Build a [`BestEffortCache`] over the configured backend.
pub fn from_config(config: &CacheConfig) -> BestEffortCache {
    BestEffortCache::new(backend_from_config(config))
}
