// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache adapter trait for short-lived memoization of expensive reads.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;

/// A string key/value cache with per-entry time-to-live.
///
/// Values are opaque strings (callers serialize to JSON). Implementations
/// may fail with [`MnemoError::CacheUnavailable`]; services never call this
/// trait directly but go through a best-effort wrapper that treats failures
/// as misses.
#[async_trait]
pub trait CacheAdapter: PluginAdapter {
    /// Fetch a live entry.
    async fn get(&self, key: &str) -> Result<Option<String>, MnemoError>;

    /// Store an entry that expires after `ttl`.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), MnemoError>;

    /// Remove the given keys. Missing keys are ignored.
    async fn delete(&self, keys: &[String]) -> Result<(), MnemoError>;

    /// Remove every key starting with `prefix`, returning how many were removed.
    async fn delete_prefix(&self, prefix: &str) -> Result<usize, MnemoError>;
}
