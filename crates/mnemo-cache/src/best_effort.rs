// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed, failure-absorbing access to a [`CacheAdapter`].
//!
//! The cache is never a source of truth. Backend failures and undecodable
//! payloads are logged at warn level and reported to the caller as a miss
//! (reads) or silently dropped (writes and invalidations).

use std::sync::Arc;
use std::time::Duration;

use mnemo_core::CacheAdapter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Shared handle services use for all cache traffic.
#[derive(Clone)]
pub struct BestEffortCache {
    inner: Arc<dyn CacheAdapter>,
}

impl BestEffortCache {
    pub fn new(inner: Arc<dyn CacheAdapter>) -> Self {
        Self { inner }
    }

    /// Name of the wrapped backend.
    pub fn backend(&self) -> &str {
        self.inner.name()
    }

    /// Read and decode a JSON value. Any failure is a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.inner.get(key).await {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Encode and store a JSON value.
    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "cache value not serializable, skipping write");
                return;
            }
        };
        if let Err(e) = self.inner.set(key, raw, ttl).await {
            warn!(key, error = %e, "cache write failed");
        }
    }

    /// Remove specific keys.
    pub async fn invalidate(&self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        if let Err(e) = self.inner.delete(keys).await {
            warn!(keys = ?keys, error = %e, "cache invalidation failed");
        }
    }

    /// Remove every key under `prefix`.
    pub async fn invalidate_prefix(&self, prefix: &str) {
        match self.inner.delete_prefix(prefix).await {
            Ok(removed) => debug!(prefix, removed, "cache prefix invalidated"),
            Err(e) => warn!(prefix, error = %e, "cache prefix invalidation failed"),
        }
    }
}
