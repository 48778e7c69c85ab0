// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A cache backend that is always unreachable.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::{AdapterType, CacheAdapter, HealthStatus, MnemoError, PluginAdapter};

/// Every operation fails with [`MnemoError::CacheUnavailable`] and is counted.
#[derive(Clone, Default)]
pub struct FailingCache {
    attempts: Arc<AtomicUsize>,
}

impl FailingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of operations attempted against this cache.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, MnemoError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(MnemoError::CacheUnavailable("connection refused".to_string()))
    }
}

#[async_trait]
impl PluginAdapter for FailingCache {
    fn name(&self) -> &str {
        "failing-cache"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Unhealthy("connection refused".to_string()))
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl CacheAdapter for FailingCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, MnemoError> {
        self.fail()
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), MnemoError> {
        self.fail()
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), MnemoError> {
        self.fail()
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, MnemoError> {
        self.fail()
    }
}
