// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cache backend that stores nothing. Selected with `cache.backend = "none"`.

use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::{AdapterType, CacheAdapter, HealthStatus, MnemoError, PluginAdapter};

/// Every read misses and every write is discarded.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

#[async_trait]
impl PluginAdapter for NoopCache {
    fn name(&self) -> &str {
        "none"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Cache
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl CacheAdapter for NoopCache {
    async fn get(&self, _key: &str) -> Result<Option<String>, MnemoError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), MnemoError> {
        Ok(())
    }

    async fn delete(&self, _keys: &[String]) -> Result<(), MnemoError> {
        Ok(())
    }

    async fn delete_prefix(&self, _prefix: &str) -> Result<usize, MnemoError> {
        Ok(0)
    }
}
