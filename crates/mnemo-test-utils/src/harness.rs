// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles the full service stack over a temp-file SQLite
//! database, a mock embedder, a mock generator and an in-process cache.

use std::sync::Arc;

use mnemo_cache::{BestEffortCache, InMemoryCache};
use mnemo_config::model::MnemoConfig;
use mnemo_context::ConversationManager;
use mnemo_core::{CacheAdapter, MnemoError};
use mnemo_knowledge::KnowledgeBase;
use mnemo_memory::MemoryService;
use mnemo_storage::Database;

use crate::mock_embedder::MockEmbedder;
use crate::mock_generator::MockGenerator;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    responses: Vec<String>,
    embedder: MockEmbedder,
    cache: Option<Arc<dyn CacheAdapter>>,
    config: MnemoConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            responses: Vec::new(),
            embedder: MockEmbedder::new(),
            cache: None,
            config: MnemoConfig::default(),
        }
    }

    /// Queue generator responses, consumed in order.
    pub fn with_mock_responses(mut self, responses: Vec<String>) -> Self {
        self.responses = responses;
        self
    }

    /// Use a preconfigured embedder (for example one with overrides).
    pub fn with_embedder(mut self, embedder: MockEmbedder) -> Self {
        self.embedder = embedder;
        self
    }

    /// Replace the in-process cache backend.
    pub fn with_cache(mut self, cache: Arc<dyn CacheAdapter>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_config(mut self, config: MnemoConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the harness, opening a fresh database in a temp directory.
    pub async fn build(self) -> Result<TestHarness, MnemoError> {
        let temp_dir = tempfile::TempDir::new().map_err(MnemoError::storage)?;
        let mut config = self.config;
        config.storage.database_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .into_owned();
        let db = Database::from_config(&config.storage).await?;

        let cache = BestEffortCache::new(
            self.cache
                .unwrap_or_else(|| Arc::new(InMemoryCache::new(config.cache.max_entries))),
        );
        let generator = MockGenerator::with_responses(self.responses);
        let embedder = self.embedder;

        let knowledge = Arc::new(KnowledgeBase::new(
            db.clone(),
            Arc::new(embedder.clone()),
            Arc::new(generator.clone()),
            config.knowledge.clone(),
        ));
        let memory = Arc::new(MemoryService::new(
            db.clone(),
            Arc::new(embedder.clone()),
            cache.clone(),
            config.memory.clone(),
        ));
        let conversations = Arc::new(ConversationManager::new(
            db.clone(),
            Arc::clone(&memory),
            Arc::new(generator.clone()),
            cache.clone(),
            config.context.clone(),
            config.extraction.clone(),
        ));

        Ok(TestHarness {
            embedder,
            generator,
            db,
            cache,
            knowledge,
            memory,
            conversations,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete Mnemo stack over mock providers and temp storage.
pub struct TestHarness {
    pub embedder: MockEmbedder,
    pub generator: MockGenerator,
    pub db: Database,
    pub cache: BestEffortCache,
    pub knowledge: Arc<KnowledgeBase>,
    pub memory: Arc<MemoryService>,
    pub conversations: Arc<ConversationManager>,
    pub config: MnemoConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// A harness with all defaults.
    pub async fn new() -> Result<Self, MnemoError> {
        Self::builder().build().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_builds_with_defaults() {
        let harness = TestHarness::new().await.unwrap();
        harness.db.ping().await.unwrap();
        assert_eq!(harness.cache.backend(), "memory");
        assert!(harness.config.storage.database_path.ends_with("test.db"));
    }
}
