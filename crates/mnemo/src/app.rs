// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service wiring: one instance of each service, built from configuration.

use std::sync::Arc;

use mnemo_config::model::MnemoConfig;
use mnemo_context::ConversationManager;
use mnemo_core::{EmbeddingAdapter, GenerationAdapter, MnemoError};
use mnemo_knowledge::KnowledgeBase;
use mnemo_memory::MemoryService;
use mnemo_openai::{OpenAiEmbedder, OpenAiGenerator};
use mnemo_storage::Database;
use tracing::info;

/// The assembled engine.
pub struct App {
    pub knowledge: Arc<KnowledgeBase>,
    pub memory: Arc<MemoryService>,
    pub conversations: Arc<ConversationManager>,
}

impl App {
    /// Open storage, connect providers and build the services.
    pub async fn open(config: &MnemoConfig) -> Result<Self, MnemoError> {
        let db = Database::from_config(&config.storage).await?;
        let embedder: Arc<dyn EmbeddingAdapter> = Arc::new(OpenAiEmbedder::new(&config.embedding)?);
        let generator: Arc<dyn GenerationAdapter> =
            Arc::new(OpenAiGenerator::new(&config.generation)?);
        let cache = mnemo_cache::from_config(&config.cache);

        let knowledge = Arc::new(KnowledgeBase::new(
            db.clone(),
            Arc::clone(&embedder),
            Arc::clone(&generator),
            config.knowledge.clone(),
        ));
        let memory = Arc::new(MemoryService::new(
            db.clone(),
            embedder,
            cache.clone(),
            config.memory.clone(),
        ));
        let conversations = Arc::new(ConversationManager::new(
            db,
            Arc::clone(&memory),
            generator,
            cache.clone(),
            config.context.clone(),
            config.extraction.clone(),
        ));

        info!(cache = cache.backend(), "mnemo services ready");
        Ok(Self {
            knowledge,
            memory,
            conversations,
        })
    }

    /// Drain background work before the runtime goes away.
    pub async fn shutdown(&self) {
        self.conversations.shutdown().await;
        self.knowledge.shutdown().await;
    }
}
