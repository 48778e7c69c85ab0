// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory storage and semantic recall.
//!
//! Recall results are cached per owner under `recall:{hex(owner)}:{digest}` where
//! the digest covers the query and every filter. Any write for an owner drops
//! the whole `recall:{hex(owner)}:` prefix.

use std::sync::Arc;
use std::time::Duration;

use mnemo_cache::BestEffortCache;
use mnemo_config::model::MemoryConfig;
use mnemo_core::text::summarize_prefix;
use mnemo_core::traits::embedding::embed_one;
use mnemo_core::vector::cosine_similarity;
use mnemo_core::{EmbeddingAdapter, MnemoError};
use mnemo_storage::queries::{memories, sessions};
use mnemo_storage::{format_timestamp, now_timestamp, Database, MemoryOrder, MemoryQuery, MemoryRecord};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::types::{
    ListOptions, Memory, MemorySort, MemoryStats, Recall, RecallOptions, ScoredMemory,
    StoreOptions, StoredMemory,
};

/// Summary returned when recall finds nothing.
pub const NOTHING_RECALLED: &str = "I don't recall anything about that";

/// Number of entries in [`MemoryStats::most_accessed`].
const MOST_ACCESSED: usize = 5;

/// Owner-scoped long-term memory.
pub struct MemoryService {
    db: Database,
    embedder: Arc<dyn EmbeddingAdapter>,
    cache: BestEffortCache,
    config: MemoryConfig,
}

impl MemoryService {
    pub fn new(
        db: Database,
        embedder: Arc<dyn EmbeddingAdapter>,
        cache: BestEffortCache,
        config: MemoryConfig,
    ) -> Self {
        Self {
            db,
            embedder,
            cache,
            config,
        }
    }

    /// Embed and persist a memory.
    pub async fn store_memory(
        &self,
        owner_id: &str,
        key: &str,
        value: &str,
        options: StoreOptions,
    ) -> Result<StoredMemory, MnemoError> {
        require_non_empty("owner_id", owner_id)?;
        require_non_empty("key", key)?;
        require_non_empty("value", value)?;
        if options.importance > 10 {
            return Err(MnemoError::Validation(format!(
                "importance must be within 0..=10, got {}",
                options.importance
            )));
        }

        let now = chrono::Utc::now();
        let expires_at = match options.expires_in {
            Some(ttl) => Some(format_timestamp(expiry_after(now, ttl)?)),
            None => None,
        };

        let embedding = embed_one(self.embedder.as_ref(), value).await?;

        let record = MemoryRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            session_id: options.session_id,
            key: key.to_string(),
            value: value.to_string(),
            summary: summarize_prefix(value, self.config.summary_chars),
            category: options.category.to_string(),
            importance: options.importance,
            embedding,
            source: options.source,
            access_count: 0,
            last_accessed: None,
            expires_at,
            created_at: format_timestamp(now),
        };
        memories::insert_memory(&self.db, &record).await?;
        self.invalidate_recall(owner_id).await;

        info!(owner = %owner_id, memory_id = %record.id, key = %record.key, "memory stored");
        Ok(StoredMemory {
            id: record.id,
            summary: record.summary,
        })
    }

    /// Rank an owner's memories against `query`.
    ///
    /// Cache hits skip the embedding call and the access bookkeeping.
    pub async fn recall_memory(
        &self,
        owner_id: &str,
        query: &str,
        options: RecallOptions,
    ) -> Result<Recall, MnemoError> {
        require_non_empty("owner_id", owner_id)?;
        require_non_empty("query", query)?;
        let limit = options.limit.unwrap_or(self.config.recall_limit).max(1);

        let cache_key = recall_cache_key(owner_id, query, limit, &options);
        if let Some(cached) = self.cache.get_json::<Recall>(&cache_key).await {
            return Ok(drop_expired(cached, &now_timestamp()));
        }

        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        let now = now_timestamp();
        let candidates = memories::recall_candidates(
            &self.db,
            &MemoryQuery {
                owner_id: owner_id.to_string(),
                category: options.category.map(|c| c.to_string()),
                min_importance: options.min_importance,
                now: now.clone(),
                limit: limit * 2,
            },
        )
        .await?;
        let pool = candidates.len();

        let mut scored: Vec<(f32, MemoryRecord)> = candidates
            .into_iter()
            .map(|m| (cosine_similarity(&query_vec, &m.embedding), m))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(limit);

        let ids: Vec<String> = scored.iter().map(|(_, m)| m.id.clone()).collect();
        let accessed = match memories::record_access(&self.db, &ids, &now).await {
            Ok(()) => true,
            Err(e) => {
                warn!(owner = %owner_id, error = %e, "failed to record memory access");
                false
            }
        };

        let mut recalled = Vec::with_capacity(scored.len());
        for (similarity, record) in scored {
            let mut memory = Memory::try_from(record)?;
            if accessed {
                memory.access_count += 1;
                memory.last_accessed = Some(now.clone());
            }
            recalled.push(ScoredMemory { memory, similarity });
        }

        let recall = with_summary(recalled);
        debug!(owner = %owner_id, pool, recalled = recall.memories.len(), "memory recall");

        self.cache
            .set_json(
                &cache_key,
                &recall,
                Duration::from_secs(self.config.recall_cache_ttl_secs),
            )
            .await;
        Ok(recall)
    }

    pub async fn list_memories(
        &self,
        owner_id: &str,
        options: ListOptions,
    ) -> Result<Vec<Memory>, MnemoError> {
        let order = match options.sort {
            MemorySort::Recent => MemoryOrder::Recent,
            MemorySort::Important => MemoryOrder::Important,
            MemorySort::Frequent => MemoryOrder::Frequent,
        };
        let category = options.category.map(|c| c.to_string());
        memories::list_memories(
            &self.db,
            owner_id,
            category.as_deref(),
            order,
            options.limit.unwrap_or(self.config.list_limit),
        )
        .await?
        .into_iter()
        .map(Memory::try_from)
        .collect()
    }

    pub async fn delete_memory(&self, owner_id: &str, id: &str) -> Result<(), MnemoError> {
        if !memories::delete_memory(&self.db, owner_id, id).await? {
            return Err(MnemoError::not_found("memory", id));
        }
        self.invalidate_recall(owner_id).await;
        info!(owner = %owner_id, memory_id = %id, "memory deleted");
        Ok(())
    }

    /// Physically remove every expired memory, across all owners.
    pub async fn sweep_expired(&self) -> Result<usize, MnemoError> {
        let removed = memories::delete_expired(&self.db, &now_timestamp()).await?;
        if removed > 0 {
            info!(removed, "expired memories swept");
        }
        Ok(removed)
    }

    pub async fn memory_stats(&self, owner_id: &str) -> Result<MemoryStats, MnemoError> {
        let counts = memories::memory_counts(&self.db, owner_id, MOST_ACCESSED).await?;
        let conversations = sessions::count_sessions(&self.db, owner_id).await?;
        Ok(MemoryStats {
            total: counts.total,
            by_category: counts.by_category.into_iter().collect(),
            most_accessed: counts
                .most_accessed
                .into_iter()
                .map(Memory::try_from)
                .collect::<Result<_, _>>()?,
            conversations,
        })
    }

    async fn invalidate_recall(&self, owner_id: &str) {
        self.cache
            .invalidate_prefix(&recall_prefix(owner_id))
            .await;
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), MnemoError> {
    if value.trim().is_empty() {
        return Err(MnemoError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn recall_cache_key(owner_id: &str, query: &str, limit: usize, options: &RecallOptions) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    hasher.update([0]);
    hasher.update(limit.to_le_bytes());
    hasher.update(options.min_importance.to_le_bytes());
    if let Some(category) = options.category {
        hasher.update(category.to_string().as_bytes());
    }
    format!("{}{}", recall_prefix(owner_id), hex::encode(hasher.finalize()))
}

/// Owner ids are hex-encoded so no owner's prefix covers another's keys.
fn recall_prefix(owner_id: &str) -> String {
    format!("recall:{}:", hex::encode(owner_id.as_bytes()))
}

fn expiry_after(
    now: chrono::DateTime<chrono::Utc>,
    ttl: Duration,
) -> Result<chrono::DateTime<chrono::Utc>, MnemoError> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| MnemoError::Validation("expires_in is out of range".to_string()))
}

fn with_summary(memories: Vec<ScoredMemory>) -> Recall {
    let summary = memories
        .first()
        .map(|m| m.memory.value.clone())
        .unwrap_or_else(|| NOTHING_RECALLED.to_string());
    Recall { memories, summary }
}

/// Cached results may outlive a memory's expiry.
fn drop_expired(recall: Recall, now: &str) -> Recall {
    let before = recall.memories.len();
    let live: Vec<ScoredMemory> = recall
        .memories
        .into_iter()
        .filter(|m| m.memory.expires_at.as_deref().is_none_or(|at| at > now))
        .collect();
    if live.len() == before {
        return Recall {
            memories: live,
            summary: recall.summary,
        };
    }
    with_summary(live)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemoryCategory;
    use mnemo_cache::InMemoryCache;
    use mnemo_test_utils::{FailingCache, MockEmbedder};

    async fn service(embedder: MockEmbedder) -> MemoryService {
        let db = Database::open_in_memory().await.unwrap();
        MemoryService::new(
            db,
            Arc::new(embedder),
            BestEffortCache::new(Arc::new(InMemoryCache::new(100))),
            MemoryConfig::default(),
        )
    }

    #[tokio::test]
    async fn store_summarizes_long_values() {
        let svc = service(MockEmbedder::new()).await;
        let value = "v".repeat(150);
        let stored = svc
            .store_memory("alice", "long", &value, StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(stored.summary.chars().count(), 103);
        assert!(stored.summary.ends_with("..."));

        let short = svc
            .store_memory("alice", "short", "brief", StoreOptions::default())
            .await
            .unwrap();
        assert_eq!(short.summary, "brief");
    }

    #[tokio::test]
    async fn store_validates_before_io() {
        let embedder = MockEmbedder::new();
        let svc = service(embedder.clone()).await;
        let err = svc
            .store_memory("alice", "", "x", StoreOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
        let err = svc
            .store_memory(
                "alice",
                "k",
                "x",
                StoreOptions {
                    importance: 11,
                    ..StoreOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn relevant_memory_outranks_unrelated() {
        let embedder = MockEmbedder::new()
            .with_override("Alex", vec![0.9, 0.1, 0.0])
            .with_override("Blue", vec![0.0, 0.1, 0.9])
            .with_override("what is the user's name", vec![1.0, 0.0, 0.0]);
        let svc = service(embedder).await;
        svc.store_memory("alice", "user_name", "Alex", StoreOptions::default())
            .await
            .unwrap();
        svc.store_memory("alice", "favorite_color", "Blue", StoreOptions::default())
            .await
            .unwrap();

        let recall = svc
            .recall_memory("alice", "what is the user's name", RecallOptions::default())
            .await
            .unwrap();
        assert_eq!(recall.memories[0].memory.key, "user_name");
        assert_eq!(recall.summary, "Alex");
        assert!(recall.memories[0].similarity > recall.memories[1].similarity);
        assert_eq!(recall.memories[0].memory.access_count, 1);
    }

    #[tokio::test]
    async fn empty_recall_uses_sentinel() {
        let svc = service(MockEmbedder::new()).await;
        let recall = svc
            .recall_memory("alice", "anything", RecallOptions::default())
            .await
            .unwrap();
        assert!(recall.memories.is_empty());
        assert_eq!(recall.summary, NOTHING_RECALLED);
    }

    #[tokio::test]
    async fn expired_memories_are_invisible() {
        let svc = service(MockEmbedder::new()).await;
        svc.store_memory(
            "alice",
            "temp",
            "temporary code 1234",
            StoreOptions {
                expires_in: Some(Duration::ZERO),
                ..StoreOptions::default()
            },
        )
        .await
        .unwrap();
        let recall = svc
            .recall_memory("alice", "temporary code", RecallOptions::default())
            .await
            .unwrap();
        assert!(recall.memories.is_empty());
        assert_eq!(svc.sweep_expired().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn recall_is_cached_until_next_write() {
        let embedder = MockEmbedder::new();
        let svc = service(embedder.clone()).await;
        svc.store_memory("alice", "pet", "dog named Max", StoreOptions::default())
            .await
            .unwrap();

        let first = svc
            .recall_memory("alice", "dog", RecallOptions::default())
            .await
            .unwrap();
        let calls = embedder.calls();
        let second = svc
            .recall_memory("alice", "dog", RecallOptions::default())
            .await
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(embedder.calls(), calls);

        svc.store_memory("alice", "pet2", "cat named Tom", StoreOptions::default())
            .await
            .unwrap();
        let third = svc
            .recall_memory("alice", "dog", RecallOptions::default())
            .await
            .unwrap();
        assert_eq!(third.memories.len(), 2);
    }

    #[tokio::test]
    async fn recall_works_without_cache() {
        let db = Database::open_in_memory().await.unwrap();
        let cache = FailingCache::new();
        let svc = MemoryService::new(
            db,
            Arc::new(MockEmbedder::new()),
            BestEffortCache::new(Arc::new(cache.clone())),
            MemoryConfig::default(),
        );
        svc.store_memory("alice", "pet", "dog named Max", StoreOptions::default())
            .await
            .unwrap();
        let recall = svc
            .recall_memory("alice", "dog", RecallOptions::default())
            .await
            .unwrap();
        assert_eq!(recall.memories.len(), 1);
        assert!(cache.attempts() >= 3);
    }

    #[tokio::test]
    async fn recall_filters_by_category_and_importance() {
        let svc = service(MockEmbedder::new()).await;
        svc.store_memory(
            "alice",
            "likes",
            "likes jazz music",
            StoreOptions {
                category: MemoryCategory::Preference,
                importance: 8,
                ..StoreOptions::default()
            },
        )
        .await
        .unwrap();
        svc.store_memory(
            "alice",
            "heard",
            "heard jazz music once",
            StoreOptions {
                importance: 2,
                ..StoreOptions::default()
            },
        )
        .await
        .unwrap();

        let recall = svc
            .recall_memory(
                "alice",
                "jazz music",
                RecallOptions {
                    min_importance: 3,
                    ..RecallOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(recall.memories.len(), 1);
        assert_eq!(recall.memories[0].memory.key, "likes");

        let recall = svc
            .recall_memory(
                "alice",
                "jazz music",
                RecallOptions {
                    category: Some(MemoryCategory::Fact),
                    ..RecallOptions::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(recall.memories.len(), 1);
        assert_eq!(recall.memories[0].memory.key, "heard");
    }

    #[tokio::test]
    async fn delete_and_stats() {
        let svc = service(MockEmbedder::new()).await;
        let stored = svc
            .store_memory("alice", "k", "value", StoreOptions::default())
            .await
            .unwrap();
        let stats = svc.memory_stats("alice").await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.by_category.get("fact"), Some(&1));
        assert_eq!(stats.conversations, 0);

        svc.delete_memory("alice", &stored.id).await.unwrap();
        assert!(svc
            .delete_memory("alice", &stored.id)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(svc
            .list_memories("alice", ListOptions::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn cache_key_depends_on_filters() {
        let base = RecallOptions::default();
        let filtered = RecallOptions {
            min_importance: 3,
            ..RecallOptions::default()
        };
        let a = recall_cache_key("alice", "q", 5, &base);
        let b = recall_cache_key("alice", "q", 5, &filtered);
        assert_ne!(a, b);
        assert!(a.starts_with(&recall_prefix("alice")));
    }

    #[test]
    fn owner_prefixes_never_nest() {
        let key = recall_cache_key("alice:x", "q", 5, &RecallOptions::default());
        assert!(!key.starts_with(&recall_prefix("alice")));
    }

    #[tokio::test]
    async fn invalidation_leaves_other_owners_cached() {
        let embedder = MockEmbedder::new();
        let svc = service(embedder.clone()).await;
        svc.store_memory("alice:x", "pet", "dog named Max", StoreOptions::default())
            .await
            .unwrap();
        svc.recall_memory("alice:x", "dog", RecallOptions::default())
            .await
            .unwrap();
        let calls = embedder.calls();

        svc.store_memory("alice", "pet", "cat named Tom", StoreOptions::default())
            .await
            .unwrap();
        svc.recall_memory("alice:x", "dog", RecallOptions::default())
            .await
            .unwrap();
        // One embed for alice's store; the alice:x recall is still cached.
        assert_eq!(embedder.calls(), calls + 1);
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_rejected() {
        let embedder = MockEmbedder::new();
        let svc = service(embedder.clone()).await;
        let err = svc
            .store_memory(
                "alice",
                "k",
                "v",
                StoreOptions {
                    expires_in: Some(Duration::from_secs(10_000_000_000_000)),
                    ..StoreOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
        assert_eq!(embedder.calls(), 0);

        let err = svc
            .store_memory(
                "alice",
                "k",
                "v",
                StoreOptions {
                    expires_in: Some(Duration::MAX),
                    ..StoreOptions::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
    }
}
