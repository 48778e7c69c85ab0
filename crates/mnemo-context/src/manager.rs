// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle, message persistence and context assembly.

use std::sync::Arc;
use std::time::Duration;

use mnemo_cache::BestEffortCache;
use mnemo_config::model::{ContextConfig, ExtractionConfig};
use mnemo_core::text::tail_chars;
use mnemo_core::{GenerationAdapter, MnemoError};
use mnemo_memory::{FactExtractor, MemoryService, RecallOptions, ScoredMemory};
use mnemo_storage::queries::sessions;
use mnemo_storage::{now_timestamp, parse_timestamp, Database, SessionRecord};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::summary::Summarizer;
use crate::types::{
    ContextOptions, ConversationContext, EndReport, Message, Role, Session, SessionStatus,
};

/// Owns every conversation session.
pub struct ConversationManager {
    db: Database,
    memory: Arc<MemoryService>,
    extractor: FactExtractor,
    summarizer: Summarizer,
    cache: BestEffortCache,
    config: ContextConfig,
    background: TaskTracker,
}

impl ConversationManager {
    pub fn new(
        db: Database,
        memory: Arc<MemoryService>,
        generator: Arc<dyn GenerationAdapter>,
        cache: BestEffortCache,
        config: ContextConfig,
        extraction: ExtractionConfig,
    ) -> Self {
        Self {
            summarizer: Summarizer::new(db.clone(), Arc::clone(&generator), config.clone()),
            extractor: FactExtractor::new(generator, extraction),
            db,
            memory,
            cache,
            config,
            background: TaskTracker::new(),
        }
    }

    /// Append a message, creating or reactivating the session as needed.
    ///
    /// Every `context.summarize_every`-th message schedules a background
    /// summary that the caller never waits on. [`Self::shutdown`] drains them.
    pub async fn add_message(
        &self,
        owner_id: &str,
        session_id: &str,
        role: Role,
        content: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<Message, MnemoError> {
        require_non_empty("owner_id", owner_id)?;
        require_non_empty("session_id", session_id)?;
        require_non_empty("content", content)?;

        let now = now_timestamp();
        // Concurrent first turns race here; only one insert wins and the rest
        // fall through to the ownership and status checks.
        if sessions::create_session(&self.db, &new_session(owner_id, session_id, &now)).await? {
            info!(owner = %owner_id, session_id = %session_id, "conversation started");
        }
        let record = sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| MnemoError::not_found("session", session_id))?;
        let session = owned(record, owner_id, session_id)?;
        match session.status {
            SessionStatus::Active => {}
            SessionStatus::Ended => {
                sessions::set_status(&self.db, session_id, SessionStatus::Active.as_str(), &now)
                    .await?;
                info!(session_id = %session_id, "conversation reactivated");
            }
            SessionStatus::Archived => {
                return Err(MnemoError::Validation(format!(
                    "session {session_id} is archived"
                )));
            }
        }

        let seq = sessions::append_message(
            &self.db,
            session_id,
            role.as_str(),
            content,
            metadata.clone(),
            &now,
        )
        .await?;
        self.invalidate_context(session_id).await;

        let every = self.config.summarize_every as i64;
        if every > 0 && seq % every == 0 {
            let summarizer = self.summarizer.clone();
            let sid = session_id.to_string();
            self.background.spawn(async move {
                if let Err(e) = summarizer.summarize(&sid, false).await {
                    warn!(session_id = %sid, error = %e, "background summary failed");
                }
            });
        }

        Ok(Message {
            seq,
            role,
            content: content.to_string(),
            metadata,
            created_at: now,
        })
    }

    /// Wait for every scheduled background summary to finish.
    ///
    /// Call before the runtime is dropped, otherwise in-flight summaries are
    /// cancelled mid-request.
    pub async fn shutdown(&self) {
        self.background.close();
        if !self.background.is_empty() {
            info!(pending = self.background.len(), "waiting for background summaries");
        }
        self.background.wait().await;
    }

    /// Assemble the recent window, summary and (unless fast) relevant memories.
    pub async fn get_context(
        &self,
        session_id: &str,
        owner_id: &str,
        options: ContextOptions,
    ) -> Result<ConversationContext, MnemoError> {
        let (key, ttl) = if options.skip_memory_recall {
            (fast_key(session_id), self.config.fast_cache_ttl_secs)
        } else {
            (full_key(session_id), self.config.full_cache_ttl_secs)
        };

        if let Some(cached) = self.cache.get_json::<ConversationContext>(&key).await {
            if cached.owner_id == owner_id {
                return Ok(cached);
            }
            return Err(MnemoError::not_found("session", session_id));
        }

        let session = self.load(owner_id, session_id).await?;
        let messages = sessions::recent_messages(&self.db, session_id, self.config.window_messages)
            .await?
            .into_iter()
            .map(Message::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let memories = if options.skip_memory_recall {
            Vec::new()
        } else {
            self.recall_for(owner_id, session_id, &messages).await
        };

        let context = ConversationContext {
            session_id: session.session_id,
            owner_id: session.owner_id,
            messages,
            memories,
            summary: session.summary,
            topic: session.topic,
            message_count: session.message_count,
        };
        self.cache
            .set_json(&key, &context, Duration::from_secs(ttl))
            .await;
        Ok(context)
    }

    /// Final summary, fact extraction, then mark the session ended.
    ///
    /// Extraction problems are logged and reported as zero extracted facts.
    pub async fn end_conversation(
        &self,
        owner_id: &str,
        session_id: &str,
    ) -> Result<EndReport, MnemoError> {
        let session = self.load(owner_id, session_id).await?;
        if !session.status.can_transition_to(SessionStatus::Ended) {
            return Err(MnemoError::Validation(format!(
                "session {session_id} cannot be ended from {}",
                session.status
            )));
        }

        let summary = self
            .summarizer
            .summarize(session_id, true)
            .await?
            .or(session.summary);

        let extracted = self.extract_and_store(owner_id, session_id).await?;

        let end_time = chrono::Utc::now();
        let duration = parse_timestamp(&session.start_time)
            .map(|start| (end_time - start).num_seconds().max(0))
            .unwrap_or(0);
        sessions::end_session(
            &self.db,
            session_id,
            SessionStatus::Ended.as_str(),
            &mnemo_storage::format_timestamp(end_time),
            duration,
        )
        .await?;
        self.invalidate_context(session_id).await;

        info!(
            owner = %owner_id,
            session_id = %session_id,
            extracted,
            duration_secs = duration,
            "conversation ended"
        );
        Ok(EndReport { summary, extracted })
    }

    /// Freeze a session. Archived sessions reject new messages.
    pub async fn archive_session(&self, owner_id: &str, session_id: &str) -> Result<(), MnemoError> {
        let session = self.load(owner_id, session_id).await?;
        if !session.status.can_transition_to(SessionStatus::Archived) {
            return Err(MnemoError::Validation(format!(
                "session {session_id} is already archived"
            )));
        }
        sessions::set_status(
            &self.db,
            session_id,
            SessionStatus::Archived.as_str(),
            &now_timestamp(),
        )
        .await?;
        self.invalidate_context(session_id).await;
        info!(owner = %owner_id, session_id = %session_id, "conversation archived");
        Ok(())
    }

    pub async fn get_session(&self, owner_id: &str, session_id: &str) -> Result<Session, MnemoError> {
        self.load(owner_id, session_id).await
    }

    async fn load(&self, owner_id: &str, session_id: &str) -> Result<Session, MnemoError> {
        let record = sessions::get_session(&self.db, session_id)
            .await?
            .ok_or_else(|| MnemoError::not_found("session", session_id))?;
        owned(record, owner_id, session_id)
    }

    async fn recall_for(
        &self,
        owner_id: &str,
        session_id: &str,
        messages: &[Message],
    ) -> Vec<ScoredMemory> {
        let window_text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let query = tail_chars(&window_text, self.config.recall_query_chars).trim();
        if query.is_empty() {
            return Vec::new();
        }

        let options = RecallOptions {
            limit: Some(self.config.recall_limit),
            category: None,
            min_importance: self.config.recall_min_importance,
        };
        match self.memory.recall_memory(owner_id, query, options).await {
            Ok(recall) => recall.memories,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "memory recall for context failed");
                Vec::new()
            }
        }
    }

    async fn extract_and_store(&self, owner_id: &str, session_id: &str) -> Result<usize, MnemoError> {
        let user_text = sessions::all_messages(&self.db, session_id)
            .await?
            .into_iter()
            .filter(|m| m.role == Role::User.as_str())
            .map(|m| m.content)
            .collect::<Vec<_>>()
            .join("\n");

        let facts = match self.extractor.extract(&user_text).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "fact extraction failed");
                return Ok(0);
            }
        };

        let mut stored = 0;
        for fact in facts {
            let options = fact.store_options(session_id);
            match self
                .memory
                .store_memory(owner_id, &fact.key, &fact.value, options)
                .await
            {
                Ok(_) => stored += 1,
                Err(e) => {
                    warn!(session_id = %session_id, key = %fact.key, error = %e, "failed to store extracted fact");
                }
            }
        }
        debug!(session_id = %session_id, stored, "extracted facts stored");
        Ok(stored)
    }

    async fn invalidate_context(&self, session_id: &str) {
        self.cache
            .invalidate(&[fast_key(session_id), full_key(session_id)])
            .await;
    }
}

fn fast_key(session_id: &str) -> String {
    format!("context:fast:{session_id}")
}

fn full_key(session_id: &str) -> String {
    format!("context:full:{session_id}")
}

fn new_session(owner_id: &str, session_id: &str, now: &str) -> SessionRecord {
    SessionRecord {
        session_id: session_id.to_string(),
        owner_id: owner_id.to_string(),
        status: SessionStatus::Active.as_str().to_string(),
        summary: None,
        topic: None,
        message_count: 0,
        total_duration_secs: None,
        start_time: now.to_string(),
        end_time: None,
        updated_at: now.to_string(),
    }
}

/// Sessions of other owners are reported as missing.
fn owned(record: SessionRecord, owner_id: &str, session_id: &str) -> Result<Session, MnemoError> {
    if record.owner_id != owner_id {
        return Err(MnemoError::not_found("session", session_id));
    }
    Session::try_from(record)
}

fn require_non_empty(field: &str, value: &str) -> Result<(), MnemoError> {
    if value.trim().is_empty() {
        return Err(MnemoError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_cache::InMemoryCache;
    use mnemo_config::model::MemoryConfig;
    use mnemo_memory::StoreOptions;
    use mnemo_test_utils::{MockEmbedder, MockGenerator};

    struct Fixture {
        manager: ConversationManager,
        memory: Arc<MemoryService>,
        generator: MockGenerator,
        embedder: MockEmbedder,
    }

    async fn fixture() -> Fixture {
        let db = Database::open_in_memory().await.unwrap();
        let cache = BestEffortCache::new(Arc::new(InMemoryCache::new(100)));
        let embedder = MockEmbedder::new();
        let generator = MockGenerator::new();
        let memory = Arc::new(MemoryService::new(
            db.clone(),
            Arc::new(embedder.clone()),
            cache.clone(),
            MemoryConfig::default(),
        ));
        let manager = ConversationManager::new(
            db,
            Arc::clone(&memory),
            Arc::new(generator.clone()),
            cache,
            ContextConfig::default(),
            ExtractionConfig::default(),
        );
        Fixture {
            manager,
            memory,
            generator,
            embedder,
        }
    }

    #[tokio::test]
    async fn first_message_creates_session() {
        let f = fixture().await;
        let msg = f
            .manager
            .add_message("alice", "s1", Role::User, "hello", None)
            .await
            .unwrap();
        assert_eq!(msg.seq, 1);
        let session = f.manager.get_session("alice", "s1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.message_count, 1);
    }

    #[tokio::test]
    async fn concurrent_first_messages_share_one_session() {
        let f = fixture().await;
        let (a, b) = tokio::join!(
            f.manager.add_message("alice", "s-new", Role::User, "first", None),
            f.manager.add_message("alice", "s-new", Role::User, "second", None),
        );
        let mut seqs = vec![a.unwrap().seq, b.unwrap().seq];
        seqs.sort();
        assert_eq!(seqs, vec![1, 2]);

        let session = f.manager.get_session("alice", "s-new").await.unwrap();
        assert_eq!(session.message_count, 2);
    }

    #[tokio::test]
    async fn foreign_owner_sees_not_found() {
        let f = fixture().await;
        f.manager
            .add_message("alice", "s1", Role::User, "hello", None)
            .await
            .unwrap();
        let err = f
            .manager
            .add_message("mallory", "s1", Role::User, "hi", None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = f
            .manager
            .get_context("s1", "mallory", ContextOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn unknown_session_context_is_not_found() {
        let f = fixture().await;
        let err = f
            .manager
            .get_context("nope", "alice", ContextOptions::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn context_window_keeps_latest_messages() {
        let f = fixture().await;
        for i in 0..25 {
            f.manager
                .add_message("alice", "s1", Role::User, &format!("message {i}"), None)
                .await
                .unwrap();
        }
        let ctx = f
            .manager
            .get_context(
                "s1",
                "alice",
                ContextOptions {
                    skip_memory_recall: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(ctx.messages.len(), 20);
        assert_eq!(ctx.messages[0].content, "message 5");
        assert_eq!(ctx.messages[19].content, "message 24");
        assert_eq!(ctx.message_count, 25);
        assert!(ctx.memories.is_empty());
    }

    #[tokio::test]
    async fn full_context_recalls_important_memories() {
        let f = fixture().await;
        f.memory
            .store_memory(
                "alice",
                "allergy",
                "allergic to peanuts",
                StoreOptions {
                    importance: 9,
                    ..StoreOptions::default()
                },
            )
            .await
            .unwrap();
        f.memory
            .store_memory(
                "alice",
                "trivia",
                "once ate peanuts at a fair",
                StoreOptions {
                    importance: 1,
                    ..StoreOptions::default()
                },
            )
            .await
            .unwrap();
        f.manager
            .add_message("alice", "s1", Role::User, "can you suggest a snack without peanuts", None)
            .await
            .unwrap();

        let ctx = f
            .manager
            .get_context("s1", "alice", ContextOptions::default())
            .await
            .unwrap();
        assert_eq!(ctx.memories.len(), 1);
        assert_eq!(ctx.memories[0].memory.key, "allergy");
    }

    #[tokio::test]
    async fn cached_context_is_invalidated_by_new_messages() {
        let f = fixture().await;
        f.manager
            .add_message("alice", "s1", Role::User, "first", None)
            .await
            .unwrap();
        f.manager
            .get_context("s1", "alice", ContextOptions::default())
            .await
            .unwrap();
        let calls = f.embedder.calls();

        let again = f
            .manager
            .get_context("s1", "alice", ContextOptions::default())
            .await
            .unwrap();
        assert_eq!(again.messages.len(), 1);
        assert_eq!(f.embedder.calls(), calls);

        f.manager
            .add_message("alice", "s1", Role::Assistant, "second", None)
            .await
            .unwrap();
        let fresh = f
            .manager
            .get_context("s1", "alice", ContextOptions::default())
            .await
            .unwrap();
        assert_eq!(fresh.messages.len(), 2);
    }

    #[tokio::test]
    async fn end_skips_extraction_for_short_sessions() {
        let f = fixture().await;
        f.manager
            .add_message("alice", "s1", Role::User, "hi, thanks a lot!!!", None)
            .await
            .unwrap();
        let report = f.manager.end_conversation("alice", "s1").await.unwrap();
        assert_eq!(report.extracted, 0);
        assert_eq!(report.summary.as_deref(), Some("mock response"));
        // Only the forced summary reached the generator.
        assert_eq!(f.generator.prompts().await.len(), 1);

        let session = f.manager.get_session("alice", "s1").await.unwrap();
        assert_eq!(session.status, SessionStatus::Ended);
        assert!(session.end_time.is_some());
        assert!(session.total_duration_secs.is_some());
    }

    #[tokio::test]
    async fn end_stores_extracted_facts() {
        let f = fixture().await;
        f.generator.add_response("They talked about the bakery.").await;
        f.generator
            .add_response(r#"{"memories": [{"key": "business", "value": "owns a bakery in Lyon", "importance": 7}]}"#)
            .await;
        f.manager
            .add_message(
                "alice",
                "s1",
                Role::User,
                "I own a bakery in Lyon and we bake sourdough every single morning.",
                None,
            )
            .await
            .unwrap();

        let report = f.manager.end_conversation("alice", "s1").await.unwrap();
        assert_eq!(report.extracted, 1);
        assert_eq!(report.summary.as_deref(), Some("They talked about the bakery."));

        let stored = f
            .memory
            .list_memories("alice", Default::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source, "conversation_extraction");
        assert_eq!(stored[0].session_id.as_deref(), Some("s1"));
        assert_eq!(stored[0].category, mnemo_memory::MemoryCategory::Conversation);
    }

    #[tokio::test]
    async fn extraction_garbage_never_fails_end() {
        let f = fixture().await;
        f.generator.add_response("summary").await;
        f.generator.add_response("not json at all").await;
        f.manager
            .add_message(
                "alice",
                "s1",
                Role::User,
                "I own a bakery in Lyon and we bake sourdough every single morning.",
                None,
            )
            .await
            .unwrap();
        let report = f.manager.end_conversation("alice", "s1").await.unwrap();
        assert_eq!(report.extracted, 0);
    }

    #[tokio::test]
    async fn ended_sessions_reactivate_and_archived_reject() {
        let f = fixture().await;
        f.manager
            .add_message("alice", "s1", Role::User, "hello", None)
            .await
            .unwrap();
        f.manager.end_conversation("alice", "s1").await.unwrap();

        f.manager
            .add_message("alice", "s1", Role::User, "back again", None)
            .await
            .unwrap();
        assert_eq!(
            f.manager.get_session("alice", "s1").await.unwrap().status,
            SessionStatus::Active
        );

        f.manager.archive_session("alice", "s1").await.unwrap();
        let err = f
            .manager
            .add_message("alice", "s1", Role::User, "anyone?", None)
            .await
            .unwrap_err();
        assert!(matches!(err, MnemoError::Validation(_)));
        assert!(matches!(
            f.manager.end_conversation("alice", "s1").await.unwrap_err(),
            MnemoError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn tenth_message_summary_completes_before_shutdown_returns() {
        let f = fixture().await;
        for i in 0..10 {
            f.manager
                .add_message("alice", "s1", Role::User, &format!("note number {i}"), None)
                .await
                .unwrap();
        }
        f.manager.shutdown().await;
        let summary = f.manager.get_session("alice", "s1").await.unwrap().summary;
        assert_eq!(summary.as_deref(), Some("mock response"));
    }
}
