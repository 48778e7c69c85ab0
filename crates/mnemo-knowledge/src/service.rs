// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The knowledge base service: ingestion, lifecycle, search.

use std::sync::Arc;

use mnemo_config::model::KnowledgeConfig;
use mnemo_core::traits::embedding::embed_one;
use mnemo_core::{EmbeddingAdapter, GenerationAdapter, MnemoError};
use mnemo_storage::queries::documents;
use mnemo_storage::{now_timestamp, Database, DocumentQuery, DocumentRecord};
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::enrich::{build_enriched_prompt, EnrichOptions, EnrichedPrompt};
use crate::pipeline::{Pipeline, SourceInfo};
use crate::search::{rank_chunks, SearchHit, SearchOptions};
use crate::types::{
    BulkError, BulkReport, Document, DocumentFilter, DocumentStatus, IngestOutcome,
    IngestReceipt, KnowledgeStats, NewDocument,
};

/// Owner-scoped knowledge documents backed by SQLite and an embedding provider.
///
/// Built once at startup and shared behind an `Arc`.
pub struct KnowledgeBase {
    db: Database,
    embedder: Arc<dyn EmbeddingAdapter>,
    pipeline: Pipeline,
    config: KnowledgeConfig,
    background: TaskTracker,
}

impl KnowledgeBase {
    pub fn new(
        db: Database,
        embedder: Arc<dyn EmbeddingAdapter>,
        generator: Arc<dyn GenerationAdapter>,
        config: KnowledgeConfig,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(embedder.clone(), generator, config.clone()),
            db,
            embedder,
            config,
            background: TaskTracker::new(),
        }
    }

    /// Create a document and process it before returning.
    pub async fn ingest_knowledge(
        &self,
        owner_id: &str,
        doc: NewDocument,
    ) -> Result<IngestReceipt, MnemoError> {
        let document_id = self.create(owner_id, doc).await?;
        let outcome = self.process_document(owner_id, &document_id).await?;
        Ok(IngestReceipt {
            document_id,
            outcome,
        })
    }

    /// Create a document and process it on a background task.
    ///
    /// Returns as soon as the `pending` row exists. Progress is observable
    /// through the document's status.
    pub async fn submit_knowledge(
        self: &Arc<Self>,
        owner_id: &str,
        doc: NewDocument,
    ) -> Result<String, MnemoError> {
        let document_id = self.create(owner_id, doc).await?;

        let this = Arc::clone(self);
        let owner = owner_id.to_string();
        let id = document_id.clone();
        self.background.spawn(async move {
            if let Err(e) = this.process_document(&owner, &id).await {
                warn!(owner = %owner, document_id = %id, error = %e, "background ingestion failed");
            }
        });

        Ok(document_id)
    }

    /// Stop accepting background ingestion and wait for what is in flight.
    pub async fn shutdown(&self) {
        self.background.close();
        if !self.background.is_empty() {
            info!(pending = self.background.len(), "waiting for background ingestion");
        }
        self.background.wait().await;
    }

    /// Run the pipeline on an existing document.
    pub async fn process_document(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<IngestOutcome, MnemoError> {
        self.drive(owner_id, id, DocumentStatus::Processing, None)
            .await
    }

    /// Replace a document's text and reprocess it from scratch.
    pub async fn update_content(
        &self,
        owner_id: &str,
        id: &str,
        raw_text: &str,
    ) -> Result<IngestOutcome, MnemoError> {
        self.drive(
            owner_id,
            id,
            DocumentStatus::Processing,
            Some(raw_text.to_string()),
        )
        .await
    }

    /// Refresh a ready document with new content (`ready → syncing → ready|error`).
    pub async fn resync_document(
        &self,
        owner_id: &str,
        id: &str,
        raw_text: &str,
    ) -> Result<IngestOutcome, MnemoError> {
        self.drive(
            owner_id,
            id,
            DocumentStatus::Syncing,
            Some(raw_text.to_string()),
        )
        .await
    }

    /// Process every pending document of an owner, one at a time.
    pub async fn process_pending(&self, owner_id: &str) -> Result<BulkReport, MnemoError> {
        let pending = documents::list_documents(
            &self.db,
            owner_id,
            &DocumentQuery {
                status: Some(DocumentStatus::Pending.as_str().to_string()),
                ..DocumentQuery::default()
            },
        )
        .await?;

        let mut report = BulkReport::default();
        for doc in pending {
            match self.process_document(owner_id, &doc.id).await {
                Ok(IngestOutcome::Ready { .. }) => report.processed += 1,
                Ok(IngestOutcome::AlreadyRunning) => {}
                Ok(IngestOutcome::Failed { error }) => {
                    report.failed += 1;
                    report.errors.push(BulkError {
                        document_id: doc.id,
                        error,
                    });
                }
                Err(e) => {
                    report.failed += 1;
                    report.errors.push(BulkError {
                        document_id: doc.id,
                        error: e.to_string(),
                    });
                }
            }
        }
        info!(
            owner = %owner_id,
            processed = report.processed,
            failed = report.failed,
            "pending documents processed"
        );
        Ok(report)
    }

    /// Fetch a document, recording the access.
    pub async fn get_document(&self, owner_id: &str, id: &str) -> Result<Document, MnemoError> {
        let record = documents::get_document(&self.db, owner_id, id)
            .await?
            .ok_or_else(|| MnemoError::not_found("document", id))?;
        if let Err(e) = documents::touch_document(&self.db, owner_id, id).await {
            warn!(document_id = %id, error = %e, "failed to record document access");
        }
        Document::try_from(record)
    }

    pub async fn list_documents(
        &self,
        owner_id: &str,
        filter: &DocumentFilter,
    ) -> Result<Vec<Document>, MnemoError> {
        let query = DocumentQuery {
            status: filter.status.map(|s| s.as_str().to_string()),
            doc_type: filter.doc_type.map(|t| t.to_string()),
            category: filter.category.map(|c| c.to_string()),
            limit: filter.limit,
        };
        documents::list_documents(&self.db, owner_id, &query)
            .await?
            .into_iter()
            .map(Document::try_from)
            .collect()
    }

    /// Delete a document and its chunks.
    pub async fn delete_document(&self, owner_id: &str, id: &str) -> Result<(), MnemoError> {
        if !documents::delete_document(&self.db, owner_id, id).await? {
            return Err(MnemoError::not_found("document", id));
        }
        info!(owner = %owner_id, document_id = %id, "document deleted");
        Ok(())
    }

    pub async fn knowledge_stats(&self, owner_id: &str) -> Result<KnowledgeStats, MnemoError> {
        Ok(documents::document_counts(&self.db, owner_id).await?.into())
    }

    /// Rank an owner's ready chunks against `query`.
    ///
    /// Failing to embed the query is an error; an owner with nothing ready
    /// gets an empty result.
    pub async fn search_knowledge(
        &self,
        owner_id: &str,
        query: &str,
        options: SearchOptions,
    ) -> Result<Vec<SearchHit>, MnemoError> {
        require_non_empty("owner_id", owner_id)?;
        require_non_empty("query", query)?;
        let limit = options.limit.unwrap_or(self.config.search_limit);
        let threshold = options.threshold.unwrap_or(self.config.search_threshold);

        let query_vec = embed_one(self.embedder.as_ref(), query).await?;
        let candidates =
            documents::search_candidates(&self.db, owner_id, DocumentStatus::Ready.as_str())
                .await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let scanned = candidates.len();
        let hits = rank_chunks(&query_vec, candidates, limit, threshold);
        debug!(owner = %owner_id, scanned, hits = hits.len(), "knowledge search");

        let mut referenced: Vec<String> =
            hits.iter().map(|h| h.source.document_id.clone()).collect();
        referenced.sort();
        referenced.dedup();
        if let Err(e) = documents::record_references(&self.db, owner_id, &referenced).await {
            warn!(owner = %owner_id, error = %e, "failed to record document references");
        }

        Ok(hits)
    }

    /// Append relevant knowledge to a system prompt.
    ///
    /// Never fails: on any retrieval error the original prompt comes back
    /// with the error text attached.
    pub async fn enhance_prompt(
        &self,
        owner_id: &str,
        system_prompt: &str,
        user_message: &str,
        options: EnrichOptions,
    ) -> EnrichedPrompt {
        let search = SearchOptions {
            limit: Some(options.context_limit),
            threshold: Some(options.threshold),
        };
        match self.search_knowledge(owner_id, user_message, search).await {
            Ok(hits) => build_enriched_prompt(system_prompt, &hits),
            Err(e) => {
                warn!(owner = %owner_id, error = %e, "prompt enrichment failed");
                EnrichedPrompt::unchanged(system_prompt, Some(e.to_string()))
            }
        }
    }

    /// Stored chunks of a document, in order.
    pub async fn chunks(
        &self,
        owner_id: &str,
        id: &str,
    ) -> Result<Vec<mnemo_storage::ChunkRecord>, MnemoError> {
        documents::get_chunks(&self.db, owner_id, id).await
    }

    async fn create(&self, owner_id: &str, doc: NewDocument) -> Result<String, MnemoError> {
        require_non_empty("owner_id", owner_id)?;
        require_non_empty("name", &doc.name)?;
        require_non_empty("raw_text", &doc.raw_text)?;

        let now = now_timestamp();
        let record = DocumentRecord {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.to_string(),
            name: doc.name,
            doc_type: doc.doc_type.to_string(),
            category: doc.category.to_string(),
            description: doc.description,
            tags: doc.tags,
            raw_text: doc.raw_text,
            summary: None,
            keywords: Vec::new(),
            status: DocumentStatus::Pending.as_str().to_string(),
            processing_error: None,
            times_referenced: 0,
            last_accessed_at: None,
            created_at: now.clone(),
            updated_at: now,
        };
        documents::insert_document(&self.db, &record).await?;
        info!(owner = %owner_id, document_id = %record.id, name = %record.name, "document created");
        Ok(record.id)
    }

    /// Claim the document for `target`, run the pipeline, and commit the result.
    async fn drive(
        &self,
        owner_id: &str,
        id: &str,
        target: DocumentStatus,
        new_text: Option<String>,
    ) -> Result<IngestOutcome, MnemoError> {
        let sources = DocumentStatus::sources_of(target);
        let from: Vec<&str> = sources.iter().map(|s| s.as_str()).collect();

        let claimed =
            documents::begin_transition(&self.db, owner_id, id, &from, target.as_str(), new_text)
                .await?;
        if !claimed {
            let Some(record) = documents::get_document(&self.db, owner_id, id).await? else {
                return Err(MnemoError::not_found("document", id));
            };
            let current = Document::try_from(record)?.status;
            if current.is_busy() {
                debug!(document_id = %id, status = %current, "ingestion already running");
                return Ok(IngestOutcome::AlreadyRunning);
            }
            return Err(MnemoError::Validation(format!(
                "document {id} cannot move from {current} to {target}"
            )));
        }

        match self.run_claimed(owner_id, id, target).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                // A claimed row left in processing/syncing would refuse every later run.
                let released = documents::fail_processing(
                    &self.db,
                    id,
                    &e.to_string(),
                    DocumentStatus::Error.as_str(),
                )
                .await;
                if let Err(release) = released {
                    warn!(document_id = %id, error = %release, "failed to release document claim");
                }
                Err(e)
            }
        }
    }

    /// Run the pipeline on a claimed document and commit the outcome.
    async fn run_claimed(
        &self,
        owner_id: &str,
        id: &str,
        target: DocumentStatus,
    ) -> Result<IngestOutcome, MnemoError> {
        // The claim guarantees nobody else changes the row until we finish.
        let record = documents::get_document(&self.db, owner_id, id)
            .await?
            .ok_or_else(|| MnemoError::not_found("document", id))?;
        let source = SourceInfo {
            id: &record.id,
            name: &record.name,
            doc_type: &record.doc_type,
        };

        match self.pipeline.run(source, &record.raw_text).await {
            Ok(processed) => {
                let chunks = processed.chunks.len();
                let committed = documents::complete_processing(
                    &self.db,
                    id,
                    processed,
                    &[target.as_str()],
                    DocumentStatus::Ready.as_str(),
                )
                .await?;
                if !committed {
                    return Err(MnemoError::not_found("document", id));
                }
                info!(owner = %owner_id, document_id = %id, chunks, "document ready");
                Ok(IngestOutcome::Ready { chunks })
            }
            Err(e) => {
                let error = e.to_string();
                documents::fail_processing(&self.db, id, &error, DocumentStatus::Error.as_str())
                    .await?;
                warn!(owner = %owner_id, document_id = %id, error = %error, "document processing failed");
                Ok(IngestOutcome::Failed { error })
            }
        }
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), MnemoError> {
    if value.trim().is_empty() {
        return Err(MnemoError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
