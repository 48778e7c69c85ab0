// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge domain types and the document status state machine.

use std::collections::BTreeMap;
use std::str::FromStr;

use mnemo_core::MnemoError;
use mnemo_storage::{DocumentCounts, DocumentRecord};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Lifecycle state of a knowledge document.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Created, not yet processed.
    Pending,
    /// Claimed by an ingestion run.
    Processing,
    /// Chunks and embeddings committed; searchable.
    Ready,
    /// Last run failed; `processing_error` says why.
    Error,
    /// A ready document being refreshed with new content.
    Syncing,
}

impl DocumentStatus {
    /// Whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        match (self, next) {
            (Pending, Processing) => true,
            (Processing, Ready) | (Processing, Error) => true,
            (Ready, Syncing) => true,
            (Syncing, Ready) | (Syncing, Error) => true,
            // Re-ingestion replaces the whole chunk set.
            (Ready, Processing) | (Error, Processing) => true,
            (Pending, _) | (Processing, _) | (Ready, _) | (Error, _) | (Syncing, _) => false,
        }
    }

    /// Every status from which `target` can be entered.
    pub fn sources_of(target: DocumentStatus) -> Vec<DocumentStatus> {
        DocumentStatus::iter()
            .filter(|s| s.can_transition_to(target))
            .collect()
    }

    /// A run currently owns the document.
    pub fn is_busy(self) -> bool {
        matches!(self, DocumentStatus::Processing | DocumentStatus::Syncing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Pending => "pending",
            DocumentStatus::Processing => "processing",
            DocumentStatus::Ready => "ready",
            DocumentStatus::Error => "error",
            DocumentStatus::Syncing => "syncing",
        }
    }
}

/// Kind of source a document was created from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Document,
    Spreadsheet,
    Website,
    Api,
    Database,
    Media,
    Text,
    Conversation,
}

/// Business category used for filtering and stats.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Category {
    ProductInfo,
    Pricing,
    Policies,
    Faq,
    CustomerData,
    Scripts,
    Training,
    #[default]
    Other,
}

/// Request to create a knowledge document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDocument {
    pub name: String,
    pub doc_type: DocType,
    #[serde(default)]
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub raw_text: String,
}

impl NewDocument {
    pub fn new(name: impl Into<String>, doc_type: DocType, raw_text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            doc_type,
            category: Category::Other,
            description: None,
            tags: Vec::new(),
            raw_text: raw_text.into(),
        }
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// A knowledge document as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: DocType,
    pub category: Category,
    pub description: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip)]
    pub raw_text: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub status: DocumentStatus,
    pub processing_error: Option<String>,
    pub times_referenced: i64,
    pub last_accessed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<DocumentRecord> for Document {
    type Error = MnemoError;

    fn try_from(record: DocumentRecord) -> Result<Self, Self::Error> {
        Ok(Document {
            doc_type: parse_column(&record.doc_type, "doc_type")?,
            category: parse_column(&record.category, "category")?,
            status: parse_column(&record.status, "status")?,
            id: record.id,
            owner_id: record.owner_id,
            name: record.name,
            description: record.description,
            tags: record.tags,
            raw_text: record.raw_text,
            summary: record.summary,
            keywords: record.keywords,
            processing_error: record.processing_error,
            times_referenced: record.times_referenced,
            last_accessed_at: record.last_accessed_at,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

pub(crate) fn parse_column<T: FromStr>(value: &str, column: &str) -> Result<T, MnemoError> {
    T::from_str(value)
        .map_err(|_| MnemoError::Internal(format!("unrecognized {column} `{value}` in store")))
}

/// Result of driving a document through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IngestOutcome {
    /// Chunks committed and the document is searchable.
    Ready { chunks: usize },
    /// The run failed; the document is in `error` with this message.
    Failed { error: String },
    /// Another run holds the document; nothing was done.
    AlreadyRunning,
}

/// Returned by an inline ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReceipt {
    pub document_id: String,
    pub outcome: IngestOutcome,
}

/// Filter for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<DocType>,
    pub category: Option<Category>,
    pub limit: Option<usize>,
}

/// Outcome of processing every pending document of an owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<BulkError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkError {
    pub document_id: String,
    pub error: String,
}

/// Aggregate view of an owner's knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeStats {
    pub total: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_type: BTreeMap<String, i64>,
    pub by_category: BTreeMap<String, i64>,
    pub total_chunks: i64,
    pub total_chars: i64,
}

impl From<DocumentCounts> for KnowledgeStats {
    fn from(counts: DocumentCounts) -> Self {
        KnowledgeStats {
            total: counts.total,
            by_status: counts.by_status.into_iter().collect(),
            by_type: counts.by_type.into_iter().collect(),
            by_category: counts.by_category.into_iter().collect(),
            total_chunks: counts.total_chunks,
            total_chars: counts.total_chars,
        }
    }
}
