// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge ingestion and retrieval for the Mnemo memory engine.
//!
//! Documents are split into word windows, embedded, and stored with keywords
//! and a summary. Each document moves through an explicit status machine
//! (`pending → processing → ready | error`, `ready → syncing → ready | error`)
//! whose transitions are claimed atomically in storage, so at most one run is
//! ever in flight per document.

pub mod chunker;
pub mod enrich;
pub mod pipeline;
pub mod search;
pub mod service;
pub mod types;

pub use chunker::{chunk_text, TextChunk};
pub use enrich::{ContextUsed, EnrichOptions, EnrichedPrompt};
pub use search::{HitSource, SearchHit, SearchOptions};
pub use service::KnowledgeBase;
pub use types::{
    BulkError, BulkReport, Category, DocType, Document, DocumentFilter, DocumentStatus,
    IngestOutcome, IngestReceipt, KnowledgeStats, NewDocument,
};
