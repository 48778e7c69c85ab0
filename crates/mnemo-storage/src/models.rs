// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for storage entities.
//!
//! Enumerated columns (status, type, category, role) are plain strings here;
//! the domain crates own the typed enums and their transition rules.

use serde::{Deserialize, Serialize};

/// A knowledge document row, without its chunks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub doc_type: String,
    pub category: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub raw_text: String,
    pub summary: Option<String>,
    pub keywords: Vec<String>,
    pub status: String,
    pub processing_error: Option<String>,
    pub times_referenced: i64,
    pub last_accessed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One embedded chunk of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub chunk_index: i64,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: serde_json::Value,
}

/// A chunk joined with the identity of its parent document, used for search.
#[derive(Debug, Clone)]
pub struct ChunkCandidate {
    pub document_id: String,
    pub document_name: String,
    pub doc_type: String,
    pub category: String,
    pub chunk: ChunkRecord,
}

/// Fields written when a document finishes processing.
#[derive(Debug, Clone)]
pub struct ProcessedDocument {
    pub chunks: Vec<ChunkRecord>,
    pub keywords: Vec<String>,
    pub summary: String,
}

/// Filter for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    pub status: Option<String>,
    pub doc_type: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
}

/// Per-owner document aggregates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentCounts {
    pub total: i64,
    pub by_status: Vec<(String, i64)>,
    pub by_type: Vec<(String, i64)>,
    pub by_category: Vec<(String, i64)>,
    pub total_chunks: i64,
    pub total_chars: i64,
}

/// A memory row.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRecord {
    pub id: String,
    pub owner_id: String,
    pub session_id: Option<String>,
    pub key: String,
    pub value: String,
    pub summary: String,
    pub category: String,
    pub importance: u8,
    pub embedding: Vec<f32>,
    pub source: String,
    pub access_count: i64,
    pub last_accessed: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

/// Candidate filter for recall.
#[derive(Debug, Clone)]
pub struct MemoryQuery {
    pub owner_id: String,
    pub category: Option<String>,
    pub min_importance: u8,
    /// Records with `expires_at <= now` are excluded.
    pub now: String,
    pub limit: usize,
}

/// Ordering for memory listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryOrder {
    /// Newest first.
    Recent,
    /// Highest importance first, newest breaking ties.
    Important,
    /// Most accessed first, newest breaking ties.
    Frequent,
}

/// Per-owner memory aggregates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryCounts {
    pub total: i64,
    pub by_category: Vec<(String, i64)>,
    pub most_accessed: Vec<MemoryRecord>,
}

/// A conversation session row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub owner_id: String,
    pub status: String,
    pub summary: Option<String>,
    pub topic: Option<String>,
    pub message_count: i64,
    pub total_duration_secs: Option<i64>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub updated_at: String,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub session_id: String,
    pub seq: i64,
    pub role: String,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}
