// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory domain types.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::time::Duration;

use mnemo_core::MnemoError;
use mnemo_storage::MemoryRecord;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Source tag for memories stored directly by a caller.
pub const SOURCE_VOICE: &str = "voice";

/// Source tag for memories produced by conversation fact extraction.
pub const SOURCE_EXTRACTION: &str = "conversation_extraction";

/// What kind of thing a memory records.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MemoryCategory {
    #[default]
    Fact,
    Preference,
    Context,
    Conversation,
}

/// A stored memory, without its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memory {
    pub id: String,
    pub owner_id: String,
    pub session_id: Option<String>,
    pub key: String,
    pub value: String,
    pub summary: String,
    pub category: MemoryCategory,
    pub importance: u8,
    pub source: String,
    pub access_count: i64,
    pub last_accessed: Option<String>,
    pub expires_at: Option<String>,
    pub created_at: String,
}

impl TryFrom<MemoryRecord> for Memory {
    type Error = MnemoError;

    fn try_from(record: MemoryRecord) -> Result<Self, Self::Error> {
        let category = MemoryCategory::from_str(&record.category).map_err(|_| {
            MnemoError::Internal(format!(
                "unrecognized memory category `{}` in store",
                record.category
            ))
        })?;
        Ok(Memory {
            id: record.id,
            owner_id: record.owner_id,
            session_id: record.session_id,
            key: record.key,
            value: record.value,
            summary: record.summary,
            category,
            importance: record.importance,
            source: record.source,
            access_count: record.access_count,
            last_accessed: record.last_accessed,
            expires_at: record.expires_at,
            created_at: record.created_at,
        })
    }
}

/// Options for [`crate::MemoryService::store_memory`].
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub category: MemoryCategory,
    /// 0 to 10 inclusive.
    pub importance: u8,
    pub session_id: Option<String>,
    /// Soft expiry relative to now.
    pub expires_in: Option<Duration>,
    pub source: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            category: MemoryCategory::Fact,
            importance: 5,
            session_id: None,
            expires_in: None,
            source: SOURCE_VOICE.to_string(),
        }
    }
}

/// Returned by a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredMemory {
    pub id: String,
    pub summary: String,
}

/// Options for [`crate::MemoryService::recall_memory`].
#[derive(Debug, Clone, Default)]
pub struct RecallOptions {
    /// Defaults to `memory.recall_limit`.
    pub limit: Option<usize>,
    pub category: Option<MemoryCategory>,
    pub min_importance: u8,
}

/// A recalled memory and its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMemory {
    #[serde(flatten)]
    pub memory: Memory,
    pub similarity: f32,
}

/// Result of a recall.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recall {
    pub memories: Vec<ScoredMemory>,
    pub summary: String,
}

/// Listing order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MemorySort {
    #[default]
    Recent,
    Important,
    Frequent,
}

/// Options for [`crate::MemoryService::list_memories`].
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub category: Option<MemoryCategory>,
    /// Defaults to `memory.list_limit`.
    pub limit: Option<usize>,
    pub sort: MemorySort,
}

/// Aggregate view of an owner's memories.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total: i64,
    pub by_category: BTreeMap<String, i64>,
    pub most_accessed: Vec<Memory>,
    pub conversations: i64,
}
