// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Mnemo memory engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Mnemo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MnemoConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Embedding provider settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Text-generation provider settings.
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Knowledge ingestion and search settings.
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// Memory store and recall settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Conversation context settings.
    #[serde(default)]
    pub context: ContextConfig,

    /// Fact extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Cache backend settings.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Name used in log output.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "mnemo".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("mnemo").join("mnemo.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("mnemo.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Embedding provider configuration (OpenAI-compatible `/embeddings` endpoint).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingConfig {
    /// Base URL of the API, without the `/embeddings` suffix.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Embedding model identifier.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Inputs longer than this many characters are truncated before embedding.
    #[serde(default = "default_max_input_chars")]
    pub max_input_chars: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: None,
            model: default_embedding_model(),
            timeout_secs: default_timeout_secs(),
            max_input_chars: default_max_input_chars(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_input_chars() -> usize {
    8000
}

/// Text-generation provider configuration (OpenAI-compatible `/chat/completions`).
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GenerationConfig {
    /// Base URL of the API, without the `/chat/completions` suffix.
    #[serde(default = "default_api_base_url")]
    pub base_url: String,

    /// API key. `None` falls back to the `OPENAI_API_KEY` environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for summaries and fact extraction.
    #[serde(default = "default_generation_model")]
    pub model: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_base_url(),
            api_key: None,
            model: default_generation_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Knowledge base ingestion and retrieval configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KnowledgeConfig {
    /// Target words per chunk.
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Number of keywords kept per document.
    #[serde(default = "default_keyword_count")]
    pub keyword_count: usize,

    /// Characters of raw text sent to the summarizer.
    #[serde(default = "default_summary_input_chars")]
    pub summary_input_chars: usize,

    /// Length of the fallback summary when the summarizer fails.
    #[serde(default = "default_summary_fallback_chars")]
    pub summary_fallback_chars: usize,

    /// Token budget for document summaries.
    #[serde(default = "default_summary_max_tokens")]
    pub summary_max_tokens: u32,

    /// Default number of search hits.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Default minimum similarity (exclusive) for search hits.
    #[serde(default = "default_search_threshold")]
    pub search_threshold: f32,

    /// Number of knowledge snippets appended when enriching a prompt.
    #[serde(default = "default_context_limit")]
    pub context_limit: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            chunk_words: default_chunk_words(),
            keyword_count: default_keyword_count(),
            summary_input_chars: default_summary_input_chars(),
            summary_fallback_chars: default_summary_fallback_chars(),
            summary_max_tokens: default_summary_max_tokens(),
            search_limit: default_search_limit(),
            search_threshold: default_search_threshold(),
            context_limit: default_context_limit(),
        }
    }
}

fn default_chunk_words() -> usize {
    800
}

fn default_keyword_count() -> usize {
    10
}

fn default_summary_input_chars() -> usize {
    10_000
}

fn default_summary_fallback_chars() -> usize {
    500
}

fn default_summary_max_tokens() -> u32 {
    200
}

fn default_search_limit() -> usize {
    5
}

fn default_search_threshold() -> f32 {
    0.7
}

fn default_context_limit() -> usize {
    3
}

/// Memory store and recall configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Default number of memories returned by recall.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Seconds a recall result stays cached.
    #[serde(default = "default_recall_cache_ttl_secs")]
    pub recall_cache_ttl_secs: u64,

    /// Characters of the value kept in a memory's summary.
    #[serde(default = "default_memory_summary_chars")]
    pub summary_chars: usize,

    /// Default page size for listing memories.
    #[serde(default = "default_list_limit")]
    pub list_limit: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            recall_limit: default_recall_limit(),
            recall_cache_ttl_secs: default_recall_cache_ttl_secs(),
            summary_chars: default_memory_summary_chars(),
            list_limit: default_list_limit(),
        }
    }
}

fn default_recall_limit() -> usize {
    5
}

fn default_recall_cache_ttl_secs() -> u64 {
    300
}

fn default_memory_summary_chars() -> usize {
    100
}

fn default_list_limit() -> usize {
    50
}

/// Conversation context configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ContextConfig {
    /// Number of recent messages included in an assembled context.
    #[serde(default = "default_window_messages")]
    pub window_messages: usize,

    /// A background summary is scheduled every this many messages.
    #[serde(default = "default_summarize_every")]
    pub summarize_every: usize,

    /// Sessions shorter than this are not summarized (unless forced).
    #[serde(default = "default_min_messages_for_summary")]
    pub min_messages_for_summary: usize,

    /// Trailing characters of the window used as the recall query.
    #[serde(default = "default_recall_query_chars")]
    pub recall_query_chars: usize,

    /// Memories attached to a full context.
    #[serde(default = "default_recall_limit")]
    pub recall_limit: usize,

    /// Minimum importance of memories attached to a full context.
    #[serde(default = "default_recall_min_importance")]
    pub recall_min_importance: u8,

    /// Seconds a fast (no recall) context stays cached.
    #[serde(default = "default_fast_cache_ttl_secs")]
    pub fast_cache_ttl_secs: u64,

    /// Seconds a full context stays cached.
    #[serde(default = "default_full_cache_ttl_secs")]
    pub full_cache_ttl_secs: u64,

    /// Token budget for conversation summaries.
    #[serde(default = "default_conversation_summary_max_tokens")]
    pub summary_max_tokens: u32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            window_messages: default_window_messages(),
            summarize_every: default_summarize_every(),
            min_messages_for_summary: default_min_messages_for_summary(),
            recall_query_chars: default_recall_query_chars(),
            recall_limit: default_recall_limit(),
            recall_min_importance: default_recall_min_importance(),
            fast_cache_ttl_secs: default_fast_cache_ttl_secs(),
            full_cache_ttl_secs: default_full_cache_ttl_secs(),
            summary_max_tokens: default_conversation_summary_max_tokens(),
        }
    }
}

fn default_window_messages() -> usize {
    20
}

fn default_summarize_every() -> usize {
    10
}

fn default_min_messages_for_summary() -> usize {
    5
}

fn default_recall_query_chars() -> usize {
    500
}

fn default_recall_min_importance() -> u8 {
    3
}

fn default_fast_cache_ttl_secs() -> u64 {
    60
}

fn default_full_cache_ttl_secs() -> u64 {
    30
}

fn default_conversation_summary_max_tokens() -> u32 {
    100
}

/// Fact extraction configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Run extraction when a conversation ends.
    #[serde(default = "default_extraction_enabled")]
    pub enabled: bool,

    /// Sessions with less user text than this are skipped.
    #[serde(default = "default_min_user_chars")]
    pub min_user_chars: usize,

    /// Token budget for the extraction call.
    #[serde(default = "default_extraction_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: default_extraction_enabled(),
            min_user_chars: default_min_user_chars(),
            max_tokens: default_extraction_max_tokens(),
        }
    }
}

fn default_extraction_enabled() -> bool {
    true
}

fn default_min_user_chars() -> usize {
    50
}

fn default_extraction_max_tokens() -> u32 {
    500
}

/// Cache backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Backend: `memory` (in-process) or `none` (caching disabled).
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Upper bound on live entries for the in-memory backend.
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            max_entries: default_cache_max_entries(),
        }
    }
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_cache_max_entries() -> usize {
    10_000
}
