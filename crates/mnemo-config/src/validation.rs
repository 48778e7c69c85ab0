// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.

use crate::diagnostic::ConfigError;
use crate::model::MnemoConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const CACHE_BACKENDS: &[&str] = &["memory", "none"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Collects every problem instead of failing on the first one.
pub fn validate_config(config: &MnemoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::invalid(
            "service.log_level",
            format!(
                "`{}` is not one of {}",
                config.service.log_level,
                LOG_LEVELS.join(", ")
            ),
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::invalid(
            "storage.database_path",
            "must not be empty",
        ));
    }

    for (field, url) in [
        ("embedding.base_url", &config.embedding.base_url),
        ("generation.base_url", &config.generation.base_url),
    ] {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            errors.push(ConfigError::invalid(
                field,
                format!("`{url}` must start with http:// or https://"),
            ));
        }
    }

    if config.embedding.max_input_chars == 0 {
        errors.push(ConfigError::invalid(
            "embedding.max_input_chars",
            "must be at least 1",
        ));
    }

    let knowledge = &config.knowledge;
    if knowledge.chunk_words == 0 {
        errors.push(ConfigError::invalid(
            "knowledge.chunk_words",
            "must be at least 1",
        ));
    }
    if !(-1.0..=1.0).contains(&knowledge.search_threshold) {
        errors.push(ConfigError::invalid(
            "knowledge.search_threshold",
            format!(
                "must be within [-1.0, 1.0], got {}",
                knowledge.search_threshold
            ),
        ));
    }
    if knowledge.search_limit == 0 {
        errors.push(ConfigError::invalid(
            "knowledge.search_limit",
            "must be at least 1",
        ));
    }

    if config.memory.recall_limit == 0 {
        errors.push(ConfigError::invalid(
            "memory.recall_limit",
            "must be at least 1",
        ));
    }

    let context = &config.context;
    if context.window_messages == 0 {
        errors.push(ConfigError::invalid(
            "context.window_messages",
            "must be at least 1",
        ));
    }
    if context.summarize_every == 0 {
        errors.push(ConfigError::invalid(
            "context.summarize_every",
            "must be at least 1",
        ));
    }
    if context.recall_min_importance > 10 {
        errors.push(ConfigError::invalid(
            "context.recall_min_importance",
            format!(
                "must be within 0..=10, got {}",
                context.recall_min_importance
            ),
        ));
    }

    if !CACHE_BACKENDS.contains(&config.cache.backend.as_str()) {
        errors.push(ConfigError::invalid(
            "cache.backend",
            format!(
                "`{}` is not one of {}",
                config.cache.backend,
                CACHE_BACKENDS.join(", ")
            ),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
