// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Mnemo memory engine.

use thiserror::Error;

/// The primary error type used across all Mnemo adapters and services.
#[derive(Debug, Error)]
pub enum MnemoError {
    /// Configuration errors (invalid TOML, missing credentials, bad values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed caller input, rejected before any I/O takes place.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced entity does not exist or is not owned by the caller.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Embedding or text-generation provider errors (network, quota, bad payload).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Cache backend unreachable. Absorbed by the best-effort cache wrapper.
    #[error("cache unavailable: {0}")]
    CacheUnavailable(String),

    /// Fact extraction failed. Logged by the conversation manager, never surfaced.
    #[error("extraction error: {0}")]
    Extraction(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MnemoError {
    /// Shorthand for a [`MnemoError::NotFound`] with an owned id.
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        MnemoError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Wrap any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        MnemoError::Storage {
            source: Box::new(err),
        }
    }

    /// Returns true if this error means the entity is missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MnemoError::NotFound { .. })
    }
}
