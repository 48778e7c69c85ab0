// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedding adapter trait for vector embedding generation.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{EmbeddingInput, EmbeddingOutput};

/// Adapter for generating vector embeddings from text.
///
/// Embedding adapters power knowledge search and memory recall by
/// converting content into vector representations. Failures are reported
/// as [`MnemoError::Provider`].
#[async_trait]
pub trait EmbeddingAdapter: PluginAdapter {
    /// Generates embeddings for the given input.
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError>;
}

/// Embed a single text and return its vector.
pub async fn embed_one(
    embedder: &dyn EmbeddingAdapter,
    text: &str,
) -> Result<Vec<f32>, MnemoError> {
    let output = embedder.embed(EmbeddingInput::single(text)).await?;
    output
        .embeddings
        .into_iter()
        .next()
        .ok_or_else(|| MnemoError::Provider {
            message: "embedding provider returned no vectors".to_string(),
            source: None,
        })
}
