// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Document processing: chunk, embed, extract keywords, summarize.
//!
//! The pipeline is pure with respect to storage. It produces a
//! [`ProcessedDocument`] that the service commits in a single transaction,
//! or a [`PipelineError`] whose text becomes the document's `processing_error`.

use std::sync::Arc;

use mnemo_config::model::KnowledgeConfig;
use mnemo_core::text::{extract_keywords, summarize_prefix, truncate_chars};
use mnemo_core::types::{EmbeddingInput, GenerationRequest};
use mnemo_core::{EmbeddingAdapter, GenerationAdapter, MnemoError};
use mnemo_storage::{ChunkRecord, ProcessedDocument};
use thiserror::Error;
use tracing::{debug, warn};

use crate::chunker::chunk_text;

/// Texts sent per embedding call.
const EMBED_BATCH: usize = 64;

const SUMMARY_SYSTEM: &str =
    "You are a helpful assistant that creates concise summaries of documents and data.";

/// Why a document could not be processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no content to process")]
    NoContent,

    #[error("embedding failed: {0}")]
    Embedding(MnemoError),

    #[error("embedding provider returned {got} vectors for {expected} chunks")]
    VectorCount { expected: usize, got: usize },
}

/// Identity stamped into every chunk's metadata.
pub struct SourceInfo<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub doc_type: &'a str,
}

pub struct Pipeline {
    embedder: Arc<dyn EmbeddingAdapter>,
    generator: Arc<dyn GenerationAdapter>,
    config: KnowledgeConfig,
}

impl Pipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingAdapter>,
        generator: Arc<dyn GenerationAdapter>,
        config: KnowledgeConfig,
    ) -> Self {
        Self {
            embedder,
            generator,
            config,
        }
    }

    pub async fn run(
        &self,
        source: SourceInfo<'_>,
        text: &str,
    ) -> Result<ProcessedDocument, PipelineError> {
        let pieces = chunk_text(text, self.config.chunk_words);
        if pieces.is_empty() {
            return Err(PipelineError::NoContent);
        }

        let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(pieces.len());
        for batch in pieces.chunks(EMBED_BATCH) {
            let output = self
                .embedder
                .embed(EmbeddingInput {
                    texts: batch.iter().map(|c| c.text.clone()).collect(),
                })
                .await
                .map_err(PipelineError::Embedding)?;
            if output.embeddings.len() != batch.len() {
                return Err(PipelineError::VectorCount {
                    expected: batch.len(),
                    got: output.embeddings.len(),
                });
            }
            embeddings.extend(output.embeddings);
        }
        debug!(document_id = source.id, chunks = pieces.len(), "chunks embedded");

        let metadata = serde_json::json!({
            "sourceId": source.id,
            "sourceName": source.name,
            "type": source.doc_type,
        });
        let chunks = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(piece, embedding)| ChunkRecord {
                chunk_index: piece.chunk_index as i64,
                text: piece.text,
                embedding,
                metadata: metadata.clone(),
            })
            .collect();

        Ok(ProcessedDocument {
            chunks,
            keywords: extract_keywords(text, self.config.keyword_count),
            summary: self.summarize(source.id, text).await,
        })
    }

    /// Ask the generator for a summary, falling back to a plain prefix.
    async fn summarize(&self, document_id: &str, text: &str) -> String {
        let max_chars = self.config.summary_fallback_chars;
        let excerpt = summarize_prefix(text, self.config.summary_input_chars);
        let request = GenerationRequest::new(
            format!(
                "Please provide a concise summary (max {max_chars} characters) of the following content:\n\n{excerpt}"
            ),
            self.config.summary_max_tokens,
        )
        .with_system(SUMMARY_SYSTEM)
        .with_temperature(0.5);

        match self.generator.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => truncate_chars(text, max_chars).to_string(),
            Err(e) => {
                warn!(document_id, error = %e, "summary generation failed, using text prefix");
                truncate_chars(text, max_chars).to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::{MockEmbedder, MockGenerator};

    fn source() -> SourceInfo<'static> {
        SourceInfo {
            id: "doc-1",
            name: "faq.txt",
            doc_type: "text",
        }
    }

    fn pipeline(embedder: MockEmbedder, generator: MockGenerator, chunk_words: usize) -> Pipeline {
        Pipeline::new(
            Arc::new(embedder),
            Arc::new(generator),
            KnowledgeConfig {
                chunk_words,
                ..KnowledgeConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn produces_chunks_keywords_and_summary() {
        let generator = MockGenerator::with_responses(vec!["A short FAQ.".to_string()]);
        let p = pipeline(MockEmbedder::new(), generator.clone(), 3);

        let out = p
            .run(source(), "refund policy refund window shipping times")
            .await
            .unwrap();
        assert_eq!(out.chunks.len(), 2);
        assert_eq!(out.chunks[1].chunk_index, 1);
        assert_eq!(out.chunks[0].metadata["sourceName"], "faq.txt");
        assert_eq!(out.keywords[0], "refund");
        assert_eq!(out.summary, "A short FAQ.");

        let prompts = generator.prompts().await;
        assert!(prompts[0].contains("refund policy"));
    }

    #[tokio::test]
    async fn empty_text_is_no_content() {
        let p = pipeline(MockEmbedder::new(), MockGenerator::new(), 800);
        let err = p.run(source(), "   ").await.unwrap_err();
        assert_eq!(err.to_string(), "no content to process");
    }

    #[tokio::test]
    async fn embedding_failure_aborts() {
        let embedder = MockEmbedder::new();
        embedder.set_failing(true);
        let p = pipeline(embedder, MockGenerator::new(), 800);
        let err = p.run(source(), "some real words").await.unwrap_err();
        assert!(matches!(err, PipelineError::Embedding(_)));
    }

    #[tokio::test]
    async fn summary_falls_back_to_prefix() {
        let generator = MockGenerator::new();
        generator.set_failing(true);
        let p = pipeline(MockEmbedder::new(), generator, 800);
        let text = "x".repeat(600);
        let out = p.run(source(), &text).await.unwrap();
        assert_eq!(out.summary.chars().count(), 500);
    }
}
