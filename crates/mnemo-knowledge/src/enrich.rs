// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! System prompt enrichment with retrieved knowledge.

use serde::Serialize;

use crate::search::SearchHit;

/// Retrieval settings for [`crate::KnowledgeBase::enhance_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct EnrichOptions {
    pub context_limit: usize,
    pub threshold: f32,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            context_limit: 3,
            threshold: 0.7,
        }
    }
}

/// A context block that made it into the prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextUsed {
    pub source: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub similarity: f32,
}

/// The prompt to send, plus what was added to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedPrompt {
    pub prompt: String,
    pub contexts_used: Vec<ContextUsed>,
    /// Set when retrieval failed and the original prompt was returned.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EnrichedPrompt {
    pub(crate) fn unchanged(prompt: &str, error: Option<String>) -> Self {
        Self {
            prompt: prompt.to_string(),
            contexts_used: Vec::new(),
            error,
        }
    }
}

/// Append a knowledge-base section listing `hits` to `system_prompt`.
pub fn build_enriched_prompt(system_prompt: &str, hits: &[SearchHit]) -> EnrichedPrompt {
    if hits.is_empty() {
        return EnrichedPrompt::unchanged(system_prompt, None);
    }

    let context = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| format!("[Context {} from {}]:\n{}\n", i + 1, hit.source.name, hit.text))
        .collect::<Vec<_>>()
        .join("\n");

    let prompt = format!(
        "{system_prompt}\n\n---\n\nADDITIONAL CONTEXT FROM KNOWLEDGE BASE:\n\
         You have access to the following information to help answer questions:\n\n\
         {context}\n\
         Use this information when relevant to provide accurate, detailed responses. \
         If the user's question relates to this context, reference it naturally in your answer. \
         If it doesn't relate, you can ignore it.\n\n---"
    );

    EnrichedPrompt {
        prompt,
        contexts_used: hits
            .iter()
            .map(|hit| ContextUsed {
                source: hit.source.name.clone(),
                doc_type: hit.source.doc_type.clone(),
                similarity: hit.similarity,
            })
            .collect(),
        error: None,
    }
}
