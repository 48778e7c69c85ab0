// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LLM-based fact extraction from conversations.
//!
//! The generator is asked for `{"memories": [{key, value, category,
//! importance}]}`. Bare arrays and markdown code fences are tolerated since
//! models produce both regardless of instructions.

use std::str::FromStr;
use std::sync::Arc;

use mnemo_config::model::ExtractionConfig;
use mnemo_core::types::GenerationRequest;
use mnemo_core::{GenerationAdapter, MnemoError};
use serde_json::Value;
use tracing::debug;

use crate::types::{MemoryCategory, StoreOptions, SOURCE_EXTRACTION};

const EXTRACTION_PROMPT: &str = "Extract important facts, preferences, or information from this \
conversation that should be remembered for future interactions. Return a JSON object of the \
form {\"memories\": [{\"key\": ..., \"value\": ..., \"category\": ..., \"importance\": ...}]}.

Conversation:
{conversation}

Return only memorable information like preferences, personal facts, business details, or \
important context. Skip greetings and small talk.";

const DEFAULT_IMPORTANCE: u8 = 5;

/// A fact proposed by the generator, normalised for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFact {
    pub key: String,
    pub value: String,
    pub category: MemoryCategory,
    pub importance: u8,
}

impl ExtractedFact {
    /// Store options tagging this fact as extracted from `session_id`.
    pub fn store_options(&self, session_id: &str) -> StoreOptions {
        StoreOptions {
            category: self.category,
            importance: self.importance,
            session_id: Some(session_id.to_string()),
            expires_in: None,
            source: SOURCE_EXTRACTION.to_string(),
        }
    }
}

/// Asks a generation provider which parts of a conversation are worth keeping.
pub struct FactExtractor {
    generator: Arc<dyn GenerationAdapter>,
    config: ExtractionConfig,
}

impl FactExtractor {
    pub fn new(generator: Arc<dyn GenerationAdapter>, config: ExtractionConfig) -> Self {
        Self { generator, config }
    }

    /// Extract facts from the user's side of a conversation.
    ///
    /// Text shorter than `extraction.min_user_chars` yields nothing without a
    /// provider call. An unparseable response is [`MnemoError::Extraction`].
    pub async fn extract(&self, user_text: &str) -> Result<Vec<ExtractedFact>, MnemoError> {
        if !self.config.enabled {
            return Ok(Vec::new());
        }
        let chars = user_text.trim().chars().count();
        if chars < self.config.min_user_chars {
            debug!(chars, "user text too short for extraction");
            return Ok(Vec::new());
        }

        let prompt = EXTRACTION_PROMPT.replace("{conversation}", user_text);
        let response = self
            .generator
            .complete(GenerationRequest::new(prompt, self.config.max_tokens))
            .await?;
        let facts = parse_extraction_response(&response.content)?;
        debug!(facts = facts.len(), "facts extracted");
        Ok(facts)
    }
}

/// Parse a generator response into facts.
///
/// Entries missing a key or a value are dropped. Unknown categories become
/// [`MemoryCategory::Conversation`] and importance is clamped to `0..=10`.
pub fn parse_extraction_response(response: &str) -> Result<Vec<ExtractedFact>, MnemoError> {
    let body = strip_code_fence(response.trim());
    let parsed = serde_json::from_str::<Value>(body)
        .ok()
        .or_else(|| embedded_json(body, '{', '}'))
        .or_else(|| embedded_json(body, '[', ']'))
        .ok_or_else(|| {
            MnemoError::Extraction(format!(
                "response is not JSON: {}",
                mnemo_core::text::truncate_chars(body, 80)
            ))
        })?;

    let entries = match parsed {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("memories") {
            Some(Value::Array(entries)) => entries,
            _ => {
                return Err(MnemoError::Extraction(
                    "response object has no `memories` array".to_string(),
                ))
            }
        },
        _ => {
            return Err(MnemoError::Extraction(
                "response is neither an object nor an array".to_string(),
            ))
        }
    };

    Ok(entries.iter().filter_map(fact_from_value).collect())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the language tag line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn embedded_json(text: &str, open: char, close: char) -> Option<Value> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

fn fact_from_value(entry: &Value) -> Option<ExtractedFact> {
    let key = scalar_text(entry.get("key")?)?;
    let value = scalar_text(entry.get("value")?)?;
    let category = entry
        .get("category")
        .and_then(Value::as_str)
        .and_then(|c| MemoryCategory::from_str(&c.trim().to_lowercase()).ok())
        .unwrap_or(MemoryCategory::Conversation);
    let importance = entry
        .get("importance")
        .and_then(|v| v.as_f64().or_else(|| v.as_str()?.trim().parse().ok()))
        .map_or(DEFAULT_IMPORTANCE, |n| n.round().clamp(0.0, 10.0) as u8);
    Some(ExtractedFact {
        key,
        value,
        category,
        importance,
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_test_utils::MockGenerator;

    fn extractor(generator: &MockGenerator) -> FactExtractor {
        FactExtractor::new(Arc::new(generator.clone()), ExtractionConfig::default())
    }

    #[test]
    fn parses_memories_object() {
        let facts = parse_extraction_response(
            r#"{"memories": [
                {"key": "user_name", "value": "Alex", "category": "fact", "importance": 8},
                {"key": "drink", "value": "oat latte", "category": "preference"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].key, "user_name");
        assert_eq!(facts[0].importance, 8);
        assert_eq!(facts[1].category, MemoryCategory::Preference);
        assert_eq!(facts[1].importance, 5);
    }

    #[test]
    fn parses_fenced_bare_array() {
        let facts = parse_extraction_response(
            "```json\n[{\"key\": \"city\", \"value\": \"Berlin\", \"category\": \"context\"}]\n```",
        )
        .unwrap();
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].value, "Berlin");
        assert_eq!(facts[0].category, MemoryCategory::Context);
    }

    #[test]
    fn parses_json_inside_prose() {
        let facts = parse_extraction_response(
            "Sure! Here you go:\n{\"memories\": [{\"key\": \"pet\", \"value\": \"Max\"}]}\nDone.",
        )
        .unwrap();
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn normalizes_category_and_importance() {
        let facts = parse_extraction_response(
            r#"[
                {"key": "a", "value": "x", "category": "personal", "importance": 42},
                {"key": "b", "value": 7, "category": "PREFERENCE", "importance": "-3"},
                {"key": "", "value": "dropped"},
                {"value": "no key"}
            ]"#,
        )
        .unwrap();
        assert_eq!(facts.len(), 2);
        assert_eq!(facts[0].category, MemoryCategory::Conversation);
        assert_eq!(facts[0].importance, 10);
        assert_eq!(facts[1].value, "7");
        assert_eq!(facts[1].category, MemoryCategory::Preference);
        assert_eq!(facts[1].importance, 0);
    }

    #[test]
    fn rejects_non_json() {
        let err = parse_extraction_response("I could not find anything.").unwrap_err();
        assert!(matches!(err, MnemoError::Extraction(_)));
        let err = parse_extraction_response(r#"{"facts": []}"#).unwrap_err();
        assert!(matches!(err, MnemoError::Extraction(_)));
    }

    #[tokio::test]
    async fn short_text_skips_generator() {
        let generator = MockGenerator::new();
        let facts = extractor(&generator).extract("hi there, thanks!").await.unwrap();
        assert!(facts.is_empty());
        assert!(generator.prompts().await.is_empty());
    }

    #[tokio::test]
    async fn substantive_text_is_sent_to_generator() {
        let generator = MockGenerator::with_responses(vec![
            r#"{"memories": [{"key": "business", "value": "runs a bakery in Lyon", "category": "context", "importance": 7}]}"#.to_string(),
        ]);
        let text = "I run a small bakery in Lyon and we open at six every morning.";
        let facts = extractor(&generator).extract(text).await.unwrap();
        assert_eq!(facts.len(), 1);

        let requests = generator.requests().await;
        assert_eq!(requests.len(), 1);
        assert!(requests[0].prompt.contains(text));
        assert!(requests[0].prompt.contains("Skip greetings and small talk."));
        assert!(requests[0].prompt.contains(r#"{"memories": [{"key""#));
        assert!(!requests[0].prompt.contains("JSON array"));
        assert_eq!(requests[0].max_tokens, 500);

        let opts = facts[0].store_options("s-1");
        assert_eq!(opts.source, SOURCE_EXTRACTION);
        assert_eq!(opts.session_id.as_deref(), Some("s-1"));
        assert_eq!(opts.importance, 7);
    }

    #[tokio::test]
    async fn garbage_response_is_an_extraction_error() {
        let generator = MockGenerator::with_responses(vec!["no facts, sorry".to_string()]);
        let text = "I run a small bakery in Lyon and we open at six every morning.";
        let err = extractor(&generator).extract(text).await.unwrap_err();
        assert!(matches!(err, MnemoError::Extraction(_)));
    }
}
