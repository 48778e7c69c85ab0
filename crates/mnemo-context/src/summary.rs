// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rolling conversation summaries via the generation provider.

use std::sync::Arc;

use mnemo_config::model::ContextConfig;
use mnemo_core::text::extract_keywords;
use mnemo_core::types::GenerationRequest;
use mnemo_core::{GenerationAdapter, MnemoError};
use mnemo_storage::queries::sessions;
use mnemo_storage::{now_timestamp, Database, MessageRecord};
use tracing::{debug, info, warn};

/// Stored when the provider cannot produce a summary.
pub const FALLBACK_SUMMARY: &str = "Conversation about various topics";

/// Messages fed to the summary prompt.
const SUMMARY_WINDOW: usize = 20;

const TOPIC_KEYWORDS: usize = 3;

/// Writes `summary` and `topic` onto a session. Cheap to clone into tasks.
#[derive(Clone)]
pub struct Summarizer {
    db: Database,
    generator: Arc<dyn GenerationAdapter>,
    config: ContextConfig,
}

impl Summarizer {
    pub fn new(db: Database, generator: Arc<dyn GenerationAdapter>, config: ContextConfig) -> Self {
        Self {
            db,
            generator,
            config,
        }
    }

    /// Summarize a session and persist the result.
    ///
    /// Returns `None` without a provider call when the session has fewer than
    /// `context.min_messages_for_summary` messages and `force` is false.
    pub async fn summarize(
        &self,
        session_id: &str,
        force: bool,
    ) -> Result<Option<String>, MnemoError> {
        let messages = sessions::all_messages(&self.db, session_id).await?;
        if messages.is_empty() || (!force && messages.len() < self.config.min_messages_for_summary)
        {
            debug!(session_id = %session_id, messages = messages.len(), "too few messages to summarize");
            return Ok(None);
        }

        let window = &messages[messages.len().saturating_sub(SUMMARY_WINDOW)..];
        let summary = self.generate(window).await;
        let topic = session_topic(&messages);

        sessions::update_summary(
            &self.db,
            session_id,
            &summary,
            topic.as_deref(),
            &now_timestamp(),
        )
        .await?;
        info!(session_id = %session_id, messages = messages.len(), "conversation summarized");
        Ok(Some(summary))
    }

    async fn generate(&self, window: &[MessageRecord]) -> String {
        let transcript = window
            .iter()
            .map(|m| format!("{}: {}", m.role, m.content))
            .collect::<Vec<_>>()
            .join("\n");
        let request = GenerationRequest::new(
            format!("Summarize this conversation in 2-3 sentences:\n\n{transcript}"),
            self.config.summary_max_tokens,
        );
        match self.generator.complete(request).await {
            Ok(response) if !response.content.trim().is_empty() => {
                response.content.trim().to_string()
            }
            Ok(_) => FALLBACK_SUMMARY.to_string(),
            Err(e) => {
                warn!(error = %e, "summary generation failed, using fallback");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

/// Top keywords of the user's messages, comma separated.
fn session_topic(messages: &[MessageRecord]) -> Option<String> {
    let user_text = messages
        .iter()
        .filter(|m| m.role == "user")
        .map(|m| m.content.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let keywords = extract_keywords(&user_text, TOPIC_KEYWORDS);
    (!keywords.is_empty()).then(|| keywords.join(", "))
}
