// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock text-generation adapter for deterministic testing.
//!
//! Responses are popped from a FIFO queue. When the queue is empty, a
//! default "mock response" text is returned. Every prompt is captured.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use mnemo_core::types::{GenerationRequest, GenerationResponse, TokenUsage};
use mnemo_core::{AdapterType, GenerationAdapter, HealthStatus, MnemoError, PluginAdapter};

/// A mock generator. Clones share the queue, captured requests, and failure mode.
#[derive(Clone, Default)]
pub struct MockGenerator {
    responses: Arc<Mutex<VecDeque<String>>>,
    requests: Arc<Mutex<Vec<GenerationRequest>>>,
    failing: Arc<AtomicBool>,
}

impl MockGenerator {
    /// Create a mock generator with an empty response queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock generator pre-loaded with the given responses.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(VecDeque::from(responses))),
            ..Self::default()
        }
    }

    /// Add a response to the end of the queue.
    pub async fn add_response(&self, text: impl Into<String>) {
        self.responses.lock().await.push_back(text.into());
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Prompts received so far, oldest first.
    pub async fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .await
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Full requests received so far.
    pub async fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_response(&self) -> String {
        self.responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock response".to_string())
    }
}

#[async_trait]
impl PluginAdapter for MockGenerator {
    fn name(&self) -> &str {
        "mock-generator"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Generation
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl GenerationAdapter for MockGenerator {
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, MnemoError> {
        self.requests.lock().await.push(request.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(MnemoError::Provider {
                message: "mock generator failure".to_string(),
                source: None,
            });
        }
        let content = self.next_response().await;
        Ok(GenerationResponse {
            content,
            model: request.model.unwrap_or_else(|| "mock-model".to_string()),
            usage: TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn default_response_when_queue_empty() {
        let generator = MockGenerator::new();
        let resp = generator
            .complete(GenerationRequest::new("hi", 10))
            .await
            .unwrap();
        assert_eq!(resp.content, "mock response");
        assert_eq!(resp.model, "mock-model");
    }

    #[tokio::test]
    async fn queued_responses_returned_in_order() {
        let generator = MockGenerator::with_responses(vec!["first".into(), "second".into()]);
        generator.add_response("third").await;
        for expected in ["first", "second", "third", "mock response"] {
            let resp = generator
                .complete(GenerationRequest::new("p", 10))
                .await
                .unwrap();
            assert_eq!(resp.content, expected);
        }
        assert_eq!(generator.prompts().await.len(), 4);
    }

    #[tokio::test]
    async fn failing_mode_still_captures_prompt() {
        let generator = MockGenerator::new();
        generator.set_failing(true);
        assert!(generator
            .complete(GenerationRequest::new("captured", 10))
            .await
            .is_err());
        assert_eq!(generator.prompts().await, vec!["captured".to_string()]);
    }
}
