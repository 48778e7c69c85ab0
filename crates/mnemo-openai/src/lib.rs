// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! OpenAI-compatible provider adapters for the Mnemo engine.
//!
//! [`OpenAiEmbedder`] implements [`EmbeddingAdapter`] over `POST /embeddings`
//! and [`OpenAiGenerator`] implements [`GenerationAdapter`] over
//! `POST /chat/completions`. Any server speaking the same wire format works.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use mnemo_config::model::{EmbeddingConfig, GenerationConfig};
use mnemo_core::text::truncate_chars;
use mnemo_core::types::{
    EmbeddingInput, EmbeddingOutput, GenerationRequest, GenerationResponse, TokenUsage,
};
use mnemo_core::{AdapterType, EmbeddingAdapter, GenerationAdapter, HealthStatus, MnemoError, PluginAdapter};
use tracing::{debug, info};

use crate::client::OpenAiClient;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse};

/// Embedding adapter for OpenAI-compatible APIs.
///
/// API key resolution order: config -> `OPENAI_API_KEY` env var -> error.
pub struct OpenAiEmbedder {
    client: OpenAiClient,
    model: String,
    max_input_chars: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, MnemoError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "embedding provider initialized");
        Ok(Self::with_client(client, config))
    }

    fn with_client(client: OpenAiClient, config: &EmbeddingConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
            max_input_chars: config.max_input_chars,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiEmbedder {
    fn name(&self) -> &str {
        "openai-embeddings"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        // Probing the API would spend tokens.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        debug!("embedding provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        if input.texts.is_empty() {
            return Ok(EmbeddingOutput {
                embeddings: Vec::new(),
                dimensions: 0,
            });
        }
        let expected = input.texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: input
                .texts
                .iter()
                .map(|t| truncate_chars(t, self.max_input_chars).to_string())
                .collect(),
        };

        let mut response: EmbeddingResponse =
            self.client.post_json("/embeddings", &request).await?;
        if response.data.len() != expected {
            return Err(MnemoError::Provider {
                message: format!(
                    "embedding API returned {} vectors for {expected} inputs",
                    response.data.len()
                ),
                source: None,
            });
        }
        response.data.sort_by_key(|d| d.index);

        let embeddings: Vec<Vec<f32>> = response.data.into_iter().map(|d| d.embedding).collect();
        let dimensions = embeddings.first().map_or(0, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

/// Chat-completion adapter for OpenAI-compatible APIs.
pub struct OpenAiGenerator {
    client: OpenAiClient,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self, MnemoError> {
        let api_key = resolve_api_key(&config.api_key)?;
        let client = OpenAiClient::new(
            &api_key,
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(model = %config.model, "generation provider initialized");
        Ok(Self::with_client(client, config))
    }

    fn with_client(client: OpenAiClient, config: &GenerationConfig) -> Self {
        Self {
            client,
            model: config.model.clone(),
        }
    }

    fn to_chat_request(&self, request: GenerationRequest) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = request.system {
            messages.push(ChatMessage {
                role: "system".to_string(),
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: request.prompt,
        });
        ChatRequest {
            model: request.model.unwrap_or_else(|| self.model.clone()),
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        }
    }
}

#[async_trait]
impl PluginAdapter for OpenAiGenerator {
    fn name(&self) -> &str {
        "openai-chat"
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
        debug!("generation provider shutting down");
        Ok(())
    }
}

#[async_trait]
impl GenerationAdapter for OpenAiGenerator {
    async fn complete(&self, request: GenerationRequest) -> Result<GenerationResponse, MnemoError> {
        let chat = self.to_chat_request(request);
        let response: ChatResponse = self.client.post_json("/chat/completions", &chat).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| MnemoError::Provider {
                message: "chat completion returned no content".to_string(),
                source: None,
            })?;
        let usage = response.usage.unwrap_or_default();

        Ok(GenerationResponse {
            content,
            model: response.model,
            usage: TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        })
    }
}

/// Resolves the API key from config or environment.
fn resolve_api_key(config_key: &Option<String>) -> Result<String, MnemoError> {
    if let Some(key) = config_key.as_deref().filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var("OPENAI_API_KEY").map_err(|_| {
        MnemoError::Config(
            "OpenAI API key not found. Set embedding.api_key / generation.api_key in config or the OPENAI_API_KEY environment variable.".into(),
        )
    })
}
