// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic embedding adapter for tests.
//!
//! Each text becomes a hashed bag-of-words vector: every lowercase
//! alphanumeric token adds one to a bucket chosen by its hash. Texts sharing
//! words therefore have positive cosine similarity, identical texts have
//! similarity one, and nothing depends on a model or the network.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mnemo_core::types::{EmbeddingInput, EmbeddingOutput};
use mnemo_core::{AdapterType, EmbeddingAdapter, HealthStatus, MnemoError, PluginAdapter};

/// Default vector width.
pub const MOCK_DIMENSIONS: usize = 256;

#[derive(Default)]
struct State {
    overrides: Mutex<HashMap<String, Vec<f32>>>,
    calls: AtomicUsize,
    failing: AtomicBool,
}

/// A mock embedding adapter. Clones share counters, overrides, and failure mode.
#[derive(Clone)]
pub struct MockEmbedder {
    state: Arc<State>,
    dimensions: usize,
    latency: Option<Duration>,
}

impl MockEmbedder {
    pub fn new() -> Self {
        Self::with_dimensions(MOCK_DIMENSIONS)
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            state: Arc::new(State::default()),
            dimensions: dimensions.max(1),
            latency: None,
        }
    }

    /// Sleep this long inside every `embed` call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Return `vector` whenever exactly `text` is embedded.
    pub fn with_override(self, text: &str, vector: Vec<f32>) -> Self {
        self.set_override(text, vector);
        self
    }

    pub fn set_override(&self, text: &str, vector: Vec<f32>) {
        if let Ok(mut overrides) = self.state.overrides.lock() {
            overrides.insert(text.to_string(), vector);
        }
    }

    /// Make every subsequent call fail with a provider error.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of `embed` calls made so far.
    pub fn calls(&self) -> usize {
        self.state.calls.load(Ordering::SeqCst)
    }

    /// The vector this embedder produces for `text`.
    pub fn vector_for(&self, text: &str) -> Vec<f32> {
        if let Ok(overrides) = self.state.overrides.lock() {
            if let Some(v) = overrides.get(text) {
                return v.clone();
            }
        }
        let mut vector = vec![0.0_f32; self.dimensions];
        let lowered = text.to_lowercase();
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }
        vector
    }
}

impl Default for MockEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(*b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

#[async_trait]
impl PluginAdapter for MockEmbedder {
    fn name(&self) -> &str {
        "mock-embedder"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Embedding
    }

    async fn health_check(&self) -> Result<HealthStatus, MnemoError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), MnemoError> {
        Ok(())
    }
}

#[async_trait]
impl EmbeddingAdapter for MockEmbedder {
    async fn embed(&self, input: EmbeddingInput) -> Result<EmbeddingOutput, MnemoError> {
        self.state.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(MnemoError::Provider {
                message: "mock embedder failure".to_string(),
                source: None,
            });
        }
        let embeddings: Vec<Vec<f32>> = input.texts.iter().map(|t| self.vector_for(t)).collect();
        let dimensions = embeddings.first().map_or(self.dimensions, Vec::len);
        Ok(EmbeddingOutput {
            embeddings,
            dimensions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_core::vector::cosine_similarity;

    #[tokio::test]
    async fn identical_texts_match_and_calls_are_counted() {
        let embedder = MockEmbedder::new();
        let out = embedder
            .embed(EmbeddingInput {
                texts: vec!["Refund policy".into(), "refund POLICY!".into()],
            })
            .await
            .unwrap();
        assert_eq!(out.dimensions, MOCK_DIMENSIONS);
        let sim = cosine_similarity(&out.embeddings[0], &out.embeddings[1]);
        assert!((sim - 1.0).abs() < 1e-6);
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn overrides_and_failures() {
        let embedder = MockEmbedder::new().with_override("Alex", vec![1.0, 0.0]);
        assert_eq!(embedder.vector_for("Alex"), vec![1.0, 0.0]);

        let clone = embedder.clone();
        clone.set_failing(true);
        assert!(embedder.embed(EmbeddingInput::single("x")).await.is_err());
        assert_eq!(clone.calls(), 1);
    }
}
