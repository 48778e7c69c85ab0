// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Text-generation adapter trait used for summaries and fact extraction.

use async_trait::async_trait;

use crate::error::MnemoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{GenerationRequest, GenerationResponse};

/// Adapter for single-shot LLM completions.
#[async_trait]
pub trait GenerationAdapter: PluginAdapter {
    /// Sends a completion request and returns the full response.
    async fn complete(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, MnemoError>;
}
