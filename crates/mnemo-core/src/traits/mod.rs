// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for Mnemo's external collaborators.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod cache;
pub mod embedding;
pub mod generation;

pub use adapter::PluginAdapter;
pub use cache::CacheAdapter;
pub use embedding::EmbeddingAdapter;
pub use generation::GenerationAdapter;
