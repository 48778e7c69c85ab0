// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Mnemo semantic memory engine.
//!
//! This crate provides the error taxonomy, the adapter traits for Mnemo's
//! external collaborators (embedding provider, text-generation provider,
//! cache), and small text and vector helpers shared by the knowledge,
//! memory, and context crates.

pub mod error;
pub mod text;
pub mod traits;
pub mod types;
pub mod vector;

pub use error::MnemoError;
pub use types::{AdapterType, HealthStatus};

pub use traits::{CacheAdapter, EmbeddingAdapter, GenerationAdapter, PluginAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mnemo_error_variants_render() {
        let not_found = MnemoError::not_found("document", "doc-1");
        assert_eq!(not_found.to_string(), "document not found: doc-1");
        assert!(not_found.is_not_found());

        let storage = MnemoError::storage(std::io::Error::other("disk"));
        assert!(storage.to_string().contains("disk"));

        let provider = MnemoError::Provider {
            message: "rate limited".into(),
            source: None,
        };
        assert_eq!(provider.to_string(), "provider error: rate limited");

        let _ = MnemoError::Validation("empty".into());
        let _ = MnemoError::CacheUnavailable("down".into());
        let _ = MnemoError::Extraction("bad json".into());
        let _ = MnemoError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _ = MnemoError::Internal("test".into());
    }

    #[test]
    fn adapter_type_round_trips() {
        use std::str::FromStr;

        let variants = [
            AdapterType::Embedding,
            AdapterType::Generation,
            AdapterType::Cache,
            AdapterType::Storage,
        ];
        for variant in &variants {
            let parsed = AdapterType::from_str(&variant.to_string()).expect("should parse back");
            assert_eq!(*variant, parsed);
        }

        let json = serde_json::to_string(&AdapterType::Cache).expect("should serialize");
        let parsed: AdapterType = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, AdapterType::Cache);
    }

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_embedding_adapter<T: EmbeddingAdapter>() {}
        fn _assert_generation_adapter<T: GenerationAdapter>() {}
        fn _assert_cache_adapter<T: CacheAdapter>() {}
    }
}
