// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Mnemo integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockEmbedder`] - Hashed bag-of-words embeddings with per-text overrides
//! - [`MockGenerator`] - Text generation with a FIFO response queue
//! - [`FailingCache`] - A cache backend that is always down
//! - [`TestHarness`] - The full service stack over temp storage

pub mod failing_cache;
pub mod harness;
pub mod mock_embedder;
pub mod mock_generator;

pub use failing_cache::FailingCache;
pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_embedder::{MockEmbedder, MOCK_DIMENSIONS};
pub use mock_generator::MockGenerator;
