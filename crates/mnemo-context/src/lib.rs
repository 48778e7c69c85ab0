// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation context management for Mnemo.
//!
//! Sessions hold an ordered message log with a rolling summary and topic.
//! Context assembly returns the recent window plus memories recalled from the
//! window text, cached per session. Ending a conversation runs a final
//! summary and fact extraction into long-term memory.

pub mod manager;
pub mod summary;
pub mod types;

pub use manager::ConversationManager;
pub use summary::{Summarizer, FALLBACK_SUMMARY};
pub use types::*;
