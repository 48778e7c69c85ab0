// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-term memory for the Mnemo engine.
//!
//! ## Architecture
//!
//! - **MemoryService**: owner-scoped store with embedding-based recall,
//!   soft expiry and a cached recall path
//! - **FactExtractor**: turns finished conversations into memories through
//!   the generation provider
//! - **Types**: Memory, MemoryCategory, Recall, ScoredMemory

pub mod extractor;
pub mod store;
pub mod types;

pub use extractor::{parse_extraction_response, ExtractedFact, FactExtractor};
pub use store::{MemoryService, NOTHING_RECALLED};
pub use types::*;
