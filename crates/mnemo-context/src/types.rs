// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation types and the session status state machine.

use std::str::FromStr;

use mnemo_core::MnemoError;
use mnemo_memory::ScoredMemory;
use mnemo_storage::{MessageRecord, SessionRecord};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// Lifecycle state of a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
    /// Frozen; accepts no further messages.
    Archived,
}

impl SessionStatus {
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (Active, Ended) | (Ended, Active) => true,
            (Active, Archived) | (Ended, Archived) => true,
            // Ending twice refreshes the end time and summary.
            (Ended, Ended) => true,
            (Active, _) | (Ended, _) | (Archived, _) => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Active => "active",
            SessionStatus::Ended => "ended",
            SessionStatus::Archived => "archived",
        }
    }
}

/// A conversation message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub seq: i64,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    pub created_at: String,
}

impl TryFrom<MessageRecord> for Message {
    type Error = MnemoError;

    fn try_from(record: MessageRecord) -> Result<Self, Self::Error> {
        let role = Role::from_str(&record.role).map_err(|_| {
            MnemoError::Internal(format!("unrecognized message role `{}` in store", record.role))
        })?;
        Ok(Message {
            seq: record.seq,
            role,
            content: record.content,
            metadata: record.metadata,
            created_at: record.created_at,
        })
    }
}

/// A conversation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub owner_id: String,
    pub status: SessionStatus,
    pub summary: Option<String>,
    pub topic: Option<String>,
    pub message_count: i64,
    pub total_duration_secs: Option<i64>,
    pub start_time: String,
    pub end_time: Option<String>,
    pub updated_at: String,
}

impl TryFrom<SessionRecord> for Session {
    type Error = MnemoError;

    fn try_from(record: SessionRecord) -> Result<Self, Self::Error> {
        let status = SessionStatus::from_str(&record.status).map_err(|_| {
            MnemoError::Internal(format!(
                "unrecognized session status `{}` in store",
                record.status
            ))
        })?;
        Ok(Session {
            session_id: record.session_id,
            owner_id: record.owner_id,
            status,
            summary: record.summary,
            topic: record.topic,
            message_count: record.message_count,
            total_duration_secs: record.total_duration_secs,
            start_time: record.start_time,
            end_time: record.end_time,
            updated_at: record.updated_at,
        })
    }
}

/// Options for [`crate::ConversationManager::get_context`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextOptions {
    /// Fast mode: no memory recall.
    pub skip_memory_recall: bool,
}

/// Everything a caller needs to continue a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationContext {
    pub session_id: String,
    pub owner_id: String,
    /// The most recent messages, oldest first.
    pub messages: Vec<Message>,
    pub memories: Vec<ScoredMemory>,
    pub summary: Option<String>,
    pub topic: Option<String>,
    pub message_count: i64,
}

/// Result of ending a conversation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndReport {
    pub summary: Option<String>,
    /// Number of memories stored from the conversation.
    pub extracted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_is_terminal() {
        for next in [SessionStatus::Active, SessionStatus::Ended, SessionStatus::Archived] {
            assert!(!SessionStatus::Archived.can_transition_to(next));
        }
        assert!(SessionStatus::Ended.can_transition_to(SessionStatus::Active));
        assert!(!SessionStatus::Active.can_transition_to(SessionStatus::Active));
    }

    #[test]
    fn as_str_matches_display() {
        for status in [SessionStatus::Active, SessionStatus::Ended, SessionStatus::Archived] {
            assert_eq!(status.as_str(), status.to_string());
        }
        assert_eq!(Role::from_str("assistant").unwrap(), Role::Assistant);
    }

    #[test]
    fn context_serializes_camel_case() {
        let ctx = ConversationContext {
            session_id: "s".into(),
            owner_id: "o".into(),
            messages: vec![],
            memories: vec![],
            summary: None,
            topic: None,
            message_count: 0,
        };
        let json = serde_json::to_value(&ctx).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("messageCount").is_some());
    }
}
