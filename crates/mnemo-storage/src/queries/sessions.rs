// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation session and message operations.
//!
//! Session ids are globally unique, so lookups are by id alone; the caller
//! compares `owner_id` and reports foreign sessions as missing.

use mnemo_core::MnemoError;
use rusqlite::{params, Row};

use super::OptionalExt;
use crate::database::{map_tr_err, Database};
use crate::models::{MessageRecord, SessionRecord};

const SESSION_COLUMNS: &str = "session_id, owner_id, status, summary, topic, message_count, \
     total_duration_secs, start_time, end_time, updated_at";

/// Create a session row unless one with the same id already exists.
///
/// Returns `true` when this call inserted the row. An existing row is left
/// untouched whoever owns it.
pub async fn create_session(db: &Database, session: &SessionRecord) -> Result<bool, MnemoError> {
    let s = session.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT INTO conversations (session_id, owner_id, status, summary, topic, \
                 message_count, total_duration_secs, start_time, end_time, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 ON CONFLICT(session_id) DO NOTHING",
                params![
                    s.session_id,
                    s.owner_id,
                    s.status,
                    s.summary,
                    s.topic,
                    s.message_count,
                    s.total_duration_secs,
                    s.start_time,
                    s.end_time,
                    s.updated_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Get a session by id.
pub async fn get_session(
    db: &Database,
    session_id: &str,
) -> Result<Option<SessionRecord>, MnemoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SessionRecord>, rusqlite::Error> {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM conversations WHERE session_id = ?1");
            conn.query_row(&sql, params![session_id], row_to_session)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Update a session's status.
pub async fn set_status(
    db: &Database,
    session_id: &str,
    status: &str,
    now: &str,
) -> Result<bool, MnemoError> {
    let session_id = session_id.to_string();
    let status = status.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "UPDATE conversations SET status = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![status, now, session_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a message and bump the session's message count in one transaction.
///
/// Returns the new message count, which is also the message's sequence number.
pub async fn append_message(
    db: &Database,
    session_id: &str,
    role: &str,
    content: &str,
    metadata: Option<serde_json::Value>,
    now: &str,
) -> Result<i64, MnemoError> {
    let session_id = session_id.to_string();
    let role = role.to_string();
    let content = content.to_string();
    let metadata = metadata.map(|m| m.to_string());
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            let tx = conn.transaction()?;
            let count: i64 = tx.query_row(
                "SELECT message_count FROM conversations WHERE session_id = ?1",
                params![session_id],
                |row| row.get(0),
            )?;
            let seq = count + 1;
            tx.execute(
                "INSERT INTO conversation_messages (session_id, seq, role, content, metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![session_id, seq, role, content, metadata, now],
            )?;
            tx.execute(
                "UPDATE conversations SET message_count = ?1, updated_at = ?2 WHERE session_id = ?3",
                params![seq, now, session_id],
            )?;
            tx.commit()?;
            Ok(seq)
        })
        .await
        .map_err(map_tr_err)
}

/// The last `limit` messages of a session, oldest first.
pub async fn recent_messages(
    db: &Database,
    session_id: &str,
    limit: usize,
) -> Result<Vec<MessageRecord>, MnemoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MessageRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT session_id, seq, role, content, metadata, created_at
                 FROM conversation_messages WHERE session_id = ?1
                 ORDER BY seq DESC LIMIT {limit}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt
                .query_map(params![session_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.reverse();
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Every message of a session, oldest first.
pub async fn all_messages(
    db: &Database,
    session_id: &str,
) -> Result<Vec<MessageRecord>, MnemoError> {
    let session_id = session_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<MessageRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT session_id, seq, role, content, metadata, created_at
                 FROM conversation_messages WHERE session_id = ?1 ORDER BY seq",
            )?;
            let rows = stmt
                .query_map(params![session_id], row_to_message)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Store a rolling summary and topic.
pub async fn update_summary(
    db: &Database,
    session_id: &str,
    summary: &str,
    topic: Option<&str>,
    now: &str,
) -> Result<(), MnemoError> {
    let session_id = session_id.to_string();
    let summary = summary.to_string();
    let topic = topic.map(str::to_string);
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE conversations SET summary = ?1, topic = COALESCE(?2, topic), updated_at = ?3
                 WHERE session_id = ?4",
                params![summary, topic, now, session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark a session ended with its end time and duration.
pub async fn end_session(
    db: &Database,
    session_id: &str,
    status: &str,
    end_time: &str,
    duration_secs: i64,
) -> Result<(), MnemoError> {
    let session_id = session_id.to_string();
    let status = status.to_string();
    let end_time = end_time.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE conversations
                 SET status = ?1, end_time = ?2, total_duration_secs = ?3, updated_at = ?2
                 WHERE session_id = ?4",
                params![status, end_time, duration_secs, session_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Number of sessions an owner has ever had.
pub async fn count_sessions(db: &Database, owner_id: &str) -> Result<i64, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<i64, rusqlite::Error> {
            conn.query_row(
                "SELECT COUNT(*) FROM conversations WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_session(row: &Row<'_>) -> Result<SessionRecord, rusqlite::Error> {
    Ok(SessionRecord {
        session_id: row.get(0)?,
        owner_id: row.get(1)?,
        status: row.get(2)?,
        summary: row.get(3)?,
        topic: row.get(4)?,
        message_count: row.get(5)?,
        total_duration_secs: row.get(6)?,
        start_time: row.get(7)?,
        end_time: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn row_to_message(row: &Row<'_>) -> Result<MessageRecord, rusqlite::Error> {
    let metadata: Option<String> = row.get(4)?;
    Ok(MessageRecord {
        session_id: row.get(0)?,
        seq: row.get(1)?,
        role: row.get(2)?,
        content: row.get(3)?,
        metadata: metadata.and_then(|m| serde_json::from_str(&m).ok()),
        created_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_timestamp;

    async fn seeded(owner: &str, sid: &str) -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let now = now_timestamp();
        create_session(
            &db,
            &SessionRecord {
                session_id: sid.to_string(),
                owner_id: owner.to_string(),
                status: "active".to_string(),
                summary: None,
                topic: None,
                message_count: 0,
                total_duration_secs: None,
                start_time: now.clone(),
                end_time: None,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn append_assigns_sequential_numbers() {
        let db = seeded("alice", "s1").await;
        let now = now_timestamp();
        for i in 1..=3 {
            let seq = append_message(&db, "s1", "user", &format!("msg {i}"), None, &now)
                .await
                .unwrap();
            assert_eq!(seq, i);
        }
        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.message_count, 3);
    }

    #[tokio::test]
    async fn recent_messages_returns_tail_in_order() {
        let db = seeded("alice", "s1").await;
        let now = now_timestamp();
        for i in 1..=5 {
            append_message(&db, "s1", "user", &format!("msg {i}"), None, &now)
                .await
                .unwrap();
        }
        let tail: Vec<String> = recent_messages(&db, "s1", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(tail, vec!["msg 4", "msg 5"]);
        assert_eq!(all_messages(&db, "s1").await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn append_to_missing_session_fails() {
        let db = Database::open_in_memory().await.unwrap();
        let err = append_message(&db, "nope", "user", "hi", None, &now_timestamp()).await;
        assert!(matches!(err, Err(MnemoError::Storage { .. })));
    }

    #[tokio::test]
    async fn metadata_round_trips() {
        let db = seeded("alice", "s1").await;
        append_message(
            &db,
            "s1",
            "assistant",
            "hello",
            Some(serde_json::json!({"channel": "voice"})),
            &now_timestamp(),
        )
        .await
        .unwrap();
        let messages = all_messages(&db, "s1").await.unwrap();
        assert_eq!(
            messages[0].metadata,
            Some(serde_json::json!({"channel": "voice"}))
        );
    }

    #[tokio::test]
    async fn summary_and_end() {
        let db = seeded("alice", "s1").await;
        let now = now_timestamp();
        update_summary(&db, "s1", "talked about pricing", Some("pricing"), &now)
            .await
            .unwrap();
        end_session(&db, "s1", "ended", &now, 42).await.unwrap();

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.summary.as_deref(), Some("talked about pricing"));
        assert_eq!(session.topic.as_deref(), Some("pricing"));
        assert_eq!(session.status, "ended");
        assert_eq!(session.total_duration_secs, Some(42));
        assert_eq!(count_sessions(&db, "alice").await.unwrap(), 1);
        assert_eq!(count_sessions(&db, "bob").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_is_idempotent_and_keeps_first_owner() {
        let db = seeded("alice", "s1").await;
        let now = now_timestamp();
        let inserted = create_session(
            &db,
            &SessionRecord {
                session_id: "s1".to_string(),
                owner_id: "bob".to_string(),
                status: "active".to_string(),
                summary: None,
                topic: None,
                message_count: 0,
                total_duration_secs: None,
                start_time: now.clone(),
                end_time: None,
                updated_at: now,
            },
        )
        .await
        .unwrap();
        assert!(!inserted);

        let session = get_session(&db, "s1").await.unwrap().unwrap();
        assert_eq!(session.owner_id, "alice");
    }
}
