// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory operations.

use mnemo_core::vector::{blob_to_vec, vec_to_blob};
use mnemo_core::MnemoError;
use rusqlite::{params, params_from_iter, Row};

use super::{placeholders, OptionalExt};
use crate::database::{map_tr_err, Database};
use crate::models::{MemoryCounts, MemoryOrder, MemoryQuery, MemoryRecord};

const MEMORY_COLUMNS: &str = "id, owner_id, session_id, memory_key, memory_value, summary, \
     category, importance, embedding, source, access_count, last_accessed, expires_at, created_at";

/// Insert a new memory.
pub async fn insert_memory(db: &Database, memory: &MemoryRecord) -> Result<(), MnemoError> {
    let memory = memory.clone();
    let blob = vec_to_blob(&memory.embedding);
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO memories (id, owner_id, session_id, memory_key, memory_value, \
                 summary, category, importance, embedding, source, access_count, last_accessed, \
                 expires_at, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    memory.id,
                    memory.owner_id,
                    memory.session_id,
                    memory.key,
                    memory.value,
                    memory.summary,
                    memory.category,
                    memory.importance,
                    blob,
                    memory.source,
                    memory.access_count,
                    memory.last_accessed,
                    memory.expires_at,
                    memory.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a memory owned by `owner_id`.
pub async fn get_memory(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<Option<MemoryRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<MemoryRecord>, rusqlite::Error> {
            let sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1 AND owner_id = ?2");
            conn.query_row(&sql, params![id, owner_id], row_to_memory)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Unexpired memories matching the filter, most accessed first, then most important.
pub async fn recall_candidates(
    db: &Database,
    query: &MemoryQuery,
) -> Result<Vec<MemoryRecord>, MnemoError> {
    let query = query.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let mut sql = format!(
                "SELECT {MEMORY_COLUMNS} FROM memories
                 WHERE owner_id = ?1 AND importance >= ?2
                   AND (expires_at IS NULL OR expires_at > ?3)"
            );
            let mut args: Vec<String> = vec![
                query.owner_id,
                query.min_importance.to_string(),
                query.now,
            ];
            if let Some(category) = query.category {
                args.push(category);
                sql.push_str(&format!(" AND category = ?{}", args.len()));
            }
            sql.push_str(&format!(
                " ORDER BY access_count DESC, importance DESC, created_at DESC LIMIT {}",
                query.limit
            ));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Increment `access_count` and stamp `last_accessed` for each id.
pub async fn record_access(db: &Database, ids: &[String], now: &str) -> Result<(), MnemoError> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids = ids.to_vec();
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let sql = format!(
                "UPDATE memories SET access_count = access_count + 1, last_accessed = ?1
                 WHERE id IN ({})",
                placeholders(2, ids.len())
            );
            let mut args = vec![now];
            args.extend(ids);
            conn.execute(&sql, params_from_iter(args.iter()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// List an owner's memories in the requested order.
pub async fn list_memories(
    db: &Database,
    owner_id: &str,
    category: Option<&str>,
    order: MemoryOrder,
    limit: usize,
) -> Result<Vec<MemoryRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    let category = category.map(str::to_string);
    let order_by = match order {
        MemoryOrder::Recent => "created_at DESC",
        MemoryOrder::Important => "importance DESC, created_at DESC",
        MemoryOrder::Frequent => "access_count DESC, created_at DESC",
    };
    db.connection()
        .call(move |conn| -> Result<Vec<MemoryRecord>, rusqlite::Error> {
            let mut sql = format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE owner_id = ?1");
            let mut args = vec![owner_id];
            if let Some(category) = category {
                args.push(category);
                sql.push_str(" AND category = ?2");
            }
            sql.push_str(&format!(" ORDER BY {order_by}, id LIMIT {limit}"));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(args.iter()), row_to_memory)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one memory. Returns `false` if it did not exist for this owner.
pub async fn delete_memory(db: &Database, owner_id: &str, id: &str) -> Result<bool, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let changed = conn.execute(
                "DELETE FROM memories WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Remove every memory whose expiry is at or before `now`.
pub async fn delete_expired(db: &Database, now: &str) -> Result<usize, MnemoError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "DELETE FROM memories WHERE expires_at IS NOT NULL AND expires_at <= ?1",
                params![now],
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregate counts for an owner's memories.
pub async fn memory_counts(
    db: &Database,
    owner_id: &str,
    top_n: usize,
) -> Result<MemoryCounts, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<MemoryCounts, rusqlite::Error> {
            let total: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )?;

            let by_category = {
                let mut stmt = conn.prepare(
                    "SELECT category, COUNT(*) FROM memories WHERE owner_id = ?1
                     GROUP BY category ORDER BY category",
                )?;
                stmt.query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<(String, i64)>, _>>()?
            };

            let most_accessed = {
                let sql = format!(
                    "SELECT {MEMORY_COLUMNS} FROM memories WHERE owner_id = ?1
                     ORDER BY access_count DESC, created_at DESC, id LIMIT {top_n}"
                );
                let mut stmt = conn.prepare(&sql)?;
                stmt.query_map(params![owner_id], row_to_memory)?
                    .collect::<Result<Vec<_>, _>>()?
            };

            Ok(MemoryCounts {
                total,
                by_category,
                most_accessed,
            })
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_memory(row: &Row<'_>) -> Result<MemoryRecord, rusqlite::Error> {
    let blob: Vec<u8> = row.get(8)?;
    Ok(MemoryRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        session_id: row.get(2)?,
        key: row.get(3)?,
        value: row.get(4)?,
        summary: row.get(5)?,
        category: row.get(6)?,
        importance: row.get(7)?,
        embedding: blob_to_vec(&blob),
        source: row.get(9)?,
        access_count: row.get(10)?,
        last_accessed: row.get(11)?,
        expires_at: row.get(12)?,
        created_at: row.get(13)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::now_timestamp;

    fn memory(id: &str, owner: &str, importance: u8, access_count: i64) -> MemoryRecord {
        MemoryRecord {
            id: id.to_string(),
            owner_id: owner.to_string(),
            session_id: None,
            key: format!("key-{id}"),
            value: format!("value {id}"),
            summary: format!("value {id}"),
            category: "fact".to_string(),
            importance,
            embedding: vec![1.0, 0.0],
            source: "voice".to_string(),
            access_count,
            last_accessed: None,
            expires_at: None,
            created_at: now_timestamp(),
        }
    }

    fn query(owner: &str, min_importance: u8) -> MemoryQuery {
        MemoryQuery {
            owner_id: owner.to_string(),
            category: None,
            min_importance,
            now: now_timestamp(),
            limit: 10,
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trips_embedding() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memory(&db, &memory("m1", "alice", 5, 0)).await.unwrap();
        let fetched = get_memory(&db, "alice", "m1").await.unwrap().unwrap();
        assert_eq!(fetched.embedding, vec![1.0, 0.0]);
        assert!(get_memory(&db, "bob", "m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn candidates_are_ordered_and_filtered() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memory(&db, &memory("low", "alice", 2, 9)).await.unwrap();
        insert_memory(&db, &memory("a", "alice", 5, 1)).await.unwrap();
        insert_memory(&db, &memory("b", "alice", 8, 1)).await.unwrap();
        insert_memory(&db, &memory("c", "alice", 4, 3)).await.unwrap();
        insert_memory(&db, &memory("other", "bob", 9, 9)).await.unwrap();

        let ids: Vec<String> = recall_candidates(&db, &query("alice", 3))
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn expired_memories_are_excluded_and_swept() {
        let db = Database::open_in_memory().await.unwrap();
        let mut stale = memory("stale", "alice", 5, 0);
        stale.expires_at = Some("2000-01-01T00:00:00.000Z".to_string());
        insert_memory(&db, &stale).await.unwrap();
        insert_memory(&db, &memory("fresh", "alice", 5, 0)).await.unwrap();

        let candidates = recall_candidates(&db, &query("alice", 0)).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, "fresh");

        assert_eq!(delete_expired(&db, &now_timestamp()).await.unwrap(), 1);
        assert!(get_memory(&db, "alice", "stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_access_bumps_counters() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memory(&db, &memory("m1", "alice", 5, 0)).await.unwrap();
        let now = now_timestamp();
        record_access(&db, &["m1".to_string()], &now).await.unwrap();
        record_access(&db, &["m1".to_string()], &now).await.unwrap();

        let fetched = get_memory(&db, "alice", "m1").await.unwrap().unwrap();
        assert_eq!(fetched.access_count, 2);
        assert_eq!(fetched.last_accessed.as_deref(), Some(now.as_str()));
    }

    #[tokio::test]
    async fn list_orders_and_counts() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memory(&db, &memory("a", "alice", 3, 7)).await.unwrap();
        insert_memory(&db, &memory("b", "alice", 9, 1)).await.unwrap();

        let important = list_memories(&db, "alice", None, MemoryOrder::Important, 50)
            .await
            .unwrap();
        assert_eq!(important[0].id, "b");
        let frequent = list_memories(&db, "alice", None, MemoryOrder::Frequent, 50)
            .await
            .unwrap();
        assert_eq!(frequent[0].id, "a");

        let counts = memory_counts(&db, "alice", 1).await.unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.by_category, vec![("fact".to_string(), 2)]);
        assert_eq!(counts.most_accessed.len(), 1);
        assert_eq!(counts.most_accessed[0].id, "a");
    }

    #[tokio::test]
    async fn delete_is_owner_scoped() {
        let db = Database::open_in_memory().await.unwrap();
        insert_memory(&db, &memory("m1", "alice", 5, 0)).await.unwrap();
        assert!(!delete_memory(&db, "bob", "m1").await.unwrap());
        assert!(delete_memory(&db, "alice", "m1").await.unwrap());
        assert!(!delete_memory(&db, "alice", "m1").await.unwrap());
    }
}
