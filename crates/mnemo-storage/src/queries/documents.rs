// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge document and chunk operations.
//!
//! Status changes are compare-and-set: the caller passes the set of states
//! the document may currently be in, and the update only applies when the
//! stored status is one of them. Because every statement runs on the single
//! writer thread, two concurrent claims on one document see exactly one winner.

use mnemo_core::vector::{blob_to_vec, vec_to_blob};
use mnemo_core::MnemoError;
use rusqlite::{params, params_from_iter, Row};

use super::{placeholders, OptionalExt};
use crate::database::{map_tr_err, Database};
use crate::models::{
    ChunkCandidate, ChunkRecord, DocumentCounts, DocumentQuery, DocumentRecord, ProcessedDocument,
};
use crate::now_timestamp;

const DOCUMENT_COLUMNS: &str = "id, owner_id, name, doc_type, category, description, tags, \
     raw_text, summary, keywords, status, processing_error, times_referenced, \
     last_accessed_at, created_at, updated_at";

/// Insert a new document row.
pub async fn insert_document(db: &Database, doc: &DocumentRecord) -> Result<(), MnemoError> {
    let doc = doc.clone();
    let tags = serde_json::to_string(&doc.tags).map_err(MnemoError::storage)?;
    let keywords = serde_json::to_string(&doc.keywords).map_err(MnemoError::storage)?;
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO knowledge_documents (id, owner_id, name, doc_type, category, \
                 description, tags, raw_text, summary, keywords, status, processing_error, \
                 times_referenced, last_accessed_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    doc.id,
                    doc.owner_id,
                    doc.name,
                    doc.doc_type,
                    doc.category,
                    doc.description,
                    tags,
                    doc.raw_text,
                    doc.summary,
                    keywords,
                    doc.status,
                    doc.processing_error,
                    doc.times_referenced,
                    doc.last_accessed_at,
                    doc.created_at,
                    doc.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a document owned by `owner_id`.
pub async fn get_document(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<Option<DocumentRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DocumentRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT {DOCUMENT_COLUMNS} FROM knowledge_documents WHERE id = ?1 AND owner_id = ?2"
            );
            conn.query_row(&sql, params![id, owner_id], row_to_document)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// List an owner's documents, newest first.
pub async fn list_documents(
    db: &Database,
    owner_id: &str,
    query: &DocumentQuery,
) -> Result<Vec<DocumentRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    let query = query.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<DocumentRecord>, rusqlite::Error> {
            let mut sql = format!(
                "SELECT {DOCUMENT_COLUMNS} FROM knowledge_documents WHERE owner_id = ?1"
            );
            let mut args: Vec<String> = vec![owner_id];
            for (column, value) in [
                ("status", &query.status),
                ("doc_type", &query.doc_type),
                ("category", &query.category),
            ] {
                if let Some(value) = value {
                    args.push(value.clone());
                    sql.push_str(&format!(" AND {column} = ?{}", args.len()));
                }
            }
            sql.push_str(" ORDER BY created_at DESC, id");
            if let Some(limit) = query.limit {
                sql.push_str(&format!(" LIMIT {limit}"));
            }

            let mut stmt = conn.prepare(&sql)?;
            let docs = stmt
                .query_map(params_from_iter(args.iter()), row_to_document)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(docs)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically move a document into `to` if its status is one of `from`.
///
/// On success the previous chunk set is removed in the same transaction and,
/// when `raw_text` is given, the stored text is replaced. Returns `false` if
/// the document is missing, not owned by `owner_id`, or in another state.
pub async fn begin_transition(
    db: &Database,
    owner_id: &str,
    id: &str,
    from: &[&str],
    to: &str,
    raw_text: Option<String>,
) -> Result<bool, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();
    let to = to.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let sql = format!(
                "UPDATE knowledge_documents
                 SET status = ?1, processing_error = NULL, updated_at = ?2,
                     raw_text = COALESCE(?3, raw_text)
                 WHERE id = ?4 AND owner_id = ?5 AND status IN ({})",
                placeholders(6, from.len())
            );
            let mut args: Vec<Option<String>> =
                vec![Some(to), Some(now), raw_text, Some(id.clone()), Some(owner_id)];
            args.extend(from.into_iter().map(Some));
            let changed = tx.execute(&sql, params_from_iter(args.iter()))?;
            if changed == 0 {
                return Ok(false);
            }
            tx.execute(
                "DELETE FROM knowledge_chunks WHERE document_id = ?1",
                params![id],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Commit a processed document: replace chunks and set status `to`, all in
/// one transaction, provided the current status is one of `from`.
///
/// Returns `false` (and writes nothing) when the document was deleted or
/// moved on while processing ran.
pub async fn complete_processing(
    db: &Database,
    id: &str,
    processed: ProcessedDocument,
    from: &[&str],
    to: &str,
) -> Result<bool, MnemoError> {
    let id = id.to_string();
    let from: Vec<String> = from.iter().map(|s| s.to_string()).collect();
    let to = to.to_string();
    let keywords = serde_json::to_string(&processed.keywords).map_err(MnemoError::storage)?;
    let now = now_timestamp();
    let rows: Vec<(i64, String, Vec<u8>, String)> = processed
        .chunks
        .iter()
        .map(|c| {
            (
                c.chunk_index,
                c.text.clone(),
                vec_to_blob(&c.embedding),
                c.metadata.to_string(),
            )
        })
        .collect();
    let summary = processed.summary;

    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let sql = format!(
                "UPDATE knowledge_documents
                 SET status = ?1, keywords = ?2, summary = ?3, processing_error = NULL,
                     updated_at = ?4
                 WHERE id = ?5 AND status IN ({})",
                placeholders(6, from.len())
            );
            let mut args: Vec<String> = vec![to, keywords, summary, now, id.clone()];
            args.extend(from);
            if tx.execute(&sql, params_from_iter(args.iter()))? == 0 {
                return Ok(false);
            }

            tx.execute(
                "DELETE FROM knowledge_chunks WHERE document_id = ?1",
                params![id],
            )?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO knowledge_chunks (document_id, chunk_index, text, embedding, metadata)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                )?;
                for (chunk_index, text, blob, metadata) in &rows {
                    stmt.execute(params![id, chunk_index, text, blob, metadata])?;
                }
            }
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a processing failure: drop all chunks and set status `to` with the error text.
pub async fn fail_processing(
    db: &Database,
    id: &str,
    error: &str,
    to: &str,
) -> Result<bool, MnemoError> {
    let id = id.to_string();
    let error = error.to_string();
    let to = to.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM knowledge_chunks WHERE document_id = ?1",
                params![id],
            )?;
            let changed = tx.execute(
                "UPDATE knowledge_documents
                 SET status = ?1, processing_error = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![to, error, now, id],
            )?;
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set `last_accessed_at` to now.
pub async fn touch_document(db: &Database, owner_id: &str, id: &str) -> Result<(), MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "UPDATE knowledge_documents SET last_accessed_at = ?1 WHERE id = ?2 AND owner_id = ?3",
                params![now, id, owner_id],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Bump usage counters for documents that contributed search results.
pub async fn record_references(
    db: &Database,
    owner_id: &str,
    ids: &[String],
) -> Result<(), MnemoError> {
    if ids.is_empty() {
        return Ok(());
    }
    let owner_id = owner_id.to_string();
    let ids = ids.to_vec();
    let now = now_timestamp();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            let sql = format!(
                "UPDATE knowledge_documents
                 SET times_referenced = times_referenced + 1, last_accessed_at = ?1
                 WHERE owner_id = ?2 AND id IN ({})",
                placeholders(3, ids.len())
            );
            let mut args = vec![now, owner_id];
            args.extend(ids);
            conn.execute(&sql, params_from_iter(args.iter()))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a document and (by cascade) its chunks. Returns `false` if nothing was deleted.
pub async fn delete_document(db: &Database, owner_id: &str, id: &str) -> Result<bool, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM knowledge_chunks WHERE document_id IN
                 (SELECT id FROM knowledge_documents WHERE id = ?1 AND owner_id = ?2)",
                params![id, owner_id],
            )?;
            let changed = tx.execute(
                "DELETE FROM knowledge_documents WHERE id = ?1 AND owner_id = ?2",
                params![id, owner_id],
            )?;
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Chunks of one document, in chunk order.
pub async fn get_chunks(
    db: &Database,
    owner_id: &str,
    id: &str,
) -> Result<Vec<ChunkRecord>, MnemoError> {
    let owner_id = owner_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChunkRecord>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT c.chunk_index, c.text, c.embedding, c.metadata
                 FROM knowledge_chunks c
                 JOIN knowledge_documents d ON d.id = c.document_id
                 WHERE c.document_id = ?1 AND d.owner_id = ?2
                 ORDER BY c.chunk_index",
            )?;
            let chunks = stmt
                .query_map(params![id, owner_id], |row| row_to_chunk(row, 0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(chunks)
        })
        .await
        .map_err(map_tr_err)
}

/// Every chunk of every document of `owner_id` whose status equals `status`.
pub async fn search_candidates(
    db: &Database,
    owner_id: &str,
    status: &str,
) -> Result<Vec<ChunkCandidate>, MnemoError> {
    let owner_id = owner_id.to_string();
    let status = status.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<ChunkCandidate>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.name, d.doc_type, d.category,
                        c.chunk_index, c.text, c.embedding, c.metadata
                 FROM knowledge_chunks c
                 JOIN knowledge_documents d ON d.id = c.document_id
                 WHERE d.owner_id = ?1 AND d.status = ?2
                 ORDER BY d.created_at, d.id, c.chunk_index",
            )?;
            let candidates = stmt
                .query_map(params![owner_id, status], |row| {
                    Ok(ChunkCandidate {
                        document_id: row.get(0)?,
                        document_name: row.get(1)?,
                        doc_type: row.get(2)?,
                        category: row.get(3)?,
                        chunk: row_to_chunk(row, 4)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(candidates)
        })
        .await
        .map_err(map_tr_err)
}

/// Aggregate counts for an owner's documents.
pub async fn document_counts(db: &Database, owner_id: &str) -> Result<DocumentCounts, MnemoError> {
    let owner_id = owner_id.to_string();
    db.connection()
        .call(move |conn| -> Result<DocumentCounts, rusqlite::Error> {
            let (total, total_chars): (i64, i64) = conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(raw_text)), 0)
                 FROM knowledge_documents WHERE owner_id = ?1",
                params![owner_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            let total_chunks: i64 = conn.query_row(
                "SELECT COUNT(*) FROM knowledge_chunks c
                 JOIN knowledge_documents d ON d.id = c.document_id
                 WHERE d.owner_id = ?1",
                params![owner_id],
                |row| row.get(0),
            )?;

            let group = |column: &str| -> Result<Vec<(String, i64)>, rusqlite::Error> {
                let sql = format!(
                    "SELECT {column}, COUNT(*) FROM knowledge_documents
                     WHERE owner_id = ?1 GROUP BY {column} ORDER BY {column}"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            };

            Ok(DocumentCounts {
                total,
                by_status: group("status")?,
                by_type: group("doc_type")?,
                by_category: group("category")?,
                total_chunks,
                total_chars,
            })
        })
        .await
        .map_err(map_tr_err)
}

fn row_to_document(row: &Row<'_>) -> Result<DocumentRecord, rusqlite::Error> {
    let tags: String = row.get(6)?;
    let keywords: String = row.get(9)?;
    Ok(DocumentRecord {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        name: row.get(2)?,
        doc_type: row.get(3)?,
        category: row.get(4)?,
        description: row.get(5)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        raw_text: row.get(7)?,
        summary: row.get(8)?,
        keywords: serde_json::from_str(&keywords).unwrap_or_default(),
        status: row.get(10)?,
        processing_error: row.get(11)?,
        times_referenced: row.get(12)?,
        last_accessed_at: row.get(13)?,
        created_at: row.get(14)?,
        updated_at: row.get(15)?,
    })
}

fn row_to_chunk(row: &Row<'_>, offset: usize) -> Result<ChunkRecord, rusqlite::Error> {
    let blob: Vec<u8> = row.get(offset + 2)?;
    let metadata: String = row.get(offset + 3)?;
    Ok(ChunkRecord {
        chunk_index: row.get(offset)?,
        text: row.get(offset + 1)?,
        embedding: blob_to_vec(&blob),
        metadata: serde_json::from_str(&metadata).unwrap_or(serde_json::Value::Null),
    })
}
