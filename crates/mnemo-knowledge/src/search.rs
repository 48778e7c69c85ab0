// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Brute-force cosine ranking over stored chunks.
//!
//! Every chunk of every ready document is scored. An approximate index can
//! replace [`rank_chunks`] without changing the search contract.

use mnemo_core::vector::cosine_similarity;
use mnemo_storage::ChunkCandidate;
use serde::Serialize;

/// Where a search hit came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HitSource {
    pub document_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub category: String,
    pub chunk_index: i64,
}

/// One ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub similarity: f32,
    pub source: HitSource,
    pub metadata: serde_json::Value,
}

/// Overrides for the configured search defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchOptions {
    pub limit: Option<usize>,
    pub threshold: Option<f32>,
}

/// Score candidates against `query`, keep the best `limit`, then drop any
/// whose similarity is not strictly above `threshold`.
///
/// Candidates with a different dimension than the query are skipped.
pub fn rank_chunks(
    query: &[f32],
    candidates: Vec<ChunkCandidate>,
    limit: usize,
    threshold: f32,
) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = candidates
        .into_iter()
        .filter(|c| c.chunk.embedding.len() == query.len())
        .map(|c| SearchHit {
            similarity: cosine_similarity(query, &c.chunk.embedding),
            text: c.chunk.text,
            metadata: c.chunk.metadata,
            source: HitSource {
                document_id: c.document_id,
                name: c.document_name,
                doc_type: c.doc_type,
                category: c.category,
                chunk_index: c.chunk.chunk_index,
            },
        })
        .collect();

    hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
    hits.truncate(limit);
    hits.retain(|h| h.similarity > threshold);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use mnemo_storage::ChunkRecord;

    fn candidate(doc: &str, index: i64, embedding: Vec<f32>) -> ChunkCandidate {
        ChunkCandidate {
            document_id: doc.to_string(),
            document_name: format!("{doc}.txt"),
            doc_type: "text".to_string(),
            category: "faq".to_string(),
            chunk: ChunkRecord {
                chunk_index: index,
                text: format!("{doc}#{index}"),
                embedding,
                metadata: serde_json::Value::Null,
            },
        }
    }

    #[test]
    fn results_are_sorted_and_above_threshold() {
        let query = vec![1.0, 0.0];
        let hits = rank_chunks(
            &query,
            vec![
                candidate("a", 0, vec![0.8, 0.6]),
                candidate("b", 0, vec![1.0, 0.0]),
                candidate("c", 0, vec![0.0, 1.0]),
                candidate("d", 0, vec![0.9, 0.1]),
            ],
            10,
            0.7,
        );
        let ids: Vec<&str> = hits.iter().map(|h| h.source.document_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d", "a"]);
        assert!(hits.windows(2).all(|w| w[0].similarity >= w[1].similarity));
        assert!(hits.iter().all(|h| h.similarity > 0.7));
    }

    #[test]
    fn keeps_best_hits_within_limit() {
        let query = vec![1.0, 0.0];
        let hits = rank_chunks(
            &query,
            vec![
                candidate("c", 0, vec![0.85, 0.15]),
                candidate("a", 0, vec![1.0, 0.0]),
                candidate("b", 0, vec![0.9, 0.1]),
            ],
            2,
            0.7,
        );
        let ids: Vec<&str> = hits.iter().map(|h| h.source.document_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn similarity_equal_to_threshold_is_dropped() {
        let query = vec![1.0, 0.0];
        let hits = rank_chunks(&query, vec![candidate("a", 0, vec![0.0, 1.0])], 5, 0.0);
        assert!(hits.is_empty());
    }

    #[test]
    fn mismatched_dimensions_are_skipped() {
        let query = vec![1.0, 0.0];
        let hits = rank_chunks(
            &query,
            vec![
                candidate("a", 0, vec![1.0, 0.0, 0.0]),
                candidate("b", 1, vec![1.0, 0.0]),
            ],
            5,
            0.5,
        );
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].source.chunk_index, 1);
    }

    #[test]
    fn no_candidates_no_hits() {
        assert!(rank_chunks(&[1.0], vec![], 5, 0.7).is_empty());
    }
}
