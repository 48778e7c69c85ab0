// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Word-window chunking.

/// A contiguous slice of a document's words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
}

/// Split `text` into consecutive windows of `target_words` whitespace-separated
/// words, joined by single spaces. The last window may be shorter.
///
/// Empty or whitespace-only input yields no chunks. A `target_words` of zero
/// is treated as one.
pub fn chunk_text(text: &str, target_words: usize) -> Vec<TextChunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(target_words.max(1))
        .enumerate()
        .map(|(chunk_index, window)| TextChunk {
            text: window.join(" "),
            chunk_index,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{i}")).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn empty_and_whitespace_yield_nothing() {
        assert!(chunk_text("", 800).is_empty());
        assert!(chunk_text(" \n\t  ", 800).is_empty());
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = chunk_text("hello   brave\nnew world", 800);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello brave new world");
        assert_eq!(chunks[0].chunk_index, 0);
    }

    #[test]
    fn sixteen_hundred_words_is_two_full_chunks() {
        let chunks = chunk_text(&words(1600), 800);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.text.split(' ').count() == 800));
        assert!(chunks[1].text.starts_with("w800 "));
    }

    #[test]
    fn last_chunk_may_be_short() {
        let chunks = chunk_text(&words(5), 2);
        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["w0 w1", "w2 w3", "w4"]);
    }

    proptest! {
        #[test]
        fn chunking_preserves_words_in_order(n in 0usize..3000, target in 1usize..1000) {
            let text = words(n);
            let chunks = chunk_text(&text, target);

            prop_assert_eq!(chunks.len(), n.div_ceil(target));
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.chunk_index, i);
                prop_assert!(chunk.text.split(' ').count() <= target);
            }
            let rejoined: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            prop_assert_eq!(rejoined.join(" "), text);
        }

        #[test]
        fn chunking_is_deterministic(n in 0usize..500) {
            let text = words(n);
            prop_assert_eq!(chunk_text(&text, 50), chunk_text(&text, 50));
        }
    }
}
