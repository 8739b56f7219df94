//! Boundary-aware text splitting.
//!
//! [`TextChunker`] cuts raw text into segments of at most `max_size`
//! characters, preferring to split at a paragraph, line, sentence, or word
//! boundary found within a lookback window of the size limit. When no
//! boundary is in reach it falls back to a hard character split, so the size
//! bound always holds. Adjacent chunks can share `overlap` characters of
//! trailing/leading context to preserve meaning across a cut.
//!
//! Splitting is fully deterministic: the same input and configuration always
//! produce the same sequence.

/// Separator preference, highest first. Mirrors the classic recursive
/// character splitter: paragraph break, line break, sentence end, word gap.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// Splits text into bounded, optionally overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunker {
    max_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker. Callers validate `overlap < max_size` up front via
    /// [`crate::config::MemoryConfig::validate`].
    pub fn new(max_size: usize, overlap: usize) -> Self {
        debug_assert!(max_size > 0, "chunk size must be positive");
        debug_assert!(overlap < max_size, "overlap must be smaller than chunk size");
        Self { max_size, overlap }
    }

    /// Split `text` into non-empty chunks of at most `max_size` characters.
    ///
    /// Whitespace-only input yields an empty vector; callers treat that as a
    /// zero-chunk store, not an error.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        // How far back from the size limit we are willing to look for a
        // natural boundary before giving up and cutting mid-word.
        let lookback = (self.max_size / 2).max(1);

        let mut start = 0;
        while start < chars.len() {
            let remaining = chars.len() - start;
            if remaining <= self.max_size {
                push_trimmed(&chars[start..], &mut chunks);
                break;
            }

            let window = &chars[start..start + self.max_size];
            let split = find_boundary(window, lookback).unwrap_or(self.max_size);
            push_trimmed(&window[..split], &mut chunks);

            // Step back by the overlap so the next chunk re-includes the
            // tail, but always make forward progress.
            start += split.saturating_sub(self.overlap).max(1);
        }

        chunks
    }
}

/// Find the end index (exclusive) of the best boundary inside the last
/// `lookback` characters of `window`, trying separators in priority order.
fn find_boundary(window: &[char], lookback: usize) -> Option<usize> {
    let min_end = window.len().saturating_sub(lookback);
    for sep in SEPARATORS {
        let sep_chars: Vec<char> = sep.chars().collect();
        let mut end = window.len();
        while end >= sep_chars.len() && end > min_end {
            if window[end - sep_chars.len()..end] == sep_chars[..] {
                return Some(end);
            }
            end -= 1;
        }
    }
    None
}

fn push_trimmed(slice: &[char], chunks: &mut Vec<String>) {
    let text: String = slice.iter().collect();
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = TextChunker::new(100, 20);
        let chunks = chunker.chunk("A short note.");
        assert_eq!(chunks, vec!["A short note.".to_string()]);
    }

    #[test]
    fn whitespace_only_input_yields_nothing() {
        let chunker = TextChunker::new(100, 20);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n\t  ").is_empty());
    }

    #[test]
    fn no_chunk_exceeds_max_size() {
        let chunker = TextChunker::new(50, 10);
        let text = "word ".repeat(200);
        let chunks = chunker.chunk(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 50, "oversized chunk: {chunk:?}");
        }
    }

    #[test]
    fn prefers_sentence_boundaries() {
        let chunker = TextChunker::new(40, 0);
        let text = "Alice lives in Paris. Bob lives in Rome. Carol lives in Oslo.";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        // Every cut made at a sentence boundary leaves a full stop at the end.
        assert!(chunks[0].ends_with('.'), "got: {:?}", chunks[0]);
    }

    #[test]
    fn hard_splits_unbroken_text() {
        let chunker = TextChunker::new(10, 0);
        let text = "x".repeat(35);
        let chunks = chunker.chunk(&text);
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].len(), 10);
        assert_eq!(chunks[3].len(), 5);
    }

    #[test]
    fn overlap_repeats_trailing_context() {
        let chunker = TextChunker::new(20, 8);
        let text = "abcdefghij klmnopqrst uvwxyz abcdefghij klmnopqrst";
        let chunks = chunker.chunk(text);
        assert!(chunks.len() >= 2);
        // The tail of each chunk reappears at the head of the next one.
        for pair in chunks.windows(2) {
            let tail: String = pair[0].chars().rev().take(4).collect::<Vec<_>>()
                .into_iter().rev().collect();
            assert!(
                pair[1].contains(tail.trim()) || tail.trim().is_empty(),
                "expected overlap between {:?} and {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn splitting_is_deterministic() {
        let chunker = TextChunker::new(30, 5);
        let text = "One sentence here. Another one there.\n\nA new paragraph follows with more words.";
        assert_eq!(chunker.chunk(text), chunker.chunk(text));
    }
}
