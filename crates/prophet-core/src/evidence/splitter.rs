//! Recursive character splitting into overlapping windows.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::config::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, DEFAULT_SEPARATORS};

/// How documents are cut into chunks. Sizes are in characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitterConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    /// Tried in order; the first one present in a piece of text is used to split it.
    pub separators: Vec<String>,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Splits text on the coarsest separator that keeps pieces under
/// `chunk_size`, falling back to finer separators and finally to fixed
/// character windows. Neighbouring chunks share up to `chunk_overlap`
/// characters.
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(config: &SplitterConfig) -> Self {
        let chunk_size = config.chunk_size.max(1);
        Self {
            chunk_size,
            chunk_overlap: config.chunk_overlap.min(chunk_size - 1),
            separators: config
                .separators
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Returns the non-empty chunks of `text`, in document order.
    pub fn split(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let Some(pos) = separators.iter().position(|s| text.contains(s.as_str())) else {
            return self.hard_split(text);
        };
        let separator = separators[pos].as_str();
        let finer = &separators[pos + 1..];

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in text.split_inclusive(separator) {
            if char_len(piece) <= self.chunk_size {
                pending.push(piece);
                continue;
            }
            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }
            chunks.extend(self.split_recursive(piece, finer));
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }
        chunks
    }

    /// Packs small pieces into windows of at most `chunk_size`, carrying the
    /// tail of each window (at most `chunk_overlap`) into the next one.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut window: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for &piece in pieces {
            let len = char_len(piece);
            if total + len > self.chunk_size && !window.is_empty() {
                push_chunk(&mut chunks, &window);
                while total > self.chunk_overlap
                    || (total + len > self.chunk_size && total > 0)
                {
                    match window.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }
            window.push_back(piece);
            total += len;
        }

        push_chunk(&mut chunks, &window);
        chunks
    }

    /// Fixed character windows for text without any usable separator.
    fn hard_split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let stride = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            let chunk = chunk.trim();
            if !chunk.is_empty() {
                chunks.push(chunk.to_string());
            }
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

fn push_chunk(chunks: &mut Vec<String>, window: &VecDeque<&str>) {
    let joined: String = window.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn splitter(size: usize, overlap: usize) -> TextSplitter {
        TextSplitter::new(&SplitterConfig {
            chunk_size: size,
            chunk_overlap: overlap,
            ..SplitterConfig::default()
        })
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = splitter(500, 100).split("A single short paragraph.");
        assert_eq!(chunks, vec!["A single short paragraph."]);
    }

    #[test]
    fn test_empty_text() {
        assert!(splitter(100, 10).split("   \n\n ").is_empty());
    }

    #[test]
    fn test_paragraphs_respected() {
        let text = "Alpha paragraph here.\n\nBeta paragraph here.\n\nGamma paragraph here.";
        let chunks = splitter(25, 0).split(text);
        assert_eq!(
            chunks,
            vec!["Alpha paragraph here.", "Beta paragraph here.", "Gamma paragraph here."]
        );
    }

    #[test]
    fn test_chunks_never_exceed_size() {
        let text = "word ".repeat(400);
        for chunk in splitter(50, 10).split(&text) {
            assert!(chunk.chars().count() <= 50, "chunk too long: {}", chunk.len());
        }
    }

    #[test]
    fn test_neighbouring_chunks_overlap() {
        let text = (0..40).map(|i| format!("w{:02}", i)).collect::<Vec<_>>().join(" ");
        let chunks = splitter(40, 12).split(&text);
        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let last_word = pair[0].split(' ').last().unwrap();
            assert!(pair[1].contains(last_word), "{:?} / {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_hard_split_without_separators() {
        let text = "x".repeat(25);
        let chunks = splitter(10, 0).split(&text);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2], "xxxxx");
    }

    #[test]
    fn test_unicode_safe() {
        let text = "é".repeat(30);
        let chunks = splitter(7, 2).split(&text);
        assert!(chunks.iter().all(|c| c.chars().count() <= 7));
    }
}
