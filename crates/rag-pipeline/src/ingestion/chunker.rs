//! Text chunking into overlapping fixed-size windows

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};

/// Where a chunk may end
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Hard cuts every `chunk_size` characters
    Fixed,
    /// Prefer paragraph, line, sentence, then word boundaries; hard cut if none fits
    #[default]
    Recursive,
}

/// A chunk together with its character range in the source text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSpan {
    /// Position of the chunk (0..N-1)
    pub index: u32,
    /// First character (inclusive), counted in chars
    pub char_start: usize,
    /// Last character (exclusive), counted in chars
    pub char_end: usize,
    /// Exact substring `text[char_start..char_end]`
    pub text: String,
}

/// Splits text into windows of at most `chunk_size` characters where each
/// window starts `overlap` characters before the previous one ended.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
    strategy: ChunkingStrategy,
}

/// Separators tried in order by the recursive strategy
const LINE_SEPARATORS: [&str; 2] = ["\n\n", "\n"];

impl TextChunker {
    /// Create a boundary-aware chunker
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        Self::with_strategy(chunk_size, overlap, ChunkingStrategy::Recursive)
    }

    /// Create a chunker with an explicit strategy
    pub fn with_strategy(
        chunk_size: usize,
        overlap: usize,
        strategy: ChunkingStrategy,
    ) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::Config("chunk size must be greater than 0".to_string()));
        }
        if overlap >= chunk_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }

        Ok(Self {
            chunk_size,
            overlap,
            strategy,
        })
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::with_strategy(config.chunk_size, config.chunk_overlap, config.strategy)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn strategy(&self) -> ChunkingStrategy {
        self.strategy
    }

    /// Split text into ordered chunk strings
    pub fn split(&self, text: &str) -> Vec<String> {
        self.split_spans(text).into_iter().map(|s| s.text).collect()
    }

    /// Split text into ordered chunks with character offsets
    pub fn split_spans(&self, text: &str) -> Vec<ChunkSpan> {
        // Byte offset of every char, so windows never cut inside a code point
        let offsets: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        let total = offsets.len();
        let byte_at = |c: usize| if c == total { text.len() } else { offsets[c] };

        let mut spans = Vec::new();
        let mut start = 0usize;

        while start < total {
            let hard_end = (start + self.chunk_size).min(total);
            let end = if hard_end == total {
                total
            } else {
                match self.strategy {
                    ChunkingStrategy::Fixed => hard_end,
                    ChunkingStrategy::Recursive => self
                        .find_break(text, &offsets, start, hard_end)
                        .unwrap_or(hard_end),
                }
            };

            spans.push(ChunkSpan {
                index: spans.len() as u32,
                char_start: start,
                char_end: end,
                text: text[byte_at(start)..byte_at(end)].to_string(),
            });

            if end == total {
                break;
            }
            start = end - self.overlap;
        }

        spans
    }

    /// Latest natural break in the back half of the window, as a char index.
    ///
    /// The result is always greater than `start + overlap` so the next window
    /// makes progress.
    fn find_break(
        &self,
        text: &str,
        offsets: &[usize],
        start: usize,
        hard_end: usize,
    ) -> Option<usize> {
        let lower = (start + self.overlap + 1).max(start + self.chunk_size / 2);
        if lower >= hard_end {
            return None;
        }

        let window_start = offsets[lower];
        let window_end = offsets[hard_end];
        let window = &text[window_start..window_end];

        let to_char = |byte: usize| offsets.binary_search(&byte).ok();

        for separator in LINE_SEPARATORS {
            if let Some(pos) = window.rfind(separator) {
                return to_char(window_start + pos + separator.len());
            }
        }

        if let Some((pos, _)) = window
            .split_sentence_bound_indices()
            .filter(|(pos, _)| *pos > 0)
            .last()
        {
            return to_char(window_start + pos);
        }

        if let Some(pos) = window.rfind(char::is_whitespace) {
            let width = window[pos..].chars().next().map_or(1, char::len_utf8);
            return to_char(window_start + pos + width);
        }

        None
    }
}
