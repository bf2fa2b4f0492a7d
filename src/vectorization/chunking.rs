//! Splits extracted file text into overlapping, word-aligned chunks.
//!
//! Offsets are byte offsets into the trimmed text and always fall on UTF-8
//! character boundaries.

use crate::config::FileSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkConfig {
    /// Maximum bytes per chunk.
    pub max_chars: usize,
    /// Bytes shared between consecutive chunks.
    pub overlap: usize,
    /// Chunks shorter than this are dropped unless they end the text.
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from(&FileSettings::default())
    }
}

impl From<&FileSettings> for ChunkConfig {
    fn from(settings: &FileSettings) -> Self {
        let max_chars = settings.chunk_size.max(1);
        Self {
            max_chars,
            // An overlap as large as the window would never advance.
            overlap: settings.chunk_overlap.min(max_chars / 2),
            min_chunk_size: settings.min_chunk_size.min(max_chars),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub index: usize,
    pub start_offset: usize,
    pub end_offset: usize,
}

pub fn chunk_text(text: &str, config: &ChunkConfig) -> Vec<TextChunk> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }

    if text.len() <= config.max_chars {
        return vec![TextChunk {
            text: text.to_string(),
            index: 0,
            start_offset: 0,
            end_offset: text.len(),
        }];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let mut end = floor_char_boundary(text, (start + config.max_chars).min(text.len()));
        if end < text.len() {
            end = word_boundary(text, start + config.min_chunk_size, end);
        }
        if end <= start {
            end = next_char_boundary(text, start);
        }

        let slice = &text[start..end];
        if slice.len() >= config.min_chunk_size || end == text.len() {
            chunks.push(TextChunk {
                text: slice.to_string(),
                index: chunks.len(),
                start_offset: start,
                end_offset: end,
            });
        }

        if end >= text.len() {
            break;
        }

        let next = floor_char_boundary(text, end.saturating_sub(config.overlap));
        start = if next <= start { end } else { next };
    }

    chunks
}

/// Position just after the last whitespace or punctuation in
/// `text[min_pos..end]`, or `end` when there is none.
fn word_boundary(text: &str, min_pos: usize, end: usize) -> usize {
    let min_pos = floor_char_boundary(text, min_pos.min(end));
    text[min_pos..end]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace() || matches!(c, '.' | '!' | '?' | ';' | ','))
        .map(|(i, c)| min_pos + i + c.len_utf8())
        .unwrap_or(end)
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    text[index..]
        .chars()
        .next()
        .map_or(text.len(), |c| index + c.len_utf8())
}
