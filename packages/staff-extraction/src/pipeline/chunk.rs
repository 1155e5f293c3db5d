//! Line-aware text chunking with overlap.
//!
//! [`TextChunks`] is a lazy iterator over borrowed slices. Cloning it before
//! consumption (or calling [`chunk_text`] again) restarts the sequence.
//! Sizes are measured in UTF-8 bytes; splits always land on char boundaries.

use crate::types::config::ChunkConfig;

/// Lazy, finite sequence of overlapping chunks.
#[derive(Debug, Clone)]
pub struct TextChunks<'a> {
    text: &'a str,
    limit: usize,
    overlap: usize,
    pos: usize,
    done: bool,
}

/// Split `text` according to `config`.
pub fn chunk_text<'a>(text: &'a str, config: &ChunkConfig) -> TextChunks<'a> {
    TextChunks {
        text,
        limit: config.chunk_chars.max(1),
        overlap: config.overlap_chars(),
        pos: 0,
        done: text.trim().is_empty(),
    }
}

impl<'a> Iterator for TextChunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let start = self.pos;
        let rest = &self.text[start..];
        if rest.len() <= self.limit {
            self.done = true;
            return (!rest.trim().is_empty()).then_some(rest);
        }

        let hard_end = floor_char_boundary(self.text, start + self.limit);
        // Prefer the last line break in the window, unless it would leave a
        // tiny chunk
        let end = self.text[start..hard_end]
            .rfind('\n')
            .map(|i| start + i + 1)
            .filter(|&end| end - start > self.limit / 2)
            .unwrap_or(hard_end);

        let back = floor_char_boundary(self.text, end.saturating_sub(self.overlap));
        let mut next = self.text[back..end]
            .find('\n')
            .map(|i| back + i + 1)
            .unwrap_or(back);
        if next <= start || next >= end {
            next = end;
        }
        self.pos = next;

        Some(&self.text[start..end])
    }
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index > 0 && !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}
