//! Recursive character text splitting.
//!
//! Text is cut into windows of at most `chunk_size` characters. Inside each
//! window the cut point is moved back to the last paragraph break, line break
//! or space (in that order of preference); a hard cut is used only when the
//! window contains none of them. Consecutive chunks share exactly
//! `chunk_overlap` characters.

use crate::types::{AppError, DocumentChunk, Metadata, Result};
use serde_json::json;

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Default overlap between consecutive chunks.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Break points in priority order.
const SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl TextChunker {
    /// Create a chunker.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Chunking` unless `0 < chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(AppError::Chunking("chunk_size must be positive".into()));
        }
        if chunk_overlap == 0 {
            return Err(AppError::Chunking("chunk_overlap must be positive".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(AppError::Chunking(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Lazily split `text` into chunks. The iterator is consumed once.
    pub fn split<'a>(&self, text: &'a str) -> Chunks<'a> {
        let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        boundaries.push(text.len());

        Chunks {
            text,
            boundaries,
            chunk_size: self.chunk_size,
            chunk_overlap: self.chunk_overlap,
            start: 0,
            line_cursor: (0, 1),
            done: text.is_empty(),
        }
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// Iterator over the chunks of one source text.
pub struct Chunks<'a> {
    text: &'a str,
    /// Byte offset of every char, followed by `text.len()`.
    boundaries: Vec<usize>,
    chunk_size: usize,
    chunk_overlap: usize,
    /// Char index where the next window starts.
    start: usize,
    /// (byte offset, 1-based line number at that offset); only moves forward.
    line_cursor: (usize, usize),
    done: bool,
}

impl<'a> Chunks<'a> {
    fn char_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Char index just past the preferred break inside `[start, window_end)`.
    ///
    /// Only breaks beyond `start + chunk_overlap` are considered so the next
    /// window always starts after this one.
    fn break_point(&self, start: usize, window_end: usize) -> usize {
        let from = self.boundaries[start + self.chunk_overlap];
        let to = self.boundaries[window_end];
        let window = &self.text[from..to];

        for separator in SEPARATORS {
            if let Some(pos) = window.rfind(separator) {
                let end_byte = from + pos + separator.len();
                if let Ok(end) = self.boundaries.binary_search(&end_byte) {
                    return end;
                }
            }
        }

        window_end
    }

    fn line_at(&mut self, byte: usize) -> usize {
        let (cursor, line) = self.line_cursor;
        let line = line + self.text[cursor..byte].matches('\n').count();
        self.line_cursor = (byte, line);
        line
    }

    fn make_chunk(&mut self, start: usize, end: usize) -> DocumentChunk {
        let (from_byte, to_byte) = (self.boundaries[start], self.boundaries[end]);
        let text = &self.text[from_byte..to_byte];

        let from_line = self.line_at(from_byte);
        let to_line = from_line + text.trim_end_matches('\n').matches('\n').count();

        let mut metadata = Metadata::new();
        metadata.insert(
            "loc".to_string(),
            json!({ "lines": { "from": from_line, "to": to_line } }),
        );

        DocumentChunk {
            text: text.to_string(),
            source_offset: start,
            metadata,
        }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = DocumentChunk;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let total = self.char_count();
        let start = self.start;
        let window_end = (start + self.chunk_size).min(total);
        let end = if window_end == total {
            total
        } else {
            self.break_point(start, window_end)
        };

        let chunk = self.make_chunk(start, end);

        if end == total {
            self.done = true;
        } else {
            let next = end - self.chunk_overlap;
            self.start = if next > start { next } else { end };
        }

        Some(chunk)
    }
}

impl<'a> std::iter::FusedIterator for Chunks<'a> {}
