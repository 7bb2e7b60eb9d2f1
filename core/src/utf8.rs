//! Codepoint-safe slicing helpers.
//!
//! Segmentation works in codepoint positions while Rust strings are indexed by
//! bytes. [`Utf8Cursor`] records the byte offset of every codepoint boundary
//! once, so that any `[start, end)` codepoint range maps to a byte range that
//! is guaranteed to fall on character boundaries.

use crate::error::{LexError, Result};

/// Number of codepoints in `s`.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Substring of `count` codepoints starting at codepoint `start`.
pub fn sub(s: &str, start: usize, count: usize) -> Result<&str> {
    Utf8Cursor::new(s).slice(start, start + count)
}

#[derive(Debug, Clone)]
pub struct Utf8Cursor<'a> {
    text: &'a str,
    /// Byte offset of each codepoint, followed by `text.len()`.
    bounds: Vec<usize>,
}

impl<'a> Utf8Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut bounds: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
        bounds.push(text.len());
        Self { text, bounds }
    }

    /// Codepoint length of the underlying text.
    pub fn len(&self) -> usize {
        self.bounds.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Codepoints `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&'a str> {
        if start > end || end > self.len() {
            return Err(LexError::encoding(format!(
                "codepoint range {start}..{end} outside token of {} codepoints",
                self.len()
            )));
        }
        Ok(&self.text[self.bounds[start]..self.bounds[end]])
    }

    /// Codepoints `[start, end]`, both inclusive.
    pub fn span(&self, start: usize, end: usize) -> Result<&'a str> {
        self.slice(start, end + 1)
    }

    /// Everything from codepoint `start` to the end.
    pub fn tail(&self, start: usize) -> Result<&'a str> {
        self.slice(start, self.len())
    }
}
