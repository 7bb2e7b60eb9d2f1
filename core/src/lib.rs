pub mod affinity;
pub mod config;
pub mod corpus;
pub mod error;
pub mod lexicon;
pub mod persist;
pub mod processor;
pub mod select;
pub mod stats;
pub mod tokenizer;
pub mod utf8;

use serde::{Deserialize, Serialize};

pub use error::{LexError, Result};

/// Dense 1-based identifier assigned by the word trainer. 0 means "absent".
pub type TokenId = u32;

/// One token produced by a tokenizer or a processor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    text: String,
    tag: Option<String>,
}

impl Token {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self { text: text.into(), tag: None }
    }

    pub fn with_tag<S: Into<String>, T: Into<String>>(text: S, tag: T) -> Self {
        Self { text: text.into(), tag: Some(tag.into()) }
    }

    pub fn text(&self) -> &str { &self.text }

    pub fn tag(&self) -> Option<&str> { self.tag.as_deref() }

    /// Length in bytes.
    pub fn len(&self) -> usize { self.text.len() }

    pub fn is_empty(&self) -> bool { self.text.is_empty() }

    /// Length in codepoints.
    pub fn char_len(&self) -> usize { self.text.chars().count() }

    /// A token with `text` that keeps this token's tag.
    pub fn derive<S: Into<String>>(&self, text: S) -> Self {
        Self { text: text.into(), tag: self.tag.clone() }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}
