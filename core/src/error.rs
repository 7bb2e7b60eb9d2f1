//! Error type shared by every cnlex component.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LexError {
    /// Missing or invalid configuration value, unknown engine or tokenizer tag.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Corrupt binary index or malformed text entry.
    #[error("format error: {0}")]
    Format(String),

    /// A fixed-capacity table refused an insert.
    #[error("capacity exceeded: {len} records do not fit in {capacity} slots")]
    Capacity { capacity: usize, len: usize },

    #[error("encoding error: {0}")]
    Encoding(String),

    #[error("fst error: {0}")]
    Fst(#[from] fst::Error),

    #[error("bincode error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LexError>;

impl LexError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        LexError::Config(msg.into())
    }

    pub fn format<S: Into<String>>(msg: S) -> Self {
        LexError::Format(msg.into())
    }

    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        LexError::Encoding(msg.into())
    }

    /// True for errors that only concern one corpus item and may be skipped
    /// during batch ingestion.
    pub fn is_per_item(&self) -> bool {
        matches!(self, LexError::Io(_) | LexError::Encoding(_))
    }
}

impl From<std::str::Utf8Error> for LexError {
    fn from(e: std::str::Utf8Error) -> Self {
        LexError::Encoding(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for LexError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        LexError::Encoding(e.to_string())
    }
}
