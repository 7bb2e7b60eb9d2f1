use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;

use crate::config::Config;
use crate::error::{LexError, Result};
use crate::Token;

lazy_static! {
    static ref WORD_RE: Regex =
        Regex::new(r"(?u)\p{Han}+|\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
}

/// Turns raw text into an ordered token sequence. Stateless per call.
pub trait Tokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>>;
}

/// Splits on whitespace. With `split_tags`, `word/tag` pieces carry a tag.
#[derive(Debug, Clone, Default)]
pub struct WhitespaceTokenizer {
    split_tags: bool,
}

impl WhitespaceTokenizer {
    pub fn new(split_tags: bool) -> Self { Self { split_tags } }
}

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let tokens = text
            .split_whitespace()
            .map(|piece| match piece.rsplit_once('/') {
                Some((word, tag)) if self.split_tags && !word.is_empty() && !tag.is_empty() => {
                    Token::with_tag(word, tag)
                }
                _ => Token::new(piece),
            })
            .collect();
        Ok(tokens)
    }
}

/// NFKC normalization and lowercasing, then runs of Han characters, words and digits.
#[derive(Debug, Clone, Default)]
pub struct WordTokenizer;

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<Token>> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        Ok(WORD_RE.find_iter(&normalized).map(|m| Token::new(m.as_str())).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenizerKind {
    Whitespace,
    Word,
}

impl FromStr for TokenizerKind {
    type Err = LexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "whitespace" => Ok(TokenizerKind::Whitespace),
            "word" => Ok(TokenizerKind::Word),
            other => Err(LexError::config(format!("unknown tokenizer '{other}'"))),
        }
    }
}

pub fn build_tokenizer(kind: TokenizerKind, split_tags: bool) -> Box<dyn Tokenizer> {
    match kind {
        TokenizerKind::Whitespace => Box::new(WhitespaceTokenizer::new(split_tags)),
        TokenizerKind::Word => Box::new(WordTokenizer),
    }
}

/// Build the tokenizer described by a parser config (`tokenizer`, `split_tags`).
pub fn tokenizer_from_config(cfg: &Config) -> Result<Box<dyn Tokenizer>> {
    let kind: TokenizerKind = cfg.get_or("tokenizer", TokenizerKind::Whitespace)?;
    let split_tags = cfg.get_or::<u32>("split_tags", 1)? != 0;
    Ok(build_tokenizer(kind, split_tags))
}

/// Load a parser config file and build its tokenizer.
pub fn load_tokenizer<P: AsRef<Path>>(path: P) -> Result<Box<dyn Tokenizer>> {
    tokenizer_from_config(&Config::load(path)?)
}

/// Named tokenizers initialized once and looked up by name.
#[derive(Default)]
pub struct TokenizerRegistry {
    handlers: BTreeMap<String, Box<dyn Tokenizer>>,
}

impl TokenizerRegistry {
    /// Initialize every tokenizer in a comma-separated list such as `"whitespace,word"`.
    pub fn from_names(names: &str) -> Result<Self> {
        let mut registry = Self::default();
        for name in names.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let kind: TokenizerKind = name.parse()?;
            registry.register(name, build_tokenizer(kind, true));
        }
        Ok(registry)
    }

    /// Registry for the `parsers` key of a parser config, `whitespace` if absent.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::from_names(&cfg.get_or("parsers", "whitespace".to_string())?)
    }

    pub fn register<S: Into<String>>(&mut self, name: S, tokenizer: Box<dyn Tokenizer>) {
        self.handlers.insert(name.into(), tokenizer);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Tokenizer> {
        self.handlers.get(name).map(|t| t.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_splits_tags() {
        let t = WhitespaceTokenizer::new(true).tokenize("北京/ns 大学/n  a/").unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(t[0].text(), "北京");
        assert_eq!(t[0].tag(), Some("ns"));
        assert_eq!(t[2].text(), "a/");
        assert_eq!(t[2].tag(), None);
    }

    #[test]
    fn registry_rejects_unknown_names() {
        assert!(TokenizerRegistry::from_names("whitespace,crf_seg").is_err());
        let r = TokenizerRegistry::from_names("whitespace, word").unwrap();
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["whitespace", "word"]);
        assert!(r.get("word").is_some());
        assert!(r.get("crf_seg").is_none());
    }

    #[test]
    fn registry_reads_the_parsers_key() {
        let r = TokenizerRegistry::from_config(&Config::new()).unwrap();
        assert_eq!(r.names().collect::<Vec<_>>(), vec!["whitespace"]);
        let cfg = Config::from_pairs([("parsers", "word")]);
        assert!(TokenizerRegistry::from_config(&cfg).unwrap().get("word").is_some());
    }
}
