use tracing::debug;

use super::Processor;
use crate::config::Config;
use crate::error::{LexError, Result};
use crate::lexicon::{Lexicon, LexiconEngine, LexiconFactory};
use crate::utf8::Utf8Cursor;
use crate::Token;

/// Longest token, in codepoints, that a `u32` break mask can describe.
///
/// Bit `length - i` marks a split after codepoint `i`, so bits `1..=length`
/// are used and bit 0 never is.
pub const MAX_BREAK_CODEPOINTS: usize = 31;

/// Splits tokens at the boundaries recorded in a break-mask lexicon.
///
/// A token of `length` codepoints whose mask has bit `length - i` set is cut
/// after codepoint `i`. Whatever follows the last cut is emitted as a final
/// piece, so the output always concatenates back to the input. Tokens that
/// are too short, too long or absent from the lexicon pass through unchanged.
pub struct BreakProcessor {
    lexicon: LexiconEngine,
    min_token_length: usize,
    max_token_length: usize,
}

impl BreakProcessor {
    pub fn new(lexicon: LexiconEngine, min_token_length: i64, max_token_length: i64) -> Result<Self> {
        if max_token_length <= 0 {
            return Err(LexError::config("max_token_length must be greater than 0"));
        }
        Ok(Self {
            lexicon,
            min_token_length: usize::try_from(min_token_length.max(2)).unwrap_or(usize::MAX),
            max_token_length: usize::try_from(max_token_length).unwrap_or(usize::MAX),
        })
    }

    /// Reads `max_token_length`, `break_min_token_length` and the lexicon path `break`.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let max_token_length: i64 = cfg.get("max_token_length")?;
        let min_token_length: i64 = cfg.get("break_min_token_length")?;
        let lexicon = LexiconFactory::load(cfg.path("break")?)?;
        Self::new(lexicon, min_token_length, max_token_length)
    }

    pub fn lexicon(&self) -> &LexiconEngine {
        &self.lexicon
    }
}

impl Processor for BreakProcessor {
    fn process_token(&mut self, token: &Token, out: &mut Vec<Token>) -> Result<()> {
        let cursor = Utf8Cursor::new(token.text());
        let length = cursor.len();
        if length <= self.min_token_length {
            out.push(token.clone());
            return Ok(());
        }
        if length > self.max_token_length || length > MAX_BREAK_CODEPOINTS {
            debug!(token = %token, length, "token too long to segment");
            out.push(token.clone());
            return Ok(());
        }
        let mask = self.lexicon.search(token.text());
        if mask == 0 {
            out.push(token.clone());
            return Ok(());
        }

        let mut j = 0;
        for i in 0..length {
            let mark = 1u32 << (length - i);
            if mask & mark != 0 {
                out.push(token.derive(cursor.span(j, i)?));
                j = i + 1;
            }
        }
        if j < length {
            out.push(token.derive(cursor.tail(j)?));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconKind;

    /// Mask with a split after each listed codepoint.
    fn mask(length: usize, splits: &[usize]) -> u32 {
        splits.iter().fold(0, |m, &i| m | 1 << (length - i))
    }

    fn processor(entries: Vec<(&str, u32)>, max: i64) -> BreakProcessor {
        let entries = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        let lex = LexiconFactory::from_entries(LexiconKind::Trie, entries).unwrap();
        BreakProcessor::new(lex, 2, max).unwrap()
    }

    fn split(p: &mut BreakProcessor, text: &str) -> Vec<String> {
        let mut out = Vec::new();
        p.process_token(&Token::new(text), &mut out).unwrap();
        out.into_iter().map(|t| t.text().to_string()).collect()
    }

    #[test]
    fn splits_at_marked_boundaries() {
        let mut p = processor(vec![("北京大学", mask(4, &[1, 3])), ("中华人民共和国", mask(7, &[1, 3, 6]))], 16);
        assert_eq!(split(&mut p, "北京大学"), vec!["北京", "大学"]);
        assert_eq!(split(&mut p, "中华人民共和国"), vec!["中华", "人民", "共和国"]);
    }

    #[test]
    fn trailing_span_is_emitted() {
        let mut p = processor(vec![("北京大学", mask(4, &[1])), ("一二三", 1)], 16);
        assert_eq!(split(&mut p, "北京大学"), vec!["北京", "大学"]);
        // only bit 0 set: no boundary, token comes back whole
        assert_eq!(split(&mut p, "一二三"), vec!["一二三"]);
    }

    #[test]
    fn unknown_short_and_long_tokens_pass_through() {
        let long: String = std::iter::repeat('字').take(40).collect();
        let mut p = processor(vec![("北京", mask(2, &[0])), (long.as_str(), 2)], 64);
        assert_eq!(split(&mut p, "北京"), vec!["北京"]);
        assert_eq!(split(&mut p, "上海交大"), vec!["上海交大"]);
        assert_eq!(split(&mut p, &long), vec![long.clone()]);

        let mut narrow = processor(vec![("北京大学", mask(4, &[1]))], 3);
        assert_eq!(split(&mut narrow, "北京大学"), vec!["北京大学"]);
    }

    #[test]
    fn every_mask_preserves_the_token() {
        let text = "ab中文字x";
        let length = text.chars().count();
        for m in 0..(1u32 << (length + 1)) {
            let mut p = processor(vec![(text, m)], 32);
            let pieces = split(&mut p, text);
            assert_eq!(pieces.concat(), text, "mask {m:b}");
            assert!(pieces.iter().all(|s| !s.is_empty()));
        }
    }

    #[test]
    fn sub_tokens_keep_the_tag() {
        let mut p = processor(vec![("北京大学", mask(4, &[1]))], 16);
        let out = p.process(&[Token::with_tag("北京大学", "nt"), Token::new("的")]).unwrap();
        assert_eq!(out.len(), 3);
        assert!(out[..2].iter().all(|t| t.tag() == Some("nt")));
        assert_eq!(out[2].text(), "的");
    }

    #[test]
    fn rejects_non_positive_max_length() {
        let lex = LexiconFactory::create(LexiconKind::Trie);
        assert!(matches!(BreakProcessor::new(lex, 2, 0), Err(LexError::Config(_))));
    }

    #[test]
    fn huge_length_limits_are_accepted() {
        let mut p = processor(vec![("北京大学", mask(4, &[1]))], i64::MAX);
        assert_eq!(split(&mut p, "北京大学"), vec!["北京", "大学"]);
        let lex = LexiconFactory::create(LexiconKind::Hash);
        assert!(BreakProcessor::new(lex, i64::MAX, i64::MAX).is_ok());
    }

    #[test]
    fn from_config_requires_a_loadable_lexicon() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("break.idx");
        let mut cfg = Config::from_pairs([
            ("max_token_length", "16".to_string()),
            ("break_min_token_length", "1".to_string()),
            ("break", path.display().to_string()),
        ]);
        assert!(BreakProcessor::from_config(&cfg).is_err());

        LexiconFactory::from_entries(LexiconKind::Hash, vec![("北京大学".into(), mask(4, &[1]))])
            .unwrap()
            .save(&path)
            .unwrap();
        let mut p = BreakProcessor::from_config(&cfg).unwrap();
        assert_eq!(split(&mut p, "北京大学"), vec!["北京", "大学"]);

        cfg.set("max_token_length", -1);
        assert!(BreakProcessor::from_config(&cfg).is_err());
    }
}
