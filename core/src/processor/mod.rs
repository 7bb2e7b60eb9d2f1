//! Token processors applied after tokenization.

mod break_processor;

pub use break_processor::{BreakProcessor, MAX_BREAK_CODEPOINTS};

use crate::error::Result;
use crate::Token;

pub trait Processor {
    /// Rewrite one token into zero or more tokens appended to `out`.
    fn process_token(&mut self, token: &Token, out: &mut Vec<Token>) -> Result<()>;

    fn process(&mut self, tokens: &[Token]) -> Result<Vec<Token>> {
        let mut out = Vec::with_capacity(tokens.len());
        for token in tokens {
            self.process_token(token, &mut out)?;
        }
        Ok(out)
    }
}
