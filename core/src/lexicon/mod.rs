//! Persistent token → value lexicons.
//!
//! A lexicon maps UTF-8 token strings to one `u32` each. What the value means
//! (break mask, dense identifier, document frequency) is decided by whoever
//! builds it; the engines only store it. Value `0` doubles as "absent", so
//! [`Lexicon::search`] never fails.
//!
//! Engines form a closed set ([`LexiconKind`]). [`LexiconEngine`] wraps any
//! of them behind the [`Lexicon`] trait and [`LexiconFactory`] creates or
//! loads one from a tag or a file, so callers never name a concrete engine.
//!
//! Binary layout of a saved lexicon (little-endian):
//!
//! ```text
//! magic    "CNLX"
//! version  u16
//! engine   u8      (0 = trie, 1 = hash)
//! entries  u64
//! payload  u64 length + engine-owned bytes
//! crc32    u32     over everything above
//! ```

mod hash;
mod text;
mod trie;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, info};

use crate::error::{LexError, Result};
use crate::persist::{read_file, write_file, StructReader};
use crate::stats::FeatureFilter;

pub use hash::HashLexicon;
pub use text::{parse_text_line, read_text_entries, write_text_entries};
pub use trie::TrieLexicon;

const MAGIC: &[u8; 4] = b"CNLX";
const VERSION: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexiconKind {
    /// Finite-state transducer over keys in byte order.
    #[default]
    Trie,
    Hash,
}

impl LexiconKind {
    fn tag(self) -> u8 {
        match self {
            LexiconKind::Trie => 0,
            LexiconKind::Hash => 1,
        }
    }

    fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            0 => Ok(LexiconKind::Trie),
            1 => Ok(LexiconKind::Hash),
            other => Err(LexError::format(format!("unknown lexicon engine tag {other}"))),
        }
    }
}

impl FromStr for LexiconKind {
    type Err = LexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "trie" | "datrie" | "fst" => Ok(LexiconKind::Trie),
            "hash" => Ok(LexiconKind::Hash),
            other => Err(LexError::config(format!("unknown lexicon type '{other}'"))),
        }
    }
}

impl fmt::Display for LexiconKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LexiconKind::Trie => "trie",
            LexiconKind::Hash => "hash",
        })
    }
}

/// Capability set shared by every lexicon engine.
pub trait Lexicon {
    fn kind(&self) -> LexiconKind;

    /// Stored value for `key`, or 0 when the key is absent.
    fn search(&self, key: &str) -> u32;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every entry in the engine's native order.
    fn for_each_entry(&self, f: &mut dyn FnMut(&str, u32));

    /// Add entries; a key that is already present takes the new value.
    fn extend(&mut self, entries: Vec<(String, u32)>) -> Result<()>;

    /// Engine-owned bytes stored inside the file envelope.
    fn payload(&self) -> Result<Vec<u8>>;

    fn entries(&self) -> Vec<(String, u32)> {
        let mut out = Vec::with_capacity(self.len());
        self.for_each_entry(&mut |k, v| out.push((k.to_string(), v)));
        out
    }

    fn max_value(&self) -> u32 {
        let mut max = None;
        self.for_each_entry(&mut |_, v| max = Some(max.map_or(v, |m: u32| m.max(v))));
        max.unwrap_or(0)
    }

    fn min_value(&self) -> u32 {
        let mut min = None;
        self.for_each_entry(&mut |_, v| min = Some(min.map_or(v, |m: u32| m.min(v))));
        min.unwrap_or(0)
    }

    fn sum_value(&self) -> u64 {
        let mut sum = 0u64;
        self.for_each_entry(&mut |_, v| sum += u64::from(v));
        sum
    }

    /// Bulk-load `token value` lines. With a filter, the value is treated as a
    /// frequency and rejected entries are skipped. Returns the number loaded.
    fn read_from_text(&mut self, path: &Path, filter: Option<&FeatureFilter>) -> Result<usize> {
        let entries = read_text_entries(path, filter)?;
        let count = entries.len();
        self.extend(entries)?;
        info!(path = %path.display(), count, "loaded lexicon text");
        Ok(count)
    }

    /// Dump every entry in native order. Returns the number written.
    fn write_to_text(&self, path: &Path) -> Result<usize> {
        write_text_entries(path, self.entries())
    }

    fn save(&self, path: &Path) -> Result<()> {
        let payload = self.payload()?;
        write_file(path, |w| {
            w.write_raw(MAGIC)?;
            w.write_u16(VERSION)?;
            w.write_u8(self.kind().tag())?;
            w.write_u64(self.len() as u64)?;
            w.write_blob(&payload)
        })?;
        debug!(path = %path.display(), kind = %self.kind(), entries = self.len(), "saved lexicon");
        Ok(())
    }
}

/// Any engine, behind the [`Lexicon`] interface.
#[derive(Debug, Clone)]
pub enum LexiconEngine {
    Trie(TrieLexicon),
    Hash(HashLexicon),
}

macro_rules! delegate {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            LexiconEngine::Trie($inner) => $body,
            LexiconEngine::Hash($inner) => $body,
        }
    };
}

impl Lexicon for LexiconEngine {
    fn kind(&self) -> LexiconKind {
        delegate!(self, l => l.kind())
    }

    fn search(&self, key: &str) -> u32 {
        delegate!(self, l => l.search(key))
    }

    fn len(&self) -> usize {
        delegate!(self, l => l.len())
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&str, u32)) {
        delegate!(self, l => l.for_each_entry(f))
    }

    fn extend(&mut self, entries: Vec<(String, u32)>) -> Result<()> {
        delegate!(self, l => l.extend(entries))
    }

    fn payload(&self) -> Result<Vec<u8>> {
        delegate!(self, l => l.payload())
    }
}

pub struct LexiconFactory;

impl LexiconFactory {
    pub fn create(kind: LexiconKind) -> LexiconEngine {
        match kind {
            LexiconKind::Trie => LexiconEngine::Trie(TrieLexicon::default()),
            LexiconKind::Hash => LexiconEngine::Hash(HashLexicon::default()),
        }
    }

    /// Create from a type tag such as `"datrie"` or `"hash"`.
    pub fn create_from_tag(tag: &str) -> Result<LexiconEngine> {
        Ok(Self::create(tag.parse()?))
    }

    pub fn from_entries(kind: LexiconKind, entries: Vec<(String, u32)>) -> Result<LexiconEngine> {
        let mut lex = Self::create(kind);
        lex.extend(entries)?;
        Ok(lex)
    }

    /// Load a saved lexicon of whatever engine wrote it.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<LexiconEngine> {
        let path = path.as_ref();
        let data = read_file(path)?;
        let mut r = StructReader::open(&data)
            .map_err(|e| LexError::format(format!("{}: {e}", path.display())))?;
        let version = r.expect_magic(MAGIC)?;
        if version != VERSION {
            return Err(LexError::format(format!("unsupported lexicon version {version}")));
        }
        let kind = LexiconKind::from_tag(r.read_u8()?)?;
        let expected = r.read_u64()?;
        let payload = r.read_blob()?;
        r.finish()?;

        let lex = match kind {
            LexiconKind::Trie => LexiconEngine::Trie(TrieLexicon::from_payload(payload)?),
            LexiconKind::Hash => LexiconEngine::Hash(HashLexicon::from_payload(payload)?),
        };
        if lex.len() as u64 != expected {
            return Err(LexError::format(format!(
                "entry count mismatch: header says {expected}, payload has {}",
                lex.len()
            )));
        }
        debug!(path = %path.display(), %kind, entries = expected, "loaded lexicon");
        Ok(lex)
    }
}
