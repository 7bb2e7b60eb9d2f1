use std::collections::HashMap;

use ahash::RandomState;

use super::{Lexicon, LexiconKind};
use crate::error::Result;

/// Hash-map engine. Native order is the map's iteration order.
#[derive(Debug, Clone, Default)]
pub struct HashLexicon {
    map: HashMap<String, u32, RandomState>,
}

impl HashLexicon {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        Self { map: entries.into_iter().collect() }
    }

    pub(crate) fn from_payload(bytes: &[u8]) -> Result<Self> {
        Ok(Self { map: bincode::deserialize(bytes)? })
    }
}

impl Lexicon for HashLexicon {
    fn kind(&self) -> LexiconKind {
        LexiconKind::Hash
    }

    fn search(&self, key: &str) -> u32 {
        self.map.get(key).copied().unwrap_or(0)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&str, u32)) {
        for (key, value) in &self.map {
            f(key, *value);
        }
    }

    fn extend(&mut self, entries: Vec<(String, u32)>) -> Result<()> {
        self.map.extend(entries);
        Ok(())
    }

    fn payload(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(&self.map)?)
    }
}
