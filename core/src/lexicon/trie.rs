use std::collections::BTreeMap;

use fst::{Map, MapBuilder, Streamer};

use super::{Lexicon, LexiconKind};
use crate::error::Result;

/// Trie engine backed by an `fst::Map`.
///
/// The map is immutable; [`Lexicon::extend`] merges the new entries with the
/// existing ones and rebuilds it, which matches the build-once lifecycle of a
/// lexicon.
#[derive(Debug, Clone)]
pub struct TrieLexicon {
    map: Map<Vec<u8>>,
}

impl Default for TrieLexicon {
    fn default() -> Self {
        Self { map: MapBuilder::memory().into_map() }
    }
}

impl TrieLexicon {
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, u32)>,
    {
        let sorted: BTreeMap<String, u32> = entries.into_iter().collect();
        Self::from_sorted(sorted)
    }

    fn from_sorted(sorted: BTreeMap<String, u32>) -> Result<Self> {
        let mut builder = MapBuilder::memory();
        for (key, value) in &sorted {
            builder.insert(key, u64::from(*value))?;
        }
        Ok(Self { map: builder.into_map() })
    }

    pub(crate) fn from_payload(bytes: &[u8]) -> Result<Self> {
        Ok(Self { map: Map::new(bytes.to_vec())? })
    }
}

impl Lexicon for TrieLexicon {
    fn kind(&self) -> LexiconKind {
        LexiconKind::Trie
    }

    fn search(&self, key: &str) -> u32 {
        self.map.get(key).map_or(0, |v| v as u32)
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn for_each_entry(&self, f: &mut dyn FnMut(&str, u32)) {
        let mut stream = self.map.stream();
        while let Some((key, value)) = stream.next() {
            // keys are inserted from `String`s, so this only skips entries of a corrupt map
            if let Ok(key) = std::str::from_utf8(key) {
                f(key, value as u32);
            }
        }
    }

    fn extend(&mut self, entries: Vec<(String, u32)>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut merged: BTreeMap<String, u32> = self.entries().into_iter().collect();
        merged.extend(entries);
        *self = Self::from_sorted(merged)?;
        Ok(())
    }

    fn payload(&self) -> Result<Vec<u8>> {
        Ok(self.map.as_fst().as_bytes().to_vec())
    }
}
