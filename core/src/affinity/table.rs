//! Fixed-capacity open-addressing table of affinity records.
//!
//! Slots are probed linearly from a deterministic hash of the composite key.
//! The slot count is fixed at construction; an insert that would push the
//! load factor past [`MAX_LOAD_FACTOR`] fails instead of dropping data.
//! Loading re-inserts the saved records into a table of at most
//! `ceil(1.5 × records)` slots.
//!
//! Binary layout (little-endian, CRC-32 trailer as in [`crate::persist`]):
//!
//! ```text
//! magic "CNAF", version u16, max_id u64, slots u64, records u64,
//! then per record: key u64, score f64, first string, second string
//! ```

use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::debug;

use crate::error::{LexError, Result};
use crate::lexicon::Lexicon;
use crate::persist::{read_file, write_file, StructReader};
use crate::TokenId;

const MAGIC: &[u8; 4] = b"CNAF";
const VERSION: u16 = 2;

/// Smallest encoding of one record: key, score and two empty strings.
const MIN_RECORD_BYTES: usize = 8 + 8 + 4 + 4;

/// Highest fraction of slots that may be occupied.
pub const MAX_LOAD_FACTOR: f64 = 0.75;

/// Slots allocated per expected record.
pub const SLOTS_PER_RECORD: f64 = 1.5;

/// `id1 * max_id + id2`. Unique for every ordered pair when both ids are
/// below `max_id`.
pub fn composite_key(id1: TokenId, id2: TokenId, max_id: u64) -> u64 {
    u64::from(id1) * max_id + u64::from(id2)
}

#[derive(Debug, Clone, PartialEq)]
pub struct AffinityRecord {
    pub key: u64,
    pub first: String,
    pub second: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct AffinityTable {
    slots: Vec<Option<AffinityRecord>>,
    len: usize,
    max_id: u64,
}

/// splitmix64 finalizer; stable across runs and platforms.
fn mix(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

impl AffinityTable {
    /// A table with exactly `slots` slots (at least one).
    pub fn with_slots(max_id: u64, slots: usize) -> Self {
        Self { slots: vec![None; slots.max(1)], len: 0, max_id }
    }

    /// A table sized for `records` records.
    pub fn for_records(max_id: u64, records: usize) -> Self {
        Self::with_slots(max_id, (records as f64 * SLOTS_PER_RECORD).ceil() as usize)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn max_id(&self) -> u64 {
        self.max_id
    }

    fn home(&self, key: u64) -> usize {
        (mix(key) % self.slots.len() as u64) as usize
    }

    /// Slot holding `key`, or the first free slot of its probe sequence.
    fn probe(&self, key: u64) -> Option<usize> {
        let n = self.slots.len();
        let start = self.home(key);
        (0..n)
            .map(|step| (start + step) % n)
            .find(|&i| self.slots[i].as_ref().map_or(true, |r| r.key == key))
    }

    /// Insert or replace the record for `key`.
    pub fn insert<S: Into<String>>(&mut self, first: S, second: S, key: u64, score: f64) -> Result<()> {
        let slot = self.probe(key);
        let replacing = slot.map_or(false, |i| self.slots[i].is_some());
        if !replacing && (self.len + 1) as f64 > self.slots.len() as f64 * MAX_LOAD_FACTOR {
            return Err(LexError::Capacity { capacity: self.slots.len(), len: self.len + 1 });
        }
        let i = slot.ok_or(LexError::Capacity { capacity: self.slots.len(), len: self.len + 1 })?;
        self.slots[i] = Some(AffinityRecord { key, first: first.into(), second: second.into(), score });
        if !replacing {
            self.len += 1;
        }
        Ok(())
    }

    pub fn get(&self, key: u64) -> Option<&AffinityRecord> {
        self.probe(key).and_then(|i| self.slots[i].as_ref())
    }

    pub fn affinity(&self, id1: TokenId, id2: TokenId) -> Option<f64> {
        if u64::from(id1) >= self.max_id || u64::from(id2) >= self.max_id {
            return None;
        }
        self.get(composite_key(id1, id2, self.max_id)).map(|r| r.score)
    }

    /// Look both words up in the identifier lexicon the table was built with.
    pub fn affinity_of<L: Lexicon>(&self, ids: &L, first: &str, second: &str) -> Option<f64> {
        match (ids.search(first), ids.search(second)) {
            (0, _) | (_, 0) => None,
            (id1, id2) => self.affinity(id1, id2),
        }
    }

    /// Records in slot order.
    pub fn iter(&self) -> impl Iterator<Item = &AffinityRecord> {
        self.slots.iter().flatten()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_file(path, |w| {
            w.write_raw(MAGIC)?;
            w.write_u16(VERSION)?;
            w.write_u64(self.max_id)?;
            w.write_u64(self.slots.len() as u64)?;
            w.write_u64(self.len as u64)?;
            for r in self.iter() {
                w.write_u64(r.key)?;
                w.write_f64(r.score)?;
                w.write_string(&r.first)?;
                w.write_string(&r.second)?;
            }
            Ok(())
        })?;
        debug!(path = %path.display(), records = self.len, slots = self.slots.len(), "saved affinity table");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = read_file(path)?;
        let mut r = StructReader::open(&data)
            .map_err(|e| LexError::format(format!("{}: {e}", path.display())))?;
        let version = r.expect_magic(MAGIC)?;
        if version != VERSION {
            return Err(LexError::format(format!("unsupported affinity table version {version}")));
        }
        let max_id = r.read_u64()?;
        let slots = r.read_u64()?;
        let len = r.read_u64()?;
        if len > slots || len > (r.remaining() / MIN_RECORD_BYTES) as u64 {
            return Err(LexError::format(format!(
                "{len} records cannot fit {slots} slots or {} bytes",
                r.remaining()
            )));
        }
        let len = len as usize;
        let sized = (len as f64 * SLOTS_PER_RECORD).ceil() as u64;
        let mut table = Self::with_slots(max_id, slots.min(sized) as usize);
        for _ in 0..len {
            let key = r.read_u64()?;
            let score = r.read_f64()?;
            let first = r.read_string()?;
            let second = r.read_string()?;
            if table.get(key).is_some() {
                return Err(LexError::format(format!("duplicate affinity key {key}")));
            }
            table
                .insert(first, second, key, score)
                .map_err(|e| LexError::format(format!("{}: {e}", path.display())))?;
        }
        r.finish()?;
        Ok(table)
    }

    /// `first second score` lines in slot order. `f64` display is the
    /// shortest representation that parses back to the same value.
    pub fn write_to_text(&self, path: &Path) -> Result<usize> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            create_dir_all(dir)?;
        }
        let mut w = BufWriter::new(File::create(path)?);
        for r in self.iter() {
            writeln!(w, "{}\t{}\t{}", r.first, r.second, r.score)?;
        }
        w.flush()?;
        Ok(self.len)
    }
}
