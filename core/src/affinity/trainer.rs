use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::table::{composite_key, AffinityTable};
use crate::config::Config;
use crate::corpus::{ingest_dir, with_mapped_text};
use crate::error::{LexError, Result};
use crate::lexicon::{Lexicon, LexiconEngine, LexiconFactory};
use crate::select::top_k_by_score;
use crate::tokenizer::{load_tokenizer, Tokenizer};
use crate::{Token, TokenId};

#[derive(Debug, Clone)]
pub struct AffinitySettings {
    /// Minimum in-document frequency both tokens of a pair need.
    pub freq_threshold: u32,
    /// Targets kept per source token.
    pub top_relation: usize,
    pub verbose: bool,
    pub token_aff_dict: PathBuf,
}

impl AffinitySettings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            freq_threshold: cfg.get("freq_threshold")?,
            top_relation: cfg.get("word_top_relation")?,
            verbose: cfg.get_or::<u32>("verbose", 0)? != 0,
            token_aff_dict: cfg.path("token_aff_dict")?,
        })
    }
}

/// One normalized directed affinity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffinityTriple {
    pub source: TokenId,
    pub target: TokenId,
    pub weight: f64,
}

/// Accumulates co-occurrence statistics over identified tokens and turns them
/// into normalized per-source affinities.
pub struct AffinityTrainer {
    tokenizer: Box<dyn Tokenizer>,
    ids: LexiconEngine,
    settings: AffinitySettings,
    cooccurrence: BTreeMap<TokenId, BTreeMap<TokenId, u64>>,
    doc_freq: HashMap<TokenId, u32>,
    words: HashMap<TokenId, String>,
    total: u64,
    documents: usize,
}

impl AffinityTrainer {
    pub fn new(tokenizer: Box<dyn Tokenizer>, ids: LexiconEngine, settings: AffinitySettings) -> Self {
        Self {
            tokenizer,
            ids,
            settings,
            cooccurrence: BTreeMap::new(),
            doc_freq: HashMap::new(),
            words: HashMap::new(),
            total: 0,
            documents: 0,
        }
    }

    /// Reads `bamboo_cfg` for the tokenizer, `token_id_dict` for the
    /// identifier lexicon and the keys of [`AffinitySettings`].
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let tokenizer = load_tokenizer(cfg.path("bamboo_cfg")?)?;
        let ids = LexiconFactory::load(cfg.path("token_id_dict")?)?;
        let settings = AffinitySettings::from_config(cfg)?;
        info!(ids = ids.len(), top_relation = settings.top_relation, "affinity trainer ready");
        Ok(Self::new(tokenizer, ids, settings))
    }

    pub fn settings(&self) -> &AffinitySettings {
        &self.settings
    }

    /// One past the largest identifier; the stride of the composite key.
    pub fn max_id(&self) -> u64 {
        u64::from(self.ids.max_value()) + 1
    }

    /// Identified token occurrences seen so far.
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn document_frequency(&self, id: TokenId) -> u32 {
        self.doc_freq.get(&id).copied().unwrap_or(0)
    }

    pub fn cooccurrence(&self, source: TokenId, target: TokenId) -> u64 {
        self.cooccurrence
            .get(&source)
            .and_then(|t| t.get(&target))
            .copied()
            .unwrap_or(0)
    }

    pub fn word(&self, id: TokenId) -> Option<&str> {
        self.words.get(&id).map(String::as_str)
    }

    /// Count one document. Returns how many identifiers were selected for
    /// pairing.
    pub fn add_document(&mut self, tokens: &[Token]) -> usize {
        self.documents += 1;
        let mut freq: HashMap<TokenId, u32> = HashMap::new();
        for t in tokens {
            let id = self.ids.search(t.text());
            if id == 0 {
                continue;
            }
            *freq.entry(id).or_insert(0) += 1;
            self.total += 1;
            self.words.entry(id).or_insert_with(|| t.text().to_string());
        }

        let mut selected: Vec<(TokenId, u32)> = freq.into_iter().collect();
        let top = (selected.len() / 2).min(2 * self.settings.top_relation);
        top_k_by_score(&mut selected, top, |&(_, f)| f);

        for (i, &(id1, f1)) in selected.iter().enumerate() {
            *self.doc_freq.entry(id1).or_insert(0) += 1;
            for &(id2, f2) in &selected[i + 1..] {
                let shared = f1.min(f2);
                if shared < self.settings.freq_threshold {
                    continue;
                }
                *self.cooccurrence.entry(id1).or_default().entry(id2).or_insert(0) += u64::from(shared);
                *self.cooccurrence.entry(id2).or_default().entry(id1).or_insert(0) += u64::from(shared);
            }
        }
        selected.len()
    }

    pub fn add_text(&mut self, text: &str) -> Result<usize> {
        let tokens = self.tokenizer.tokenize(text)?;
        Ok(self.add_document(&tokens))
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<usize> {
        let tokens = with_mapped_text(path, |text| self.tokenizer.tokenize(text))?;
        Ok(self.add_document(&tokens))
    }

    /// Parse every file of the corpus, skipping unreadable ones.
    pub fn parse_dir(&mut self, root: &Path) -> Result<usize> {
        let verbose = self.settings.verbose;
        let parsed = ingest_dir(root, verbose, |_, text| self.add_text(text).map(|_| ()))?;
        info!(
            documents = self.documents,
            total = self.total,
            sources = self.cooccurrence.len(),
            "co-occurrence statistics collected"
        );
        Ok(parsed)
    }

    /// Score every co-occurring pair, keep the best `top_relation` targets of
    /// each source and normalize their scores to sum to one.
    ///
    /// Sources come out in ascending id order, targets of a source likewise.
    pub fn compute_affinities(&self) -> Vec<AffinityTriple> {
        let mut triples = Vec::new();
        if self.total == 0 {
            return triples;
        }
        let log_total = (self.total as f64).ln();
        let log_df = |id: TokenId| f64::from(self.document_frequency(id).max(1)).ln();

        for (&source, targets) in &self.cooccurrence {
            let mut scored: Vec<(TokenId, f64)> = targets
                .iter()
                .map(|(&target, &count)| {
                    let score = 2.0 * log_total + (count as f64).ln() - log_df(source) - log_df(target);
                    (target, score)
                })
                .collect();
            top_k_by_score(&mut scored, self.settings.top_relation, |&(_, s)| s);
            scored.sort_unstable_by_key(|&(target, _)| target);
            normalize(&mut scored);
            triples.extend(
                scored
                    .into_iter()
                    .map(|(target, weight)| AffinityTriple { source, target, weight }),
            );
        }
        debug!(triples = triples.len(), "affinities computed");
        triples
    }

    /// Insert `triples` into `table`. Fails on the first insert the table
    /// cannot take.
    pub fn fill_table(&self, mut table: AffinityTable, triples: &[AffinityTriple]) -> Result<AffinityTable> {
        let max_id = table.max_id();
        for t in triples {
            let first = self.word(t.source).ok_or_else(|| missing_word(t.source))?;
            let second = self.word(t.target).ok_or_else(|| missing_word(t.target))?;
            table.insert(first, second, composite_key(t.source, t.target, max_id), t.weight)?;
        }
        Ok(table)
    }

    pub fn build_table(&self) -> Result<AffinityTable> {
        let triples = self.compute_affinities();
        let table = AffinityTable::for_records(self.max_id(), triples.len());
        self.fill_table(table, &triples)
    }

    /// Build the table and write it to `token_aff_dict`. Nothing is written
    /// if building fails.
    pub fn save_table(&self) -> Result<AffinityTable> {
        let table = self.build_table()?;
        table.save(&self.settings.token_aff_dict)?;
        info!(
            records = table.len(),
            slots = table.capacity(),
            path = %self.settings.token_aff_dict.display(),
            "saved affinity table"
        );
        Ok(table)
    }
}

fn missing_word(id: TokenId) -> LexError {
    LexError::format(format!("no token recorded for id {id}"))
}

/// Divide each score by the sum of all scores; a non-positive sum zeroes
/// every weight.
fn normalize(scored: &mut [(TokenId, f64)]) {
    let norm: f64 = scored.iter().map(|&(_, s)| s).sum();
    for (_, s) in scored.iter_mut() {
        *s = if norm > 0.0 { *s / norm } else { 0.0 };
    }
}
