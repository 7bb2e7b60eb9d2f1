//! Token statistics and the word trainer that turns them into the identifier
//! and document-frequency dictionaries.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::Config;
use crate::corpus::{ingest_dir, with_mapped_text};
use crate::error::Result;
use crate::lexicon::{Lexicon, LexiconEngine, LexiconFactory, LexiconKind};
use crate::tokenizer::{load_tokenizer, Tokenizer};
use crate::{Token, TokenId};

/// Why a token was rejected by a [`FeatureFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Frequency,
    CodepointLength,
    ByteLength,
}

/// Minimum frequency, codepoint length and byte length a token needs to count
/// as a feature. Checks run in that order; the first failing one is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeatureFilter {
    pub freq_threshold: u32,
    pub min_length: usize,
    pub min_utf8_length: usize,
}

impl FeatureFilter {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            freq_threshold: cfg.get("freq_threshold")?,
            min_length: cfg.get("feature_min_length")?,
            min_utf8_length: cfg.get("feature_min_utf8_length")?,
        })
    }

    pub fn check(&self, token: &str, freq: u32) -> std::result::Result<(), Rejection> {
        if freq < self.freq_threshold {
            Err(Rejection::Frequency)
        } else if token.chars().count() < self.min_utf8_length {
            Err(Rejection::CodepointLength)
        } else if token.len() < self.min_length {
            Err(Rejection::ByteLength)
        } else {
            Ok(())
        }
    }

    pub fn accepts(&self, token: &str, freq: u32) -> bool {
        self.check(token, freq).is_ok()
    }
}

/// Corpus-wide document frequencies of filtered tokens.
#[derive(Debug, Clone, Default)]
pub struct TokenStatistics {
    filter: FeatureFilter,
    doc_freq: BTreeMap<String, u32>,
    documents: usize,
    occurrences: u64,
}

/// The two dictionaries produced from a [`TokenStatistics`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDictionaries {
    /// token → dense id, `1..=N`.
    pub ids: Vec<(String, TokenId)>,
    /// token → document frequency, same keys as `ids`.
    pub dfs: Vec<(String, u32)>,
}

impl TokenStatistics {
    pub fn new(filter: FeatureFilter) -> Self {
        Self { filter, ..Self::default() }
    }

    /// Count one document. Each token whose in-document frequency passes the
    /// filter gains one document. Returns the number of such tokens.
    pub fn add_document(&mut self, tokens: &[Token]) -> usize {
        let mut counts: HashMap<&str, u32> = HashMap::new();
        for t in tokens {
            *counts.entry(t.text()).or_insert(0) += 1;
        }
        self.documents += 1;
        self.occurrences += tokens.len() as u64;

        let mut accepted = 0;
        for (token, freq) in counts {
            if !self.filter.accepts(token, freq) {
                continue;
            }
            *self.doc_freq.entry(token.to_string()).or_insert(0) += 1;
            accepted += 1;
        }
        accepted
    }

    pub fn document_frequency(&self, token: &str) -> u32 {
        self.doc_freq.get(token).copied().unwrap_or(0)
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn occurrences(&self) -> u64 {
        self.occurrences
    }

    /// Distinct tokens that passed the filter at least once.
    pub fn distinct(&self) -> usize {
        self.doc_freq.len()
    }

    /// Drop tokens seen in fewer than `df_threshold` documents and number the
    /// rest from 1 in ascending byte order.
    pub fn build_dictionaries(&self, df_threshold: u32) -> TokenDictionaries {
        let mut dicts = TokenDictionaries::default();
        let survivors = self.doc_freq.iter().filter(|(_, df)| **df >= df_threshold);
        for ((token, &df), id) in survivors.zip(1..) {
            dicts.ids.push((token.clone(), id));
            dicts.dfs.push((token.clone(), df));
        }
        dicts
    }
}

#[derive(Debug, Clone)]
pub struct WordTrainSettings {
    pub filter: FeatureFilter,
    pub df_threshold: u32,
    pub verbose: bool,
    pub token_id_dict: PathBuf,
    pub token_df_dict: PathBuf,
}

impl WordTrainSettings {
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Ok(Self {
            filter: FeatureFilter::from_config(cfg)?,
            df_threshold: cfg.get("df_threshold")?,
            verbose: cfg.get_or::<u32>("verbose", 0)? != 0,
            token_id_dict: cfg.path("token_id_dict")?,
            token_df_dict: cfg.path("token_df_dict")?,
        })
    }
}

/// Builds the identifier and document-frequency dictionaries from a corpus.
pub struct WordTrainer {
    tokenizer: Box<dyn Tokenizer>,
    settings: WordTrainSettings,
    stats: TokenStatistics,
}

impl WordTrainer {
    pub fn new(tokenizer: Box<dyn Tokenizer>, settings: WordTrainSettings) -> Self {
        let stats = TokenStatistics::new(settings.filter);
        Self { tokenizer, settings, stats }
    }

    /// Reads `ke_bamboo_cfg` (or `bamboo_cfg`) for the tokenizer plus the
    /// keys of [`WordTrainSettings`].
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let parser_cfg: PathBuf = cfg.get_first::<String>(&["ke_bamboo_cfg", "bamboo_cfg"])?.into();
        let tokenizer = load_tokenizer(&parser_cfg)?;
        Ok(Self::new(tokenizer, WordTrainSettings::from_config(cfg)?))
    }

    pub fn stats(&self) -> &TokenStatistics {
        &self.stats
    }

    pub fn add_text(&mut self, text: &str) -> Result<usize> {
        let tokens = self.tokenizer.tokenize(text)?;
        Ok(self.stats.add_document(&tokens))
    }

    pub fn parse_file(&mut self, path: &Path) -> Result<usize> {
        let tokenizer = &self.tokenizer;
        let stats = &mut self.stats;
        with_mapped_text(path, |text| {
            let tokens = tokenizer.tokenize(text)?;
            Ok(stats.add_document(&tokens))
        })
    }

    /// Parse every file of the corpus. Unreadable or non-UTF-8 files are
    /// skipped. Returns the number of files parsed.
    pub fn parse_dir(&mut self, root: &Path) -> Result<usize> {
        let tokenizer = &self.tokenizer;
        let stats = &mut self.stats;
        let parsed = ingest_dir(root, self.settings.verbose, |_, text| {
            stats.add_document(&tokenizer.tokenize(text)?);
            Ok(())
        })?;
        info!(
            documents = self.stats.documents(),
            tokens = self.stats.distinct(),
            "word statistics collected"
        );
        Ok(parsed)
    }

    pub fn dictionaries(&self) -> TokenDictionaries {
        self.stats.build_dictionaries(self.settings.df_threshold)
    }

    /// Build both dictionaries with `kind` and save them to the configured paths.
    pub fn save_token_dicts(&self, kind: LexiconKind) -> Result<(LexiconEngine, LexiconEngine)> {
        let TokenDictionaries { ids, dfs } = self.dictionaries();
        let id_dict = LexiconFactory::from_entries(kind, ids)?;
        let df_dict = LexiconFactory::from_entries(kind, dfs)?;
        id_dict.save(&self.settings.token_id_dict)?;
        df_dict.save(&self.settings.token_df_dict)?;
        info!(
            ids = id_dict.len(),
            id_dict = %self.settings.token_id_dict.display(),
            df_dict = %self.settings.token_df_dict.display(),
            "saved token dictionaries"
        );
        Ok((id_dict, df_dict))
    }
}
